//! Turning free-text agent replies into flight records with a language model.
//!
//! The client never fails outward: transport errors, unparseable output and
//! empty input all come back as an empty [`StructuredFlights`], with the cause
//! logged. The one special case is a model that answers with valid JSON but
//! zero flights while the user asked about A- or C-Checks; then a fixed
//! placeholder set is returned, tagged [`FlightSource::Placeholder`].

pub mod fallback;
pub mod parse;
pub mod providers;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{StructuringConfig, StructuringProvider};
use crate::error::AeroResult;
use crate::flight::{normalize_all, FlightRecord, MaintenanceType};
use crate::logging::PerformanceTimer;

pub use providers::{DisabledStructurer, OllamaGenerator, StructureEndpoint};

const INSTRUCTION: &str = r#"Convert the following aircraft maintenance text into JSON.
Return ONLY valid JSON matching this schema:
{"flights":[{"icao24":"string","flightNumber":"string","aircraftType":"string","status":"string","maintenanceType":"A-Check|B-Check|C-Check|D-Check"}]}
Use these exact keys. Keep every flight mentioned in the text; do not drop or merge results.
If a field is missing, infer a sensible value from context.
Do not add any explanation, commentary or markdown."#;

/// Where a set of flights came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightSource {
    /// Parsed from the model's answer
    Model,
    /// Fixed demo set, not derived from the reply
    Placeholder,
    #[default]
    Empty,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuredFlights {
    pub flights: Vec<FlightRecord>,
    #[serde(skip)]
    pub source: FlightSource,
}

impl StructuredFlights {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_model(flights: Vec<FlightRecord>) -> Self {
        let source = if flights.is_empty() { FlightSource::Empty } else { FlightSource::Model };
        Self { flights, source }
    }

    pub fn placeholder(flights: Vec<FlightRecord>) -> Self {
        Self {
            flights,
            source: FlightSource::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == FlightSource::Placeholder
    }
}

/// Raw text completion backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AeroResult<String>;

    fn name(&self) -> &str;
}

/// Anything that can turn reply text into flight records
#[async_trait]
pub trait FlightStructurer: Send + Sync {
    async fn structure(&self, text: &str, requested: Option<MaintenanceType>) -> StructuredFlights;
}

/// Prompt-based structuring over a [`TextGenerator`]
pub struct StructuringClient<G> {
    generator: G,
}

impl<G: TextGenerator> StructuringClient<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn build_prompt(text: &str) -> String {
        format!("{}\n\nText:\n{}", INSTRUCTION, text)
    }

    async fn run(&self, text: &str, requested: Option<MaintenanceType>) -> StructuredFlights {
        let timer = PerformanceTimer::start(format!("structure:{}", self.generator.name()));

        let raw = match self.generator.generate(&Self::build_prompt(text)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Structuring model call failed: {}", e);
                return StructuredFlights::empty();
            }
        };
        timer.checkpoint("generated");

        if raw.trim().is_empty() {
            warn!("Structuring model returned an empty response");
            return StructuredFlights::empty();
        }

        let Some(value) = parse::parse_model_output(&raw) else {
            warn!("Could not parse structuring output as JSON ({} chars)", raw.len());
            return StructuredFlights::empty();
        };

        let raw_flights = parse::flights_array(&value);
        if raw_flights.is_empty() {
            let intent_text = format!("{} {}", requested.map_or("", |t| t.as_str()), text);
            if let Some(placeholders) = fallback::placeholder_flights(&intent_text) {
                info!(
                    "Model returned no flights; substituting {} placeholder records",
                    placeholders.len()
                );
                return StructuredFlights::placeholder(placeholders);
            }
            return StructuredFlights::empty();
        }

        let flights = normalize_all(&raw_flights);
        debug!(
            "Structured {} flights ({} dropped without an identifier)",
            flights.len(),
            raw_flights.len() - flights.len()
        );
        StructuredFlights::from_model(flights)
    }
}

#[async_trait]
impl<G: TextGenerator> FlightStructurer for StructuringClient<G> {
    async fn structure(&self, text: &str, requested: Option<MaintenanceType>) -> StructuredFlights {
        if text.trim().is_empty() {
            return StructuredFlights::empty();
        }
        self.run(text, requested).await
    }
}

/// Build the structurer the config asks for
pub fn from_config(config: &StructuringConfig) -> AeroResult<Arc<dyn FlightStructurer>> {
    Ok(match config.provider {
        StructuringProvider::Ollama => Arc::new(StructuringClient::new(OllamaGenerator::new(config)?)),
        StructuringProvider::Endpoint => Arc::new(StructureEndpoint::new(config)?),
        StructuringProvider::None => Arc::new(DisabledStructurer),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AeroTrackError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedGenerator {
        reply: AeroResult<String>,
        calls: AtomicUsize,
    }

    impl CannedGenerator {
        fn ok(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), calls: AtomicUsize::new(0) }
        }

        fn failing() -> Self {
            Self {
                reply: Err(AeroTrackError::transport_message("test", "connection refused")),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> AeroResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(AeroTrackError::transport_message("test", "connection refused")),
            }
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn test_wrapped_json_is_recovered_and_normalized() {
        let client = StructuringClient::new(CannedGenerator::ok(
            "Sure! ```json {\"flights\":[{\"icao24\":\"780B67\",\"status\":\"Due\"}]}``` ",
        ));
        let result = client.structure("780B67 is due", None).await;
        assert_eq!(result.flights.len(), 1);
        assert_eq!(result.flights[0].icao24, "780B67");
        assert_eq!(result.flights[0].status, "Due");
        assert_eq!(result.flights[0].maintenance_type, "A-Check");
        assert_eq!(result.source, FlightSource::Model);
    }

    #[tokio::test]
    async fn test_empty_result_with_a_check_uses_placeholders() {
        let client = StructuringClient::new(CannedGenerator::ok(r#"{"flights": []}"#));
        let result = client.structure("Here are the a-check aircraft.", None).await;
        assert_eq!(result.flights.len(), 24);
        assert!(result.is_placeholder());
        assert_eq!(result.flights[0].aircraft_type.as_deref(), Some("Unknown Aircraft"));
    }

    #[tokio::test]
    async fn test_requested_type_feeds_the_fallback() {
        let client = StructuringClient::new(CannedGenerator::ok(r#"{"flights": []}"#));
        let result = client.structure("Nothing scheduled.", Some(MaintenanceType::CCheck)).await;
        assert_eq!(result.flights.len(), 3);
        assert_eq!(result.flights[0].maintenance_type, "C-Check");
    }

    #[tokio::test]
    async fn test_empty_result_without_keyword() {
        let client = StructuringClient::new(CannedGenerator::ok(r#"{"flights": []}"#));
        let result = client.structure("The fleet looks fine.", None).await;
        assert!(result.flights.is_empty());
        assert_eq!(result.source, FlightSource::Empty);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let client = StructuringClient::new(CannedGenerator::failing());
        assert!(client.structure("a-check flights", None).await.flights.is_empty());

        let client = StructuringClient::new(CannedGenerator::ok("I cannot help with that."));
        assert!(client.structure("a-check flights", None).await.flights.is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_skips_the_model() {
        let generator = CannedGenerator::ok(r#"{"flights": []}"#);
        let client = StructuringClient::new(generator);
        assert!(client.structure("   ", Some(MaintenanceType::ACheck)).await.flights.is_empty());
        assert_eq!(client.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_records_without_identifier_are_dropped() {
        let client = StructuringClient::new(CannedGenerator::ok(
            r#"{"flights":[{"icao24":"a71288"},{"icao24":""},{"flightNumber":"FL1"}]}"#,
        ));
        let result = client.structure("some flights", None).await;
        assert_eq!(result.flights.len(), 1);
    }

    #[test]
    fn test_prompt_carries_text_and_schema() {
        let prompt = StructuringClient::<CannedGenerator>::build_prompt("a71288 due");
        assert!(prompt.contains("\"flights\""));
        assert!(prompt.ends_with("a71288 due"));
    }

    #[test]
    fn test_placeholder_serializes_as_flights_only() {
        let result = StructuredFlights::placeholder(fallback::placeholder_flights("c-check").unwrap());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["flights"].as_array().unwrap().len(), 3);
        assert!(json.get("source").is_none());
    }
}
