//! HTTP backends for flight structuring.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{FlightStructurer, StructuredFlights, TextGenerator};
use crate::config::StructuringConfig;
use crate::error::{AeroResult, AeroTrackError};
use crate::flight::{normalize_all, MaintenanceType};

fn http_client(timeout_secs: u64) -> AeroResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AeroTrackError::configuration(format!("Failed to create HTTP client: {}", e)))
}

// ============================================================================
// Ollama
// ============================================================================

/// Local Ollama server, non-streaming `/api/generate` in JSON mode
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(config: &StructuringConfig) -> AeroResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> AeroResult<String> {
        let url = format!("{}/api/generate", self.base_url);

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AeroTrackError::transport("ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AeroTrackError::transport_message(
                "ollama",
                format!("{}: {}", status, error_text),
            ));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AeroTrackError::transport("ollama", e))?;

        Ok(data["response"].as_str().unwrap_or("").to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Remote structuring endpoint
// ============================================================================

/// A service that does the structuring itself: `{text, requestedType}` in,
/// `{flights}` out. Its records still go through local normalization.
pub struct StructureEndpoint {
    client: Client,
    url: String,
}

impl StructureEndpoint {
    pub fn new(config: &StructuringConfig) -> AeroResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: config.url.clone(),
        })
    }

    async fn request(&self, text: &str, requested: Option<MaintenanceType>) -> AeroResult<Value> {
        let body = json!({
            "text": text,
            "requestedType": requested.map(|t| t.as_str()),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AeroTrackError::transport("structure endpoint", e))?;

        if !response.status().is_success() {
            return Err(AeroTrackError::transport_message(
                "structure endpoint",
                response.status().to_string(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AeroTrackError::transport("structure endpoint", e))
    }
}

#[async_trait]
impl FlightStructurer for StructureEndpoint {
    async fn structure(&self, text: &str, requested: Option<MaintenanceType>) -> StructuredFlights {
        if text.trim().is_empty() {
            return StructuredFlights::empty();
        }

        match self.request(text, requested).await {
            Ok(data) => {
                let raw = super::parse::flights_array(&data);
                let flights = normalize_all(&raw);
                debug!("Structure endpoint returned {} flights ({} usable)", raw.len(), flights.len());
                StructuredFlights::from_model(flights)
            }
            Err(e) => {
                warn!("Structuring request failed: {}", e);
                StructuredFlights::empty()
            }
        }
    }
}

/// Used when structuring is switched off in config
pub struct DisabledStructurer;

#[async_trait]
impl FlightStructurer for DisabledStructurer {
    async fn structure(&self, _text: &str, _requested: Option<MaintenanceType>) -> StructuredFlights {
        StructuredFlights::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StructuringProvider;

    fn config(url: &str) -> StructuringConfig {
        StructuringConfig {
            provider: StructuringProvider::Ollama,
            url: url.to_string(),
            model: "gemma3:latest".to_string(),
            temperature: 0.2,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_ollama_trims_base_url() {
        let generator = OllamaGenerator::new(&config("http://localhost:11434/")).unwrap();
        assert_eq!(generator.base_url, "http://localhost:11434");
        assert_eq!(generator.name(), "gemma3:latest");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_empty() {
        let endpoint = StructureEndpoint::new(&config("http://127.0.0.1:9/structure")).unwrap();
        let result = endpoint.structure("a71288 due", Some(MaintenanceType::ACheck)).await;
        assert!(result.flights.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_structurer() {
        let result = DisabledStructurer.structure("a-check flights", None).await;
        assert!(result.flights.is_empty());
        assert!(!result.is_placeholder());
    }
}
