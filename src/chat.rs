//! Chat turns: dialog agent reply, flight structuring, rendered message.
//!
//! One turn runs at a time. Each AI message keeps the reply text and the
//! flights the structuring client found for it; the table shown is computed
//! from those when the message is rendered, falling back to local extraction
//! of the reply text.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::auth::Session;
use crate::dialog::DialogAgent;
use crate::flight::{FlightRecord, MaintenanceType};
use crate::history::SearchHistory;
use crate::logging::PerformanceTimer;
use crate::markdown::ReplyCleaner;
use crate::structuring::{FlightStructurer, StructuredFlights};
use crate::table_extract::{TableExtractor, TableFormatter};

pub const APOLOGY: &str =
    "I'm sorry, I'm having trouble processing your request right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    StructuringReply,
    Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, or a turn is already in flight
    Ignored,
    Replied,
    /// The agent call failed; an apology was appended
    Failed,
}

/// Table attached to a rendered AI message
#[derive(Debug, Clone, PartialEq)]
pub struct FlightTable {
    pub title: String,
    pub flights: Vec<FlightRecord>,
    /// Rows are demo data, not taken from the reply
    pub placeholder: bool,
}

impl FlightTable {
    pub fn render(&self) -> String {
        TableFormatter::new().format_flights(&self.flights)
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
    structured: StructuredFlights,
    table_only: bool,
}

impl ChatMessage {
    /// Structured flights if there are any, else whatever local extraction
    /// finds in the content. User messages never carry a table.
    pub fn table(&self) -> Option<FlightTable> {
        if self.sender != Sender::Ai {
            return None;
        }

        let (flights, placeholder) = if !self.structured.flights.is_empty() {
            (self.structured.flights.clone(), self.structured.is_placeholder())
        } else {
            (TableExtractor::new().extract(&self.content).flights, false)
        };

        if flights.is_empty() {
            return None;
        }

        Some(FlightTable {
            title: TableFormatter::title_for(&flights),
            flights,
            placeholder,
        })
    }

    /// Cleaned text for display; `None` when the user asked for the table alone
    pub fn display_text(&self) -> Option<String> {
        if self.sender == Sender::User {
            return Some(self.content.clone());
        }

        let extracted = TableExtractor::new().extract(&self.content);
        let has_table = !self.structured.flights.is_empty() || extracted.has_flights();
        if self.table_only && has_table {
            return None;
        }

        let text = if extracted.has_flights() {
            extracted.leftover_text
        } else {
            self.content.clone()
        };
        Some(ReplyCleaner::new().clean(&text))
    }

    pub fn is_table_only(&self) -> bool {
        self.table_only
    }
}

/// "just the table", "no text" and friends
pub fn is_table_only_request(text: &str) -> bool {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"only\s+table",
            r"table\s+only",
            r"just\s+the\s+table",
            r"do\s+not\s+give\s+me\s+anything\s+except\s+the\s+table",
            r"no\s+text",
            r"no\s+lines",
            r"only\s+show\s+the\s+table",
            r"just\s+show\s+the\s+table",
        ]
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("valid table-only pattern"))
        .collect()
    });

    patterns.iter().any(|p| p.is_match(text))
}

pub struct ChatSession {
    agent: Arc<dyn DialogAgent>,
    structurer: Arc<dyn FlightStructurer>,
    history: Option<(SearchHistory, Session)>,
    session_id: String,
    messages: Vec<ChatMessage>,
    state: TurnState,
    busy: bool,
    next_id: u64,
}

impl ChatSession {
    pub fn new(agent: Arc<dyn DialogAgent>, structurer: Arc<dyn FlightStructurer>) -> Self {
        Self {
            agent,
            structurer,
            history: None,
            session_id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            state: TurnState::Idle,
            busy: false,
            next_id: 1,
        }
    }

    /// Record every completed turn in this user's search history
    pub fn with_history(mut self, history: SearchHistory, session: Session) -> Self {
        self.history = Some((history, session));
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_authenticated(&self) -> bool {
        self.history.is_some()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn send(&mut self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() || self.busy {
            return SendOutcome::Ignored;
        }

        self.busy = true;
        let outcome = self.run_turn(text).await;
        self.busy = false;
        outcome
    }

    async fn run_turn(&mut self, text: &str) -> SendOutcome {
        let timer = PerformanceTimer::start("chat turn");
        let user = self
            .history
            .as_ref()
            .map_or("anonymous".to_string(), |(_, s)| s.email.clone());
        crate::log_turn_start!(user, text.chars().count());

        self.push(Sender::User, text.to_string(), StructuredFlights::empty(), false);
        self.state = TurnState::Sending;

        let requested = MaintenanceType::detect_in_text(text);
        let table_only = is_table_only_request(text);

        let reply = match self.agent.reply(&self.session_id, text).await {
            Ok(reply) => reply,
            Err(e) => {
                crate::log_error!(e, "dialog agent");
                self.push(Sender::Ai, APOLOGY.to_string(), StructuredFlights::empty(), false);
                self.state = TurnState::Rendered;
                return SendOutcome::Failed;
            }
        };
        timer.checkpoint("agent replied");

        self.state = TurnState::StructuringReply;
        let structured = self.structurer.structure(&reply, requested).await;
        if structured.is_placeholder() {
            warn!("Showing {} placeholder flights for this reply", structured.flights.len());
        }
        timer.checkpoint("structured");

        self.push(Sender::Ai, reply.clone(), structured, table_only);
        self.state = TurnState::Rendered;

        self.save_turn(text, &reply).await;
        SendOutcome::Replied
    }

    async fn save_turn(&self, query: &str, reply: &str) {
        let Some((history, session)) = &self.history else {
            return;
        };

        let results = json!({
            "response": reply,
            "timestamp": Utc::now().to_rfc3339(),
            "type": "chat_query",
        });

        match history.save_search(&session.uid, query, Some(results)).await {
            Ok(item) => debug!("Saved chat turn {} to history", item.id),
            Err(e) => warn!("Could not save search history: {}", e),
        }
    }

    fn push(&mut self, sender: Sender, content: String, structured: StructuredFlights, table_only: bool) {
        self.messages.push(ChatMessage {
            id: self.next_id,
            sender,
            content,
            created_at: Utc::now(),
            structured,
            table_only,
        });
        self.next_id += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;
    use crate::error::{AeroResult, AeroTrackError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedAgent {
        reply: Option<String>,
    }

    #[async_trait]
    impl DialogAgent for ScriptedAgent {
        async fn reply(&self, _session_id: &str, _text: &str) -> AeroResult<String> {
            self.reply
                .clone()
                .ok_or_else(|| AeroTrackError::transport_message("dialog agent", "HTTP 503"))
        }
    }

    /// Records what it was asked and answers with fixed flights
    #[derive(Default)]
    struct RecordingStructurer {
        flights: Vec<FlightRecord>,
        requested: Mutex<Vec<Option<MaintenanceType>>>,
    }

    #[async_trait]
    impl FlightStructurer for RecordingStructurer {
        async fn structure(&self, _text: &str, requested: Option<MaintenanceType>) -> StructuredFlights {
            self.requested.lock().unwrap().push(requested);
            StructuredFlights::from_model(self.flights.clone())
        }
    }

    fn session_with(reply: Option<&str>, structurer: Arc<RecordingStructurer>) -> ChatSession {
        let agent = Arc::new(ScriptedAgent {
            reply: reply.map(str::to_string),
        });
        ChatSession::new(agent, structurer)
    }

    #[test]
    fn test_table_only_directives() {
        assert!(is_table_only_request("show a-check flights, table only"));
        assert!(is_table_only_request("Just   the table please"));
        assert!(is_table_only_request("Do not give me anything except the table"));
        assert!(!is_table_only_request("show me the maintenance table"));
    }

    #[tokio::test]
    async fn test_failed_agent_appends_apology() {
        let mut chat = session_with(None, Arc::new(RecordingStructurer::default()));
        assert_eq!(chat.send("show me a-check flights").await, SendOutcome::Failed);

        assert_eq!(chat.messages().len(), 2);
        let last = chat.last_message().unwrap();
        assert_eq!(last.sender, Sender::Ai);
        assert_eq!(last.content, APOLOGY);
        assert!(last.table().is_none());
        assert!(!chat.is_busy());
        assert_eq!(chat.state(), TurnState::Rendered);
    }

    #[tokio::test]
    async fn test_structured_flights_take_priority() {
        let mut flight = FlightRecord::new("780B67");
        flight.maintenance_type = "C-Check".to_string();
        let structurer = Arc::new(RecordingStructurer {
            flights: vec![flight],
            ..Default::default()
        });

        let reply = "| ICAO24 | Status |\n|---|---|\n| a71288 | Due |\n| ac21e4 | Due |";
        let mut chat = session_with(Some(reply), structurer.clone());
        assert_eq!(chat.send("c check status").await, SendOutcome::Replied);

        let table = chat.last_message().unwrap().table().unwrap();
        assert_eq!(table.title, "C-Check Aircraft (1 flights)");
        assert!(!table.placeholder);
        assert_eq!(*structurer.requested.lock().unwrap(), vec![Some(MaintenanceType::CCheck)]);
    }

    #[tokio::test]
    async fn test_local_extraction_when_structuring_is_empty() {
        let reply = "Here is the table:\n\n| ICAO24 | Flight | Status |\n|---|---|---|\n| a71288 | FL288 | Due |\n| ac21e4 | FL1e4 | Overdue |\n\nAnything else?";
        let mut chat = session_with(Some(reply), Arc::new(RecordingStructurer::default()));
        chat.send("what needs maintenance?").await;

        let message = chat.last_message().unwrap();
        let table = message.table().unwrap();
        assert_eq!(table.flights.len(), 2);
        assert_eq!(table.title, "A-Check Aircraft (2 flights)");

        let text = message.display_text().unwrap();
        assert!(text.contains("Anything else?"));
        assert!(!text.contains("a71288"));
        assert!(!text.contains("Here is the table"));
    }

    #[tokio::test]
    async fn test_table_only_hides_text() {
        let structurer = Arc::new(RecordingStructurer {
            flights: vec![FlightRecord::new("a71288")],
            ..Default::default()
        });
        let mut chat = session_with(Some("Plenty of words around the data."), structurer);
        chat.send("a-check flights, just the table").await;

        let message = chat.last_message().unwrap();
        assert!(message.is_table_only());
        assert!(message.display_text().is_none());
        assert!(message.table().is_some());
    }

    #[tokio::test]
    async fn test_table_only_without_table_keeps_text() {
        let mut chat = session_with(Some("No aircraft are due."), Arc::new(RecordingStructurer::default()));
        chat.send("table only").await;
        let message = chat.last_message().unwrap();
        assert_eq!(message.display_text().as_deref(), Some("No aircraft are due."));
    }

    #[tokio::test]
    async fn test_busy_and_empty_sends_are_ignored() {
        let mut chat = session_with(Some("hi"), Arc::new(RecordingStructurer::default()));
        assert_eq!(chat.send("   ").await, SendOutcome::Ignored);

        chat.busy = true;
        assert_eq!(chat.send("hello").await, SendOutcome::Ignored);
        assert!(chat.messages().is_empty());
        assert_eq!(chat.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_turn_saved_to_history_when_signed_in() {
        let store = Arc::new(MemoryDocumentStore::new());
        let session = Session {
            uid: "u1".to_string(),
            email: "sam@example.com".to_string(),
            display_name: "Sam".to_string(),
            token: "t".to_string(),
            signed_in_at: Utc::now(),
        };
        let mut chat = session_with(Some("All clear."), Arc::new(RecordingStructurer::default()))
            .with_history(SearchHistory::new(store.clone()), session);
        assert!(chat.is_authenticated());

        chat.send("any b-check due?").await;

        let recent = SearchHistory::new(store).recent("u1", 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, "any b-check due?");
        let results = recent[0].results.as_ref().unwrap();
        assert_eq!(results["response"], "All clear.");
        assert_eq!(results["type"], "chat_query");
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_saved() {
        let store = Arc::new(MemoryDocumentStore::new());
        let session = Session {
            uid: "u1".to_string(),
            email: "sam@example.com".to_string(),
            display_name: String::new(),
            token: "t".to_string(),
            signed_in_at: Utc::now(),
        };
        let mut chat = session_with(None, Arc::new(RecordingStructurer::default()))
            .with_history(SearchHistory::new(store.clone()), session);
        chat.send("hello").await;
        assert!(SearchHistory::new(store).recent("u1", 5).await.unwrap().is_empty());
    }
}
