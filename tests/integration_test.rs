use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use aerotrack::auth::AuthService;
use aerotrack::chat::{ChatSession, SendOutcome, Sender, APOLOGY};
use aerotrack::database::{DocumentStore, SqliteDocumentStore};
use aerotrack::dialog::DialogAgent;
use aerotrack::error::{AeroResult, AeroTrackError};
use aerotrack::history::SearchHistory;
use aerotrack::maintenance::{EntryStatus, MaintenanceCommand, MaintenanceFilter, MaintenanceSchedule};
use aerotrack::structuring::{StructuringClient, TextGenerator};

struct FixedAgent(Option<&'static str>);

#[async_trait]
impl DialogAgent for FixedAgent {
    async fn reply(&self, _session_id: &str, _text: &str) -> AeroResult<String> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| AeroTrackError::transport_message("dialog agent", "connection reset"))
    }
}

struct FixedModel(&'static str);

#[async_trait]
impl TextGenerator for FixedModel {
    async fn generate(&self, _prompt: &str) -> AeroResult<String> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn chat(agent_reply: Option<&'static str>, model_output: &'static str) -> ChatSession {
    ChatSession::new(
        Arc::new(FixedAgent(agent_reply)),
        Arc::new(StructuringClient::new(FixedModel(model_output))),
    )
}

#[tokio::test]
async fn test_a_check_request_without_table_gets_placeholder_rows() {
    let mut chat = chat(Some("I found several aircraft that need attention."), r#"{"flights": []}"#);

    assert_eq!(chat.send("show me a-check flights").await, SendOutcome::Replied);

    let message = chat.last_message().unwrap();
    assert_eq!(message.sender, Sender::Ai);
    let table = message.table().unwrap();
    assert_eq!(table.title, "A-Check Aircraft (24 flights)");
    assert_eq!(table.flights.len(), 24);
    assert!(table.placeholder);
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_failed_agent_call_apologizes() {
    let mut chat = chat(None, r#"{"flights": []}"#);

    assert_eq!(chat.send("show me a-check flights").await, SendOutcome::Failed);

    let ai_messages: Vec<_> = chat.messages().iter().filter(|m| m.sender == Sender::Ai).collect();
    assert_eq!(ai_messages.len(), 1);
    assert_eq!(ai_messages[0].content, APOLOGY);
    assert!(ai_messages[0].table().is_none());
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_wrapped_model_json_becomes_the_table() {
    let mut chat = chat(
        Some("780B67 is due soon."),
        "Sure! ```json {\"flights\":[{\"icao24\":\"780B67\",\"status\":\"Due\",\"maintenanceType\":\"C-Check\"}]}```",
    );

    chat.send("any c-check work?").await;

    let table = chat.last_message().unwrap().table().unwrap();
    assert_eq!(table.title, "C-Check Aircraft (1 flights)");
    assert_eq!(table.flights[0].status, "Due");
    assert!(!table.placeholder);
}

#[tokio::test]
async fn test_unparseable_model_output_falls_back_to_local_extraction() {
    let reply = "Aircraft needing checks:\n1. a71288 - FL288 - Boeing 737 - Due\n2. ac21e4 - FL1e4 - Airbus A320 - Overdue";
    let mut chat = chat(Some(reply), "I can't format that.");

    chat.send("what is due?").await;

    let message = chat.last_message().unwrap();
    let table = message.table().unwrap();
    assert_eq!(table.flights.len(), 2);
    assert_eq!(table.title, "A-Check Aircraft (2 flights)");
    assert_eq!(message.display_text().as_deref(), Some("Aircraft needing checks:"));
}

#[tokio::test]
async fn test_signed_in_turn_flows_into_history_and_schedule() {
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::connect("sqlite::memory:").await.unwrap());
    let auth = AuthService::new(store.clone());
    let session = auth.sign_up("planner@example.com", "runway27", "Planner").await.unwrap();

    let reply = "| ICAO24 | Flight | Aircraft | Status |\n|---|---|---|---|\n| a71288 | FL288 | Boeing 737 | Due |\n| ac21e4 | FL1e4 | Airbus A320 | Overdue |";
    let mut chat = chat(Some(reply), r#"{"flights": []}"#)
        .with_history(SearchHistory::new(store.clone()), session.clone());

    chat.send("which aircraft need maintenance?").await;

    let profile = auth.profile(&session).await;
    assert_eq!(profile.search_history.len(), 1);
    assert_eq!(profile.search_history[0].query, "which aircraft need maintenance?");

    let table = chat.last_message().unwrap().table().unwrap();
    let flight = table.flights[1].clone();
    assert_eq!(flight.icao24, "ac21e4");

    let mut schedule = MaintenanceSchedule::open(store.clone(), session.clone()).await.unwrap();
    let entry = schedule
        .dispatch(MaintenanceCommand::add_flight(flight, NaiveDate::from_ymd_opt(2026, 11, 15).unwrap()))
        .await
        .unwrap();
    assert_eq!(entry.flight_number, "FL1e4");
    assert_eq!(entry.status, EntryStatus::Scheduled);

    let reloaded = MaintenanceSchedule::open(store, session).await.unwrap();
    assert_eq!(reloaded.entries().len(), 1);
    assert_eq!(reloaded.filtered(&MaintenanceFilter::search("a check")).len(), 1);
}
