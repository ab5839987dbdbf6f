use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::auth::{AuthService, Session};
use crate::chat::{ChatMessage, ChatSession, SendOutcome, Sender};
use crate::config::AeroTrackConfig;
use crate::database::{DocumentStore, SqliteDocumentStore};
use crate::dialog::HttpDialogAgent;
use crate::flight::{FlightRecord, MaintenanceType};
use crate::history::SearchHistory;
use crate::maintenance::{
    EntryPatch, EntryStatus, MaintenanceCommand, MaintenanceEntry, MaintenanceFilter, MaintenanceSchedule,
    NewMaintenanceEntry,
};
use crate::structuring::{self, FlightStructurer};
use crate::table_extract::{TableExtractor, TableFormatter};

const WRAP_WIDTH: usize = 100;

/// Store and auth opened from config, shared by the commands
pub struct AppContext {
    pub config: AeroTrackConfig,
    pub store: Arc<dyn DocumentStore>,
    pub auth: AuthService,
}

impl AppContext {
    pub async fn open(config: AeroTrackConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(
            SqliteDocumentStore::connect(&config.database.url)
                .await
                .map_err(|e| anyhow!(e.user_message()))
                .with_context(|| format!("opening document store {}", config.database.url))?,
        );
        let auth = AuthService::new(store.clone());
        Ok(Self { config, store, auth })
    }

    async fn require_session(&self) -> Result<Session> {
        self.auth.require_session().await.map_err(|e| anyhow!(e.user_message()))
    }

    fn structurer(&self) -> Result<Arc<dyn FlightStructurer>> {
        structuring::from_config(&self.config.structuring).map_err(|e| anyhow!(e.user_message()))
    }

    async fn chat_session(&self) -> Result<ChatSession> {
        let agent = Arc::new(HttpDialogAgent::new(&self.config.dialog).map_err(|e| anyhow!(e.user_message()))?);
        let chat = ChatSession::new(agent, self.structurer()?);

        match self.auth.current_session().await {
            Ok(Some(session)) => Ok(chat.with_history(SearchHistory::new(self.store.clone()), session)),
            _ => Ok(chat),
        }
    }

    async fn schedule(&self) -> Result<MaintenanceSchedule> {
        let session = self.require_session().await?;
        MaintenanceSchedule::open(self.store.clone(), session)
            .await
            .map_err(|e| anyhow!(e.user_message()))
    }
}

async fn prompt_line(prompt: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

async fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => prompt_line("Password: ").await,
    }
}

// ============================================================================
// Account
// ============================================================================

pub async fn signup_command(ctx: &AppContext, email: String, password: Option<String>, name: String) -> Result<()> {
    let password = password_or_prompt(password).await?;
    let session = ctx
        .auth
        .sign_up(&email, &password, &name)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    ctx.auth.persist_session(&session).await.map_err(|e| anyhow!(e.user_message()))?;

    println!("✅ Account created for {}. You are signed in.", session.email);
    Ok(())
}

pub async fn login_command(ctx: &AppContext, email: String, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password).await?;
    let session = ctx
        .auth
        .sign_in(&email, &password)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    ctx.auth.persist_session(&session).await.map_err(|e| anyhow!(e.user_message()))?;

    println!("🔓 Signed in as {}", display_name(&session));
    Ok(())
}

pub async fn logout_command(ctx: &AppContext) -> Result<()> {
    match ctx.auth.current_session().await.map_err(|e| anyhow!(e.user_message()))? {
        Some(session) => {
            ctx.auth.sign_out(session).await.map_err(|e| anyhow!(e.user_message()))?;
            println!("🔒 Signed out.");
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

pub async fn whoami_command(ctx: &AppContext) -> Result<()> {
    match ctx.auth.current_session().await.map_err(|e| anyhow!(e.user_message()))? {
        Some(session) => println!("{} <{}> (uid {})", display_name(&session), session.email, session.uid),
        None => println!("Not signed in."),
    }
    Ok(())
}

pub async fn profile_command(ctx: &AppContext, limit: usize) -> Result<()> {
    let session = ctx.require_session().await?;
    let profile = ctx.auth.profile(&session).await;

    println!("👤 {}", if profile.display_name.is_empty() { &profile.email } else { &profile.display_name });
    println!("   Email:        {}", profile.email);
    println!("   Member since: {}", profile.created_at.format("%Y-%m-%d"));
    println!("   Searches:     {}", profile.search_history.len());

    if profile.search_history.is_empty() {
        println!("\nNo searches yet.");
        return Ok(());
    }

    println!("\nRecent searches:");
    for item in profile.search_history.iter().take(limit) {
        println!("  {}  {}", item.timestamp.format("%Y-%m-%d %H:%M"), item.query);
    }
    Ok(())
}

// ============================================================================
// Chat
// ============================================================================

pub async fn ask_command(ctx: &AppContext, text: String) -> Result<()> {
    let mut chat = ctx.chat_session().await?;
    chat.send(&text).await;
    if let Some(message) = chat.last_message() {
        print_message(message);
    }
    Ok(())
}

pub async fn chat_command(ctx: &AppContext) -> Result<()> {
    let mut chat = ctx.chat_session().await?;
    info!("💬 Chat session {}", chat.session_id());

    println!("✈️  AeroTrack AI. Ask about your fleet; /quit to leave.");
    if !chat.is_authenticated() {
        println!("   (not signed in: searches won't be saved)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" || line == "/exit" {
            break;
        }

        if chat.send(line).await == SendOutcome::Ignored {
            continue;
        }
        if let Some(message) = chat.last_message() {
            print_message(message);
        }
    }
    Ok(())
}

pub fn print_message(message: &ChatMessage) {
    if message.sender == Sender::User {
        println!("You: {}", message.content);
        return;
    }

    println!("\nAeroTrack AI:");
    if let Some(table) = message.table() {
        println!("{}{}", table.title, if table.placeholder { "  [sample data]" } else { "" });
        println!("{}", table.render());
    }
    if let Some(text) = message.display_text() {
        if !text.is_empty() {
            println!("{}", textwrap::fill(&text, WRAP_WIDTH));
        }
    }
}

// ============================================================================
// Offline tools
// ============================================================================

pub async fn extract_command(path: PathBuf, json: bool) -> Result<()> {
    let content = read_input(&path).await?;
    let extracted = TableExtractor::new().extract(&content);
    info!("{}", extracted.summary.summary());

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "flights": extracted.flights }))?);
    } else if extracted.has_flights() {
        println!("{}", TableFormatter::title_for(&extracted.flights));
        println!("{}", TableFormatter::new().format_flights(&extracted.flights));
    } else {
        println!("No flight rows found.");
    }
    Ok(())
}

pub async fn structure_command(ctx: &AppContext, path: PathBuf, requested: Option<MaintenanceType>) -> Result<()> {
    let content = read_input(&path).await?;
    let structured = ctx.structurer()?.structure(&content, requested).await;

    if structured.is_placeholder() {
        eprintln!("⚠️  Model returned no flights; showing placeholder sample data.");
    }
    println!("{}", serde_json::to_string_pretty(&structured)?);
    Ok(())
}

async fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(anyhow!("File not found: {:?}", path));
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {:?}", path))
}

pub async fn config_init_command(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Err(anyhow!("{:?} already exists", path));
    }
    AeroTrackConfig::default().save_to_file(&path)?;
    println!("📝 Wrote default configuration to {:?}", path);
    Ok(())
}

// ============================================================================
// Schedule
// ============================================================================

pub async fn schedule_list_command(ctx: &AppContext, filter: MaintenanceFilter) -> Result<()> {
    let schedule = ctx.schedule().await?;
    let entries = schedule.filtered(&filter);

    if entries.is_empty() {
        println!(
            "{}",
            if schedule.entries().is_empty() { "No maintenance entries yet." } else { "No entries match the filters." }
        );
        return Ok(());
    }

    println!("{:<22} {:<10} {:<18} {:<11} {:<10} {:<8}", "ID", "Flight", "Aircraft", "Date", "Status", "Type");
    for entry in &entries {
        print_entry_row(entry);
    }
    println!("\n{} of {} entries", entries.len(), schedule.entries().len());
    Ok(())
}

fn print_entry_row(entry: &MaintenanceEntry) {
    println!(
        "{:<22} {:<10} {:<18} {:<11} {:<10} {:<8}",
        truncate(&entry.id, 22),
        truncate(&entry.flight_number, 10),
        truncate(&entry.aircraft_type, 18),
        entry.scheduled_date,
        entry.status,
        entry.maintenance_type
    );
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

pub async fn schedule_add_command(ctx: &AppContext, new: NewMaintenanceEntry) -> Result<()> {
    let mut schedule = ctx.schedule().await?;
    let entry = schedule.add(new).await.map_err(|e| anyhow!(e.user_message()))?;
    println!("✅ Added {} ({})", entry.flight_number, entry.id);
    Ok(())
}

pub async fn schedule_update_command(ctx: &AppContext, id: String, patch: EntryPatch) -> Result<()> {
    let mut schedule = ctx.schedule().await?;
    if schedule.update(&id, &patch).await.map_err(|e| anyhow!(e.user_message()))? {
        println!("✅ Updated {}", id);
    } else {
        println!("⏳ {} is still being saved; try again in a moment.", id);
    }
    Ok(())
}

pub async fn schedule_delete_command(ctx: &AppContext, id: String) -> Result<()> {
    let mut schedule = ctx.schedule().await?;
    schedule.delete(&id).await.map_err(|e| anyhow!(e.user_message()))?;
    println!("🗑️  Deleted {}", id);
    Ok(())
}

pub async fn schedule_bulk_status_command(ctx: &AppContext, ids: Vec<String>, status: EntryStatus) -> Result<()> {
    let mut schedule = ctx.schedule().await?;
    let outcome = schedule.bulk_update_status(&ids, status).await;
    report_bulk("Status update", &outcome)
}

pub async fn schedule_bulk_delete_command(ctx: &AppContext, ids: Vec<String>) -> Result<()> {
    let mut schedule = ctx.schedule().await?;
    let outcome = schedule.bulk_delete(&ids).await;
    report_bulk("Delete", &outcome)
}

fn report_bulk(action: &str, outcome: &crate::maintenance::BulkOutcome) -> Result<()> {
    println!("{}: {}", action, outcome.summary());
    for (id, error) in &outcome.failed {
        println!("  ❌ {}: {}", id, error.user_message());
    }
    if outcome.is_complete() {
        Ok(())
    } else {
        Err(anyhow!("Failed to update some entries. Please try again."))
    }
}

pub async fn schedule_add_flight_command(ctx: &AppContext, flight: FlightRecord, scheduled_date: NaiveDate) -> Result<()> {
    let mut schedule = ctx.schedule().await?;
    let entry = schedule
        .dispatch(MaintenanceCommand::add_flight(flight, scheduled_date))
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    println!("✅ Scheduled {} {} on {} ({})", entry.maintenance_type, entry.flight_number, entry.scheduled_date, entry.id);
    Ok(())
}

pub async fn dashboard_command(ctx: &AppContext) -> Result<()> {
    let session = ctx.require_session().await?;
    let stats = ctx.schedule().await?.stats();

    println!("Welcome back, {}", display_name(&session));
    println!("  Total entries:   {}", stats.total);
    println!("  Completed:       {}", stats.completed);
    println!("  Scheduled:       {}", stats.scheduled);

    if stats.recent.is_empty() {
        println!("\nNo maintenance entries yet.");
        return Ok(());
    }

    println!("\nRecent maintenance:");
    println!("{:<22} {:<10} {:<18} {:<11} {:<10} {:<8}", "ID", "Flight", "Aircraft", "Date", "Status", "Type");
    for entry in &stats.recent {
        print_entry_row(entry);
    }
    Ok(())
}

fn display_name(session: &Session) -> &str {
    if session.display_name.is_empty() {
        &session.email
    } else {
        &session.display_name
    }
}
