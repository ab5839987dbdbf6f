use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, warn};

use aerotrack::cli::{self, AppContext};
use aerotrack::config::AeroTrackConfig;
use aerotrack::flight::{FlightRecord, MaintenanceType};
use aerotrack::logging::{cleanup_old_logs, init_logging, log_system_info};
use aerotrack::maintenance::{EntryPatch, EntryStatus, MaintenanceFilter, NewMaintenanceEntry};

#[derive(Parser)]
#[command(name = "aerotrack")]
#[command(about = "✈️  AeroTrack - fleet maintenance assistant")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Interactive chat with the maintenance assistant
    Chat,
    /// Ask a single question
    Ask {
        text: Vec<String>,
    },
    /// Extract flight tables from a saved reply, offline
    Extract {
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Structure a saved reply with the configured LLM
    Structure {
        file: PathBuf,
        /// Requested check type (A-Check, B-Check, C-Check, D-Check)
        #[arg(long = "type")]
        maintenance_type: Option<MaintenanceType>,
    },
    /// Maintenance schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    /// Schedule totals and the most recent entries
    Dashboard,
    /// Profile and recent searches
    Profile {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// List entries, newest first
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        status: Option<EntryStatus>,
        #[arg(long = "type")]
        maintenance_type: Option<MaintenanceType>,
    },
    /// Add an entry
    Add {
        #[arg(long)]
        flight: String,
        #[arg(long)]
        aircraft: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        #[arg(long = "type", default_value = "A-Check")]
        maintenance_type: MaintenanceType,
        #[arg(long, default_value = "Scheduled")]
        status: EntryStatus,
        #[arg(long)]
        icao24: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        duration: Option<String>,
    },
    /// Change an entry's status
    Status { id: String, status: EntryStatus },
    /// Change an entry's check type
    Type { id: String, maintenance_type: MaintenanceType },
    /// Delete an entry
    Delete { id: String },
    /// Set the status of several entries
    BulkStatus {
        #[arg(long)]
        status: EntryStatus,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete several entries
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Schedule a flight as it appeared in a chat table
    AddFlight {
        #[arg(long)]
        icao24: String,
        #[arg(long)]
        flight: Option<String>,
        #[arg(long)]
        aircraft: Option<String>,
        #[arg(long = "type", default_value = "A-Check")]
        maintenance_type: MaintenanceType,
        #[arg(long, default_value = "Needs Maintenance")]
        reported_status: String,
        #[arg(long)]
        date: NaiveDate,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AeroTrackConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    let logging_config = config.logging.to_logging_config();
    let _guard = init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
    log_system_info();
    if let Err(e) = cleanup_old_logs(&logging_config) {
        warn!("Log cleanup failed: {}", e);
    }

    let result = run(cli.command, config).await;
    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
    }
    result
}

async fn run(command: Commands, config: AeroTrackConfig) -> Result<()> {
    // Offline commands don't open the document store
    match command {
        Commands::Extract { file, json } => cli::extract_command(file, json).await,
        Commands::Config { action: ConfigAction::Init { path } } => cli::config_init_command(path).await,
        other => run_with_store(other, AppContext::open(config).await?).await,
    }
}

async fn run_with_store(command: Commands, ctx: AppContext) -> Result<()> {
    match command {
        Commands::Signup { email, password, name } => cli::signup_command(&ctx, email, password, name).await,
        Commands::Login { email, password } => cli::login_command(&ctx, email, password).await,
        Commands::Logout => cli::logout_command(&ctx).await,
        Commands::Whoami => cli::whoami_command(&ctx).await,
        Commands::Chat => cli::chat_command(&ctx).await,
        Commands::Ask { text } => cli::ask_command(&ctx, text.join(" ")).await,
        Commands::Structure { file, maintenance_type } => cli::structure_command(&ctx, file, maintenance_type).await,
        Commands::Profile { limit } => cli::profile_command(&ctx, limit).await,
        Commands::Dashboard => cli::dashboard_command(&ctx).await,
        Commands::Schedule { action } => run_schedule(&ctx, action).await,
        Commands::Extract { .. } | Commands::Config { .. } => Ok(()),
    }
}

async fn run_schedule(ctx: &AppContext, action: ScheduleAction) -> Result<()> {
    match action {
        ScheduleAction::List { search, status, maintenance_type } => {
            let filter = MaintenanceFilter { search, status, maintenance_type };
            cli::schedule_list_command(ctx, filter).await
        }
        ScheduleAction::Add {
            flight,
            aircraft,
            date,
            maintenance_type,
            status,
            icao24,
            description,
            duration,
        } => {
            let new = NewMaintenanceEntry {
                icao24,
                flight_number: flight,
                aircraft_type: aircraft,
                scheduled_date: date,
                status,
                maintenance_type,
                description,
                estimated_duration: duration,
            };
            cli::schedule_add_command(ctx, new).await
        }
        ScheduleAction::Status { id, status } => cli::schedule_update_command(ctx, id, EntryPatch::status(status)).await,
        ScheduleAction::Type { id, maintenance_type } => {
            cli::schedule_update_command(ctx, id, EntryPatch::maintenance_type(maintenance_type)).await
        }
        ScheduleAction::Delete { id } => cli::schedule_delete_command(ctx, id).await,
        ScheduleAction::BulkStatus { status, ids } => cli::schedule_bulk_status_command(ctx, ids, status).await,
        ScheduleAction::BulkDelete { ids } => cli::schedule_bulk_delete_command(ctx, ids).await,
        ScheduleAction::AddFlight {
            icao24,
            flight,
            aircraft,
            maintenance_type,
            reported_status,
            date,
        } => {
            let record = FlightRecord {
                icao24,
                flight_number: flight,
                aircraft_type: aircraft,
                status: reported_status,
                maintenance_type: maintenance_type.as_str().to_string(),
            };
            cli::schedule_add_flight_command(ctx, record, date).await
        }
    }
}
