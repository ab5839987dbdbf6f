// Public module exports for binary crates
pub mod auth;
pub mod chat;
pub mod cli;
pub mod config;
pub mod database;
pub mod dialog;
pub mod error;
pub mod flight;
pub mod history;
pub mod logging;
pub mod maintenance;
pub mod markdown;
pub mod structuring;
pub mod table_extract;

pub use chat::{ChatSession, SendOutcome};
pub use error::{AeroResult, AeroTrackError};
pub use flight::{FlightRecord, MaintenanceType};
