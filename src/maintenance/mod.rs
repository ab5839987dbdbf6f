//! Per-user maintenance schedule: entries, filters, bulk actions.

pub mod command;
pub mod entry;
pub mod filter;
pub mod schedule;

pub use command::MaintenanceCommand;
pub use entry::{EntryPatch, EntryStatus, MaintenanceEntry, NewMaintenanceEntry};
pub use filter::{MaintenanceFilter, Selection};
pub use schedule::{BulkOutcome, MaintenanceSchedule, ScheduleStats, RECENT_ENTRIES};

/// Store collection holding the entries
pub const MAINTENANCE: &str = "maintenance";

/// Prefix of ids given to entries that haven't been written yet
pub const TEMP_ID_PREFIX: &str = "temp-";
