use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::flight::MaintenanceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    Scheduled,
    Pending,
    Completed,
    Cancelled,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 4] = [
        EntryStatus::Scheduled,
        EntryStatus::Pending,
        EntryStatus::Completed,
        EntryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Scheduled => "Scheduled",
            EntryStatus::Pending => "Pending",
            EntryStatus::Completed => "Completed",
            EntryStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("canceled") {
            return Ok(EntryStatus::Cancelled);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown status: {} (expected Scheduled, Pending, Completed or Cancelled)", s))
    }
}

/// One scheduled maintenance job, stored in the `maintenance` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceEntry {
    /// Document id; not part of the stored body
    #[serde(default, skip_serializing)]
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao24: Option<String>,
    pub flight_number: String,
    pub aircraft_type: String,
    pub scheduled_date: NaiveDate,
    pub status: EntryStatus,
    pub maintenance_type: MaintenanceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MaintenanceEntry {
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(super::TEMP_ID_PREFIX)
    }
}

/// Fields a user supplies when adding an entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaintenanceEntry {
    pub icao24: Option<String>,
    pub flight_number: String,
    pub aircraft_type: String,
    pub scheduled_date: NaiveDate,
    pub status: EntryStatus,
    pub maintenance_type: MaintenanceType,
    pub description: Option<String>,
    pub estimated_duration: Option<String>,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub status: Option<EntryStatus>,
    pub maintenance_type: Option<MaintenanceType>,
    pub scheduled_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub estimated_duration: Option<String>,
}

impl EntryPatch {
    pub fn status(status: EntryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn maintenance_type(maintenance_type: MaintenanceType) -> Self {
        Self {
            maintenance_type: Some(maintenance_type),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, entry: &mut MaintenanceEntry, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(maintenance_type) = self.maintenance_type {
            entry.maintenance_type = maintenance_type;
        }
        if let Some(date) = self.scheduled_date {
            entry.scheduled_date = date;
        }
        if let Some(ref description) = self.description {
            entry.description = Some(description.clone());
        }
        if let Some(ref duration) = self.estimated_duration {
            entry.estimated_duration = Some(duration.clone());
        }
        entry.updated_at = Some(now);
    }
}
