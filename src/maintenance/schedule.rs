use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::command::{flight_to_entry, MaintenanceCommand};
use super::entry::{EntryPatch, EntryStatus, MaintenanceEntry, NewMaintenanceEntry};
use super::filter::MaintenanceFilter;
use super::{MAINTENANCE, TEMP_ID_PREFIX};
use crate::auth::{from_document, to_document, Session};
use crate::database::DocumentStore;
use crate::error::{AeroResult, AeroTrackError};

/// Entries shown under "recent activity"
pub const RECENT_ENTRIES: usize = 5;

/// Per-id results of a bulk action
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, AeroTrackError)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded.len(), self.failed.len())
    }
}

/// Headline numbers for the dashboard view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleStats {
    pub total: usize,
    pub completed: usize,
    pub scheduled: usize,
    /// Newest entries first, one per id
    pub recent: Vec<MaintenanceEntry>,
}

/// A signed-in user's maintenance entries.
///
/// Mutations change the local list first and then write through to the
/// store. A failed write leaves the list as it was before the call and
/// returns the error.
pub struct MaintenanceSchedule {
    store: Arc<dyn DocumentStore>,
    session: Session,
    entries: Vec<MaintenanceEntry>,
}

impl MaintenanceSchedule {
    pub fn new(store: Arc<dyn DocumentStore>, session: Session) -> Self {
        Self {
            store,
            session,
            entries: Vec::new(),
        }
    }

    pub async fn open(store: Arc<dyn DocumentStore>, session: Session) -> AeroResult<Self> {
        let mut schedule = Self::new(store, session);
        schedule.load().await?;
        Ok(schedule)
    }

    pub fn entries(&self) -> &[MaintenanceEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&MaintenanceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn filtered(&self, filter: &MaintenanceFilter) -> Vec<&MaintenanceEntry> {
        filter.apply(&self.entries)
    }

    /// Reload from the store, newest first. On failure the current list is kept.
    pub async fn load(&mut self) -> AeroResult<usize> {
        let docs = self.store.find(MAINTENANCE, "userId", &self.session.uid).await?;

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(docs.len());
        for doc in docs {
            if !seen.insert(doc.id.clone()) {
                continue;
            }
            // Purely numeric ids are leftovers of an old client-side id scheme
            if !doc.id.is_empty() && doc.id.chars().all(|c| c.is_ascii_digit()) {
                debug!("Skipping maintenance entry with numeric id {}", doc.id);
                continue;
            }
            match from_document::<MaintenanceEntry>(MAINTENANCE, doc.body) {
                Ok(mut entry) => {
                    entry.id = doc.id;
                    entries.push(entry);
                }
                Err(e) => warn!("Skipping malformed maintenance entry {}: {}", doc.id, e),
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.entries = entries;
        debug!("Loaded {} maintenance entries for {}", self.entries.len(), self.session.uid);
        Ok(self.entries.len())
    }

    pub async fn add(&mut self, new: NewMaintenanceEntry) -> AeroResult<MaintenanceEntry> {
        if new.flight_number.trim().is_empty() {
            return Err(AeroTrackError::invalid_input("Flight number is required"));
        }
        if new.aircraft_type.trim().is_empty() {
            return Err(AeroTrackError::invalid_input("Aircraft type is required"));
        }

        let now = Utc::now();
        let temp_id = format!("{}{}", TEMP_ID_PREFIX, now.timestamp_millis());
        let mut entry = MaintenanceEntry {
            id: temp_id.clone(),
            user_id: self.session.uid.clone(),
            user_email: Some(self.session.email.clone()),
            user_display_name: Some(self.display_name()),
            icao24: new.icao24,
            flight_number: new.flight_number.trim().to_string(),
            aircraft_type: new.aircraft_type.trim().to_string(),
            scheduled_date: new.scheduled_date,
            status: new.status,
            maintenance_type: new.maintenance_type,
            description: new.description,
            estimated_duration: new.estimated_duration,
            created_at: now,
            updated_at: Some(now),
        };
        self.entries.insert(0, entry.clone());

        let written = match to_document(&entry) {
            Ok(body) => self.store.insert(MAINTENANCE, &body).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(real_id) => {
                if let Some(local) = self.entries.iter_mut().find(|e| e.id == temp_id) {
                    local.id = real_id.clone();
                }
                entry.id = real_id;
                info!("🛠️  Scheduled {} {} for {}", entry.maintenance_type, entry.flight_number, entry.scheduled_date);
                Ok(entry)
            }
            Err(e) => {
                self.entries.retain(|x| x.id != temp_id);
                Err(e)
            }
        }
    }

    /// Apply a patch. Entries still waiting for their real id are skipped
    /// (`Ok(false)`).
    pub async fn update(&mut self, id: &str, patch: &EntryPatch) -> AeroResult<bool> {
        if id.starts_with(TEMP_ID_PREFIX) {
            debug!("Skipping update for temporary entry {}", id);
            return Ok(false);
        }

        let index = self.index_of(id)?;
        let previous = self.entries[index].clone();
        patch.apply_to(&mut self.entries[index], Utc::now());

        let written = match to_document(&self.entries[index]) {
            Ok(body) => self.store.put(MAINTENANCE, id, &body).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            warn!("Update of {} failed, restoring previous state: {}", id, e);
            self.entries[index] = previous;
            return Err(e);
        }
        Ok(true)
    }

    pub async fn delete(&mut self, id: &str) -> AeroResult<()> {
        let index = self.index_of(id)?;
        let removed = self.entries.remove(index);

        if let Err(e) = self.store.delete(MAINTENANCE, id).await {
            warn!("Delete of {} failed, restoring entry: {}", id, e);
            self.entries.insert(index, removed);
            return Err(e);
        }
        Ok(())
    }

    pub async fn bulk_update_status(&mut self, ids: &[String], status: EntryStatus) -> BulkOutcome {
        let patch = EntryPatch::status(status);
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.update(id, &patch).await {
                Ok(_) => outcome.succeeded.push(id.clone()),
                Err(e) => outcome.failed.push((id.clone(), e)),
            }
        }
        info!("Bulk status change to {}: {}", status, outcome.summary());
        outcome
    }

    pub async fn bulk_delete(&mut self, ids: &[String]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.delete(id).await {
                Ok(()) => outcome.succeeded.push(id.clone()),
                Err(e) => outcome.failed.push((id.clone(), e)),
            }
        }
        info!("Bulk delete: {}", outcome.summary());
        outcome
    }

    /// Counts by status plus the newest entries, each id once
    pub fn stats(&self) -> ScheduleStats {
        let count = |status: EntryStatus| self.entries.iter().filter(|e| e.status == status).count();

        let mut seen = HashSet::new();
        let recent = self
            .entries
            .iter()
            .filter(|e| seen.insert(e.id.as_str()))
            .take(RECENT_ENTRIES)
            .cloned()
            .collect();

        ScheduleStats {
            total: self.entries.len(),
            completed: count(EntryStatus::Completed),
            scheduled: count(EntryStatus::Scheduled),
            recent,
        }
    }

    pub async fn dispatch(&mut self, command: MaintenanceCommand) -> AeroResult<MaintenanceEntry> {
        match command {
            MaintenanceCommand::AddFlight { flight, scheduled_date } => {
                self.add(flight_to_entry(&flight, scheduled_date)).await
            }
        }
    }

    fn index_of(&self, id: &str) -> AeroResult<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AeroTrackError::not_found("maintenance entry", id))
    }

    fn display_name(&self) -> String {
        if !self.session.display_name.is_empty() {
            return self.session.display_name.clone();
        }
        match self.session.email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        }
    }
}
