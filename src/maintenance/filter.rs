use std::collections::BTreeSet;

use super::entry::{EntryStatus, MaintenanceEntry};
use crate::flight::MaintenanceType;

/// Search box plus the two dropdown filters. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceFilter {
    pub search: String,
    pub status: Option<EntryStatus>,
    pub maintenance_type: Option<MaintenanceType>,
}

impl MaintenanceFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: term.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.status.is_none() && self.maintenance_type.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, entry: &MaintenanceEntry) -> bool {
        self.matches_search(entry)
            && self.status.map_or(true, |s| entry.status == s)
            && self.maintenance_type.map_or(true, |t| entry.maintenance_type == t)
    }

    fn matches_search(&self, entry: &MaintenanceEntry) -> bool {
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let maintenance_type = entry.maintenance_type.as_str().to_lowercase();
        let fields = [
            entry.flight_number.to_lowercase(),
            entry.aircraft_type.to_lowercase(),
            entry.user_display_name.as_deref().unwrap_or_default().to_lowercase(),
            entry.description.as_deref().unwrap_or_default().to_lowercase(),
            maintenance_type.clone(),
            entry.status.as_str().to_lowercase(),
        ];

        if fields.iter().any(|f| f.contains(&term)) {
            return true;
        }

        // "a check" should find "A-Check"
        if term.contains("check") {
            let hyphenated = term.split_whitespace().collect::<Vec<_>>().join("-");
            return maintenance_type.contains(&hyphenated);
        }

        false
    }

    pub fn apply<'a>(&self, entries: &'a [MaintenanceEntry]) -> Vec<&'a MaintenanceEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

/// Checked rows in the schedule view
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Select every visible entry, or clear when all of them already are
    pub fn toggle_all(&mut self, visible: &[&MaintenanceEntry]) {
        if self.ids.len() == visible.len() {
            self.ids.clear();
        } else {
            self.ids = visible.iter().map(|e| e.id.clone()).collect();
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}
