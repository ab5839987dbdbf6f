use chrono::NaiveDate;

use super::entry::{EntryStatus, NewMaintenanceEntry};
use crate::flight::{FlightRecord, MaintenanceType};

const UNKNOWN_AIRCRAFT: &str = "Unknown Aircraft";

/// Requests other parts of the app send to the schedule
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceCommand {
    /// Schedule a flight picked from a chat table
    AddFlight {
        flight: FlightRecord,
        scheduled_date: NaiveDate,
    },
}

impl MaintenanceCommand {
    pub fn add_flight(flight: FlightRecord, scheduled_date: NaiveDate) -> Self {
        MaintenanceCommand::AddFlight { flight, scheduled_date }
    }
}

pub(crate) fn flight_to_entry(flight: &FlightRecord, scheduled_date: NaiveDate) -> NewMaintenanceEntry {
    NewMaintenanceEntry {
        icao24: Some(flight.icao24.clone()),
        flight_number: flight
            .flight_number
            .clone()
            .unwrap_or_else(|| flight.icao24.to_uppercase()),
        aircraft_type: flight
            .aircraft_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_AIRCRAFT.to_string()),
        scheduled_date,
        status: EntryStatus::Scheduled,
        maintenance_type: flight.maintenance_kind().unwrap_or(MaintenanceType::ACheck),
        description: Some(format!("Added from chat, reported status: {}", flight.status)),
        estimated_duration: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_conversion() {
        let mut flight = FlightRecord::new("780B67");
        flight.status = "Overdue".to_string();
        flight.maintenance_type = "C-Check".to_string();
        let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();

        let entry = flight_to_entry(&flight, date);
        assert_eq!(entry.icao24.as_deref(), Some("780B67"));
        assert_eq!(entry.flight_number, "780B67");
        assert_eq!(entry.aircraft_type, "Unknown Aircraft");
        assert_eq!(entry.status, EntryStatus::Scheduled);
        assert_eq!(entry.maintenance_type, MaintenanceType::CCheck);
        assert!(entry.description.unwrap().contains("Overdue"));
    }

    #[test]
    fn test_unknown_check_type_defaults_to_a_check() {
        let mut flight = FlightRecord::new("a71288");
        flight.maintenance_type = "Line check".to_string();
        flight.flight_number = Some("FL288".to_string());
        let entry = flight_to_entry(&flight, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(entry.maintenance_type, MaintenanceType::ACheck);
        assert_eq!(entry.flight_number, "FL288");
    }
}
