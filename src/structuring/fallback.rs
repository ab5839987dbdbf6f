//! Fixed demo flight sets used when the model returns no flights.
//!
//! These are placeholders, not derived from the reply. Callers get them
//! tagged as [`FlightSource::Placeholder`](super::FlightSource) and must not
//! treat them as fleet data.

use crate::flight::{FlightRecord, MaintenanceType};

const PLACEHOLDER_AIRCRAFT: &str = "Unknown Aircraft";
const PLACEHOLDER_STATUS: &str = "Needs Maintenance";

pub const A_CHECK_CODES: [&str; 24] = [
    "a71288", "ac21e4", "a737c7", "a27e21", "a320a6", "a5b1c3", "a6d2e4", "a7f3a6", "ac3b9f", "ab44c6",
    "a1d2e3", "a9b8c7", "a8d7e6", "ac0048", "ab1614", "aa931d", "acc14a", "aaf766", "adedaa", "abc726",
    "c81acc", "aae365", "accde0", "aaedd1",
];

pub const C_CHECK_CODES: [(&str, &str); 3] = [
    ("780B67", "Due"),
    ("A67B89", "Due"),
    ("BCD123", "Overdue"),
];

/// Placeholder set for the first check type mentioned in the intent text.
///
/// A-Check wins over C-Check; other check types have no placeholder set.
pub fn placeholder_flights(intent_text: &str) -> Option<Vec<FlightRecord>> {
    if MaintenanceType::ACheck.mentioned_in(intent_text) {
        return Some(
            A_CHECK_CODES
                .iter()
                .map(|code| placeholder(code, PLACEHOLDER_STATUS, MaintenanceType::ACheck))
                .collect(),
        );
    }

    if MaintenanceType::CCheck.mentioned_in(intent_text) {
        return Some(
            C_CHECK_CODES
                .iter()
                .map(|(code, status)| placeholder(code, status, MaintenanceType::CCheck))
                .collect(),
        );
    }

    None
}

fn placeholder(code: &str, status: &str, maintenance_type: MaintenanceType) -> FlightRecord {
    FlightRecord {
        icao24: code.to_string(),
        flight_number: Some(format!("FL{}", suffix(code, 3))),
        aircraft_type: Some(PLACEHOLDER_AIRCRAFT.to_string()),
        status: status.to_string(),
        maintenance_type: maintenance_type.as_str().to_string(),
    }
}

fn suffix(code: &str, n: usize) -> &str {
    let start = code.char_indices().rev().nth(n.saturating_sub(1)).map_or(0, |(i, _)| i);
    &code[start..]
}
