//! Flight records derived from chat replies and their normalization.
//!
//! A [`FlightRecord`] is the one structured shape that both the heuristic
//! table extractor and the LLM structuring client produce. Anything coming
//! from outside (model JSON, parsed table rows) goes through
//! [`normalize_record`] first, which is also what guarantees the record has an
//! identifier and non-empty status/check fields.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const DEFAULT_STATUS: &str = "Needs Maintenance";
pub const DEFAULT_MAINTENANCE_TYPE: &str = "A-Check";

/// Airline maintenance-interval categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceType {
    #[serde(rename = "A-Check")]
    ACheck,
    #[serde(rename = "B-Check")]
    BCheck,
    #[serde(rename = "C-Check")]
    CCheck,
    #[serde(rename = "D-Check")]
    DCheck,
}

impl MaintenanceType {
    pub const ALL: [MaintenanceType; 4] = [
        MaintenanceType::ACheck,
        MaintenanceType::BCheck,
        MaintenanceType::CCheck,
        MaintenanceType::DCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::ACheck => "A-Check",
            MaintenanceType::BCheck => "B-Check",
            MaintenanceType::CCheck => "C-Check",
            MaintenanceType::DCheck => "D-Check",
        }
    }

    fn letter(&self) -> char {
        match self {
            MaintenanceType::ACheck => 'a',
            MaintenanceType::BCheck => 'b',
            MaintenanceType::CCheck => 'c',
            MaintenanceType::DCheck => 'd',
        }
    }

    /// Find the first check type a user asked for ("show me a-check flights").
    ///
    /// The keyword must stand alone: "a check", "A-Check" and "acheck" match,
    /// "paycheck" does not. Types are tried in A, B, C, D order.
    pub fn detect_in_text(text: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(?i)\b([abcd])[-\s]?check\b").expect("valid check keyword pattern")
        });
        Self::first_of(pattern, text)
    }

    /// Loose keyword test used for the structuring fallback (`a[-\s]?check`
    /// anywhere in the text, case-insensitive).
    pub fn mentioned_in(&self, text: &str) -> bool {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(?i)([abcd])[-\s]?check").expect("valid check keyword pattern")
        });
        Self::letters(pattern, text).contains(&self.letter())
    }

    fn first_of(pattern: &Regex, text: &str) -> Option<Self> {
        let found = Self::letters(pattern, text);
        Self::ALL.into_iter().find(|t| found.contains(&t.letter()))
    }

    fn letters(pattern: &Regex, text: &str) -> Vec<char> {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
}

impl fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaintenanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();

        match compact.as_str() {
            "a" | "acheck" => Ok(MaintenanceType::ACheck),
            "b" | "bcheck" => Ok(MaintenanceType::BCheck),
            "c" | "ccheck" => Ok(MaintenanceType::CCheck),
            "d" | "dcheck" => Ok(MaintenanceType::DCheck),
            _ => Err(format!("unknown maintenance type: {}", s)),
        }
    }
}

/// A normalized maintenance-status row for one aircraft/flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub icao24: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
    pub status: String,
    /// Free text on the wire; the four canonical values are what the model is
    /// asked for, but whatever it returns is kept (trimmed).
    pub maintenance_type: String,
}

impl FlightRecord {
    pub fn new(icao24: impl Into<String>) -> Self {
        Self {
            icao24: icao24.into(),
            flight_number: None,
            aircraft_type: None,
            status: DEFAULT_STATUS.to_string(),
            maintenance_type: DEFAULT_MAINTENANCE_TYPE.to_string(),
        }
    }

    /// Parsed check type, if the text is one of the known categories
    pub fn maintenance_kind(&self) -> Option<MaintenanceType> {
        self.maintenance_type.parse().ok()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("icao24".into(), Value::String(self.icao24.clone()));
        if let Some(ref n) = self.flight_number {
            map.insert("flightNumber".into(), Value::String(n.clone()));
        }
        if let Some(ref t) = self.aircraft_type {
            map.insert("aircraftType".into(), Value::String(t.clone()));
        }
        map.insert("status".into(), Value::String(self.status.clone()));
        map.insert("maintenanceType".into(), Value::String(self.maintenance_type.clone()));
        Value::Object(map)
    }
}

// Accepted spellings per field; the first key present wins
const ICAO_KEYS: &[&str] = &["icao24", "icao", "icao_24", "hex"];
const FLIGHT_KEYS: &[&str] = &["flightNumber", "flight_number", "flight", "callsign"];
const AIRCRAFT_KEYS: &[&str] = &["aircraftType", "aircraft_type", "aircraft", "type"];
const STATUS_KEYS: &[&str] = &["status"];
const MAINTENANCE_KEYS: &[&str] = &["maintenanceType", "maintenance_type", "maintenance", "check"];

/// Coerce one raw value (model output, parsed row) into a [`FlightRecord`].
///
/// Returns `None` for non-objects and for records whose `icao24` is empty
/// after trimming. Idempotent: feeding a normalized record back in returns it
/// unchanged.
pub fn normalize_record(raw: &Value) -> Option<FlightRecord> {
    let obj = raw.as_object()?;

    let icao24 = field(obj, ICAO_KEYS)?;

    Some(FlightRecord {
        icao24,
        flight_number: field(obj, FLIGHT_KEYS),
        aircraft_type: field(obj, AIRCRAFT_KEYS),
        status: field(obj, STATUS_KEYS).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        maintenance_type: field(obj, MAINTENANCE_KEYS)
            .unwrap_or_else(|| DEFAULT_MAINTENANCE_TYPE.to_string()),
    })
}

/// Normalize a list, dropping anything without an identifier
pub fn normalize_all<'a, I>(raw: I) -> Vec<FlightRecord>
where
    I: IntoIterator<Item = &'a Value>,
{
    raw.into_iter().filter_map(normalize_record).collect()
}

fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .and_then(coerce_to_string)
        .filter(|s| !s.is_empty())
}

/// Falsy values (null, false, empty string) count as absent
fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string().trim().to_string()),
    }
}
