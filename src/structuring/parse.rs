//! Recovering the `{flights: [...]}` object from model output.

use serde_json::Value;
use tracing::debug;

/// Parse model output as JSON.
///
/// Direct parse first; if that fails, retry on the slice between the first
/// `{` and the last `}` (models like to wrap JSON in prose or code fences).
/// `None` when neither works.
pub fn parse_model_output(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value) => {
            debug!("Recovered JSON object from wrapped model output");
            Some(value)
        }
        Err(e) => {
            debug!("Model output is not JSON: {}", e);
            None
        }
    }
}

/// The raw `flights` array, or nothing when the key is missing or not an array
pub fn flights_array(value: &Value) -> Vec<Value> {
    value
        .get("flights")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
