//! Per-user search history kept on the profile document.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{from_document, to_document, SearchHistoryItem, UserProfile, USERS};
use crate::database::DocumentStore;
use crate::error::{AeroResult, AeroTrackError};

pub const MAX_HISTORY: usize = 50;

pub struct SearchHistory {
    store: Arc<dyn DocumentStore>,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Prepend a query to the user's history, keeping the newest entries.
    ///
    /// Creates the profile document when it doesn't exist; any other fields
    /// already on it are left alone.
    pub async fn save_search(&self, uid: &str, query: &str, results: Option<Value>) -> AeroResult<SearchHistoryItem> {
        if uid.trim().is_empty() || query.trim().is_empty() {
            return Err(AeroTrackError::invalid_input("User ID and query are required"));
        }

        let now = Utc::now();
        let mut doc = match self.store.get(USERS, uid).await? {
            Some(doc) if doc.is_object() => doc,
            _ => json!({
                "uid": uid,
                "searchHistory": [],
                "createdAt": now,
            }),
        };

        let item = SearchHistoryItem {
            id: now.timestamp_millis().to_string(),
            query: query.to_string(),
            timestamp: now,
            results,
        };

        let mut history = doc
            .get("searchHistory")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        history.insert(0, to_document(&item)?);
        history.truncate(MAX_HISTORY);

        doc["searchHistory"] = Value::Array(history);
        doc["lastUpdated"] = json!(now);

        self.store.put(USERS, uid, &doc).await?;
        debug!("Saved search for {}: {}", uid, query);
        Ok(item)
    }

    /// Newest `limit` entries; empty when the user has no profile yet
    pub async fn recent(&self, uid: &str, limit: usize) -> AeroResult<Vec<SearchHistoryItem>> {
        let Some(doc) = self.store.get(USERS, uid).await? else {
            return Ok(Vec::new());
        };

        let profile: UserProfile = from_document(USERS, doc)?;
        Ok(profile.search_history.into_iter().take(limit).collect())
    }
}
