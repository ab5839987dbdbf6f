//! Client for the conversational dialog agent.
//!
//! The agent owns all of the conversation understanding; this side only sends
//! the user's text for a session and joins the text messages it answers with.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::DialogConfig;
use crate::error::{AeroResult, AeroTrackError};

#[async_trait]
pub trait DialogAgent: Send + Sync {
    /// One reply for `text` within the conversation identified by `session_id`
    async fn reply(&self, session_id: &str, text: &str) -> AeroResult<String>;
}

/// Posts detectIntent-style requests to a dialog agent endpoint.
///
/// `{url}` may contain `{session}`, which is replaced with the session id;
/// otherwise the session id is sent in the body.
pub struct HttpDialogAgent {
    client: Client,
    url: String,
    token: Option<String>,
    language_code: String,
}

impl HttpDialogAgent {
    pub fn new(config: &DialogConfig) -> AeroResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AeroTrackError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
            language_code: config.language_code.clone(),
        })
    }

    fn request_body(&self, session_id: &str, text: &str) -> Value {
        json!({
            "session": session_id,
            "queryInput": {
                "text": { "text": text },
                "languageCode": self.language_code,
            },
        })
    }
}

#[async_trait]
impl DialogAgent for HttpDialogAgent {
    async fn reply(&self, session_id: &str, text: &str) -> AeroResult<String> {
        let url = self.url.replace("{session}", session_id);

        let mut request = self.client.post(&url).json(&self.request_body(session_id, text));
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AeroTrackError::transport("dialog agent", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AeroTrackError::transport_message(
                "dialog agent",
                format!("{}: {}", status, error_text),
            ));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AeroTrackError::transport("dialog agent", e))?;

        let reply = reply_text(&data);
        debug!("Dialog agent replied with {} chars", reply.len());

        if reply.trim().is_empty() {
            return Err(AeroTrackError::transport_message(
                "dialog agent",
                "response contained no text messages",
            ));
        }
        Ok(reply)
    }
}

/// Join `queryResult.responseMessages[].text.text[]` with newlines
pub fn reply_text(data: &Value) -> String {
    data["queryResult"]["responseMessages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["text"]["text"].as_array())
                .flatten()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}
