use serde_json::Value;
use thiserror::Error;

use crate::utils::flatten_error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned an error: {status}{}", detail(.message))]
    Server { status: u16, message: Option<String> },

    #[error("Failed to read response body: {0}")]
    Decode(String),
}

impl StoreError {
    /// Builds a server error from a non-2xx response body. The `error` field is
    /// preferred, `message` is the fallback.
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Server {
            status,
            message: server_message(body),
        }
    }

    /// The text a user should see for this failure.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            StoreError::Server { status, .. } => format!("HTTP {status}"),
            other => flatten_error(other),
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({m})"))
        .unwrap_or_default()
}

fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|field| value.get(field))
        .map(|message| match message {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
