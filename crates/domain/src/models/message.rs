//! Generic acknowledgement returned by mutating endpoints.

use serde::{Deserialize, Serialize};

/// `{message}` body returned by the backend on success and on most failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageResponse {
    /// The server message, or `fallback` when the body carried none.
    pub fn text_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}
