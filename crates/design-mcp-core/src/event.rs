//! Push notifications from the application

use serde::{Deserialize, Serialize};

/// Unsolicited event pushed by the application (selection changed, page switched, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEvent {
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl AppEvent {
    /// Whether this is the greeting sent once after connecting
    pub fn is_hello(&self) -> bool {
        self.event == "hello"
    }
}
