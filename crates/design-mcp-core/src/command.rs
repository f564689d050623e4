//! Commands exchanged with the controlled application

use crate::error::{DesignError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation identifier linking a request to its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for CommandId {
    fn from(value: u64) -> Self {
        CommandId(value)
    }
}

/// A named command sent to the application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub id: CommandId,
    pub command: String,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl CommandRequest {
    pub fn new(id: CommandId, command: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            id,
            command: command.into(),
            params,
        }
    }
}

/// The application's answer to a single command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub id: CommandId,
    pub ok: bool,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandResponse {
    pub fn success(id: CommandId, payload: serde_json::Value) -> Self {
        Self {
            id,
            ok: true,
            payload,
        }
    }

    pub fn failure(id: CommandId, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            payload: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Convert into the caller-facing outcome
    ///
    /// A failed response becomes [`DesignError::Application`]. The message is
    /// taken from `payload.message`, a bare string payload, or the payload's
    /// JSON text, in that order.
    pub fn into_result(self) -> Result<serde_json::Value> {
        if self.ok {
            return Ok(self.payload);
        }

        let code = self.payload.get("code").and_then(|c| c.as_i64());
        let message = match &self.payload {
            serde_json::Value::String(s) => s.clone(),
            other => match other.get("message").and_then(|m| m.as_str()) {
                Some(m) => m.to_string(),
                None if other.is_null() => "command failed".to_string(),
                None => other.to_string(),
            },
        };

        Err(DesignError::Application { message, code })
    }
}
