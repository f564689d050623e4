//! Error types for the design bridge

use crate::command::CommandId;
use std::time::Duration;
use thiserror::Error;

/// Result type for bridge and tool operations
pub type Result<T> = std::result::Result<T, DesignError>;

/// Design bridge error types
///
/// `Clone` so one drain reason can settle every outstanding caller.
#[derive(Debug, Clone, Error)]
pub enum DesignError {
    /// No connection to the application when the command was sent
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Command was sent but no response arrived before the deadline
    #[error("Command '{command}' timed out after {}ms", .after.as_millis())]
    Timeout { command: String, after: Duration },

    /// The application explicitly rejected the command
    #[error("Application error: {message}")]
    Application { message: String, code: Option<i64> },

    /// Connection dropped while the command was outstanding
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Identifier generator produced an id that is still pending
    #[error("Duplicate command id: {0}")]
    DuplicateId(CommandId),

    /// Encoded request exceeds the frame limit; nothing was sent
    #[error("Request too large: {size} bytes (limit {limit})")]
    RequestTooLarge { size: usize, limit: usize },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Malformed traffic from the application
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Tool arguments failed validation
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Tool name not in the catalogue
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// What a failure says about whether the command reached the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The command was never applied
    NotApplied,
    /// The command may or may not have been applied
    Unknown,
    /// The command was refused
    Rejected,
}

impl DesignError {
    /// Classify this failure by delivery outcome
    pub fn delivery(&self) -> Delivery {
        match self {
            DesignError::TransportUnavailable(_)
            | DesignError::DuplicateId(_)
            | DesignError::RequestTooLarge { .. }
            | DesignError::SerializationError(_) => Delivery::NotApplied,
            DesignError::Timeout { .. }
            | DesignError::ConnectionLost(_)
            | DesignError::ProtocolError(_) => Delivery::Unknown,
            DesignError::Application { .. }
            | DesignError::InvalidParams(_)
            | DesignError::UnknownTool(_) => Delivery::Rejected,
        }
    }

    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            DesignError::Application { .. } => error_codes::APPLICATION_ERROR,
            DesignError::Timeout { .. } => error_codes::TIMEOUT,
            DesignError::TransportUnavailable(_) => error_codes::TRANSPORT_UNAVAILABLE,
            DesignError::ConnectionLost(_) => error_codes::CONNECTION_LOST,
            DesignError::InvalidParams(_) | DesignError::RequestTooLarge { .. } => {
                error_codes::INVALID_PARAMS
            }
            DesignError::UnknownTool(_) => error_codes::METHOD_NOT_FOUND,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

impl From<serde_json::Error> for DesignError {
    fn from(err: serde_json::Error) -> Self {
        DesignError::SerializationError(err.to_string())
    }
}

/// JSON-RPC error codes
pub mod error_codes {
    pub const APPLICATION_ERROR: i32 = -32000;
    pub const TIMEOUT: i32 = -32001;
    pub const TRANSPORT_UNAVAILABLE: i32 = -32002;
    pub const CONNECTION_LOST: i32 = -32003;

    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}
