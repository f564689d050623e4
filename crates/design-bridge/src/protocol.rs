//! Wire protocol for Rust <-> design application communication
//!
//! Outbound: `{"id": 1, "command": "shape:create-shape", "params": {...}}`
//!
//! Inbound is one of:
//! - a response `{"id": 1, "ok": true, "payload": {...}}`
//! - a pushed event `{"event": "selection-changed", "data": {...}}`

use crate::framing::check_frame_len;
use design_mcp_core::{AppEvent, CommandRequest, CommandResponse, DesignError, Result};
use serde::{Deserialize, Serialize};

/// A message received from the application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    /// Answer to a previously sent command
    Response(CommandResponse),
    /// Unsolicited notification
    Event(AppEvent),
}

/// Serialize a command request to JSON bytes
///
/// Fails with `RequestTooLarge` when the body would not fit in one frame.
pub fn encode_request(request: &CommandRequest) -> Result<Vec<u8>> {
    let data =
        serde_json::to_vec(request).map_err(|e| DesignError::SerializationError(e.to_string()))?;
    check_frame_len(data.len())?;
    Ok(data)
}

/// Deserialize an inbound message from JSON bytes
pub fn decode_inbound(bytes: &[u8]) -> Result<Inbound> {
    serde_json::from_slice(bytes)
        .map_err(|e| DesignError::ProtocolError(format!("Undecodable message: {}", e)))
}

/// First 200 characters of a frame, for logging
pub fn preview(data: &[u8]) -> String {
    String::from_utf8_lossy(data).chars().take(200).collect()
}
