//! Command bridge to a running design application
//!
//! This crate provides:
//! - Wire protocol for command requests, responses and pushed events
//! - Length-prefixed framing shared by all socket transports
//! - Transport abstractions (AsyncReader/AsyncWriter traits) with TCP and Unix socket implementations
//! - Correlation table tracking in-flight commands by identifier
//! - `CommandBridge`, which sends a command and waits for its matching response or deadline

pub mod bridge;
pub mod config;
pub mod correlation;
pub mod framing;
pub mod ids;
pub mod protocol;
pub mod tcp;
pub mod transport;
#[cfg(unix)]
pub mod unix;

pub use bridge::CommandBridge;
pub use config::{BridgeConfig, Endpoint};
pub use correlation::{CorrelationTable, PendingRequest};
pub use ids::{IdGenerator, MonotonicIds};
pub use protocol::{Inbound, decode_inbound, encode_request};
pub use transport::{AsyncReader, AsyncWriter, Transport, TransportListener};
