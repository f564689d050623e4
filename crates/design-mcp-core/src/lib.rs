//! # design-mcp-core
//!
//! Core types shared by the design application bridge and its MCP server.
//!
//! This crate provides:
//! - Command requests and responses exchanged with the controlled application
//! - Correlation identifiers
//! - Application push events
//! - The error taxonomy surfaced to tool callers

pub mod command;
pub mod error;
pub mod event;

pub use command::{CommandId, CommandRequest, CommandResponse};
pub use error::{Delivery, DesignError, Result, error_codes};
pub use event::AppEvent;
