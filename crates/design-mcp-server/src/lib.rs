//! # design-mcp-server
//!
//! MCP server exposing a running design application as tools.
//!
//! This crate provides:
//! - `CommandExecutor` trait, implemented by `design_bridge::CommandBridge`
//! - MCP JSON-RPC protocol handling over stdio
//! - The tool catalogue (shapes, frames, pages, icons)
//! - Color-name translation and payload filtering for readable results

pub mod colors;
pub mod executor;
pub mod filter;
pub mod format;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use executor::CommandExecutor;
pub use tools::{CommandKind, list_tools};

use design_mcp_core::Result;
use std::sync::Arc;

/// Design MCP server
pub struct DesignMcpServer<E: CommandExecutor> {
    /// Command executor shared with in-flight tool calls
    executor: Arc<E>,
    /// Name reported in serverInfo
    name: String,
    /// Version reported in serverInfo
    version: String,
}

impl<E: CommandExecutor> DesignMcpServer<E> {
    /// Create a new server around the given executor
    pub fn new(executor: E) -> Self {
        Self::from_arc(Arc::new(executor))
    }

    /// Create a server sharing an existing executor
    pub fn from_arc(executor: Arc<E>) -> Self {
        Self {
            executor,
            name: "design-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Run the server on stdio transport
    pub async fn run_stdio(self) -> Result<()> {
        transport::stdio::run(self).await
    }

    /// The executor tool calls are sent to
    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }
}
