//! Command executor trait

use async_trait::async_trait;
use design_bridge::CommandBridge;
use design_mcp_core::{AppEvent, Result};
use tokio::sync::broadcast;

/// Anything that can run a named command against the design application
///
/// The tool layer only ever calls `execute`; the other methods feed status
/// resources and event forwarding.
#[async_trait]
pub trait CommandExecutor: Send + Sync + 'static {
    /// Run one command and return the application's payload
    async fn execute(&self, command: &str, params: serde_json::Value) -> Result<serde_json::Value>;

    /// Whether the application is reachable
    fn is_connected(&self) -> bool {
        true
    }

    /// Commands awaiting a response
    fn pending_count(&self) -> usize {
        0
    }

    /// Subscribe to pushed application events, if supported
    fn subscribe_events(&self) -> Option<broadcast::Receiver<AppEvent>> {
        None
    }

    /// Called when the server is shutting down
    async fn shutdown(&self) {}
}

#[async_trait]
impl CommandExecutor for CommandBridge {
    async fn execute(&self, command: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        CommandBridge::execute(self, command, params).await
    }

    fn is_connected(&self) -> bool {
        CommandBridge::is_connected(self)
    }

    fn pending_count(&self) -> usize {
        CommandBridge::pending_count(self)
    }

    fn subscribe_events(&self) -> Option<broadcast::Receiver<AppEvent>> {
        Some(CommandBridge::subscribe_events(self))
    }

    async fn shutdown(&self) {
        CommandBridge::shutdown(self)
    }
}
