//! Command bridge to the design application
//!
//! `execute` turns a command name and parameters into a correlated request,
//! sends it, and waits for the response carrying the same id. Each call
//! settles exactly once: with the application's payload, an application
//! error, a timeout, or a transport failure. Nothing is retried.

use crate::config::BridgeConfig;
use crate::correlation::{CorrelationTable, PendingRequest};
use crate::ids::{IdGenerator, MonotonicIds};
use crate::protocol::{Inbound, encode_request, preview};
use crate::transport::{AsyncReader, AsyncWriter, Transport, TransportListener};
use design_mcp_core::{AppEvent, CommandId, CommandRequest, DesignError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

/// Attempts at drawing an id that is not already pending
const MAX_ID_ATTEMPTS: usize = 8;

/// Routes transport traffic into the correlation table
struct Dispatcher {
    table: Arc<CorrelationTable>,
    event_tx: broadcast::Sender<AppEvent>,
}

impl TransportListener for Dispatcher {
    fn on_message(&self, message: Inbound) {
        match message {
            Inbound::Response(response) => {
                let id = response.id;
                if !self.table.settle(id, response.into_result()) {
                    warn!("Discarding response for unknown command {}", id);
                }
            }
            Inbound::Event(event) => {
                if event.is_hello() {
                    info!("Application says hello: {}", event.data);
                }
                let _ = self.event_tx.send(event);
            }
        }
    }

    fn on_disconnect(&self, reason: &str) {
        let drained = self
            .table
            .drain_all(DesignError::ConnectionLost(reason.to_string()));
        if drained > 0 {
            warn!("Failed {} pending command(s): connection lost", drained);
        }
    }
}

struct Inner {
    config: BridgeConfig,
    table: Arc<CorrelationTable>,
    transport: Transport,
    ids: Arc<dyn IdGenerator>,
    event_tx: broadcast::Sender<AppEvent>,
}

/// Handle to a command bridge
///
/// Cheap to clone; all clones share one connection and correlation table.
#[derive(Clone)]
pub struct CommandBridge {
    inner: Arc<Inner>,
}

impl CommandBridge {
    /// Create a disconnected bridge with monotonic ids
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_ids(config, Arc::new(MonotonicIds::new()))
    }

    /// Create a disconnected bridge with a custom id strategy
    pub fn with_ids(config: BridgeConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let table = Arc::new(CorrelationTable::new());
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let dispatcher = Arc::new(Dispatcher {
            table: table.clone(),
            event_tx: event_tx.clone(),
        });

        Self {
            inner: Arc::new(Inner {
                config,
                table,
                transport: Transport::new(dispatcher),
                ids,
                event_tx,
            }),
        }
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Connect to the configured endpoint
    pub async fn connect(&self) -> Result<()> {
        let config = &self.inner.config;
        self.inner
            .transport
            .connect(&config.endpoint, config.connect_timeout)
            .await
    }

    /// Use an already established connection
    pub fn attach<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncReader + 'static,
        W: AsyncWriter + 'static,
    {
        self.inner.transport.attach(reader, writer);
    }

    /// Whether the application is connected
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Number of commands awaiting a response
    pub fn pending_count(&self) -> usize {
        self.inner.table.len()
    }

    /// Subscribe to events pushed by the application
    pub fn subscribe_events(&self) -> broadcast::Receiver<AppEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Execute a command with the configured deadline
    pub async fn execute(
        &self,
        command: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.execute_with_timeout(command, params, self.inner.config.command_timeout)
            .await
    }

    /// Execute a command, failing with `Timeout` if no response arrives within `timeout`
    pub async fn execute_with_timeout(
        &self,
        command: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let table = &self.inner.table;

        let id = self.allocate_id()?;
        let request = CommandRequest::new(id, command, params);
        let data = encode_request(&request)?;

        let (settle_tx, settle_rx) = oneshot::channel();
        table.register(PendingRequest::new(id, command, settle_tx))?;

        // Armed before sending so an abandoned or stalled call still expires
        let deadline = tokio::spawn(expire(table.clone(), id, command.to_string(), timeout));
        table.arm_deadline(id, deadline.abort_handle());

        debug!("[Rust→App] {} len={} json={}", id, data.len(), preview(&data));

        // Queued for the writer task; never waits on the socket
        if let Err(e) = self.inner.transport.send(data) {
            if let Some(pending) = table.evict(id) {
                pending.settle(Err(e.clone()));
            }
            warn!("Command {} '{}' not sent: {}", id, command, e);
            return Err(e);
        }

        settle_rx.await.unwrap_or_else(|_| {
            Err(DesignError::ConnectionLost(
                "command dropped without a response".into(),
            ))
        })
    }

    /// Close the connection; pending commands fail with `ConnectionLost`
    pub fn shutdown(&self) {
        info!("Shutting down command bridge");
        self.inner.transport.close();
    }

    fn allocate_id(&self) -> Result<CommandId> {
        let mut id = self.inner.ids.next_id();
        for _ in 1..MAX_ID_ATTEMPTS {
            if !self.inner.table.contains(id) {
                return Ok(id);
            }
            debug!("Command id {} still pending, drawing another", id);
            id = self.inner.ids.next_id();
        }

        if self.inner.table.contains(id) {
            Err(DesignError::DuplicateId(id))
        } else {
            Ok(id)
        }
    }
}

/// Deadline timer for one command
async fn expire(table: Arc<CorrelationTable>, id: CommandId, command: String, after: Duration) {
    tokio::time::sleep(after).await;

    if let Some(pending) = table.evict(id) {
        warn!(
            "Command {} '{}' timed out after {:?}",
            id,
            pending.command,
            pending.age()
        );
        pending.settle(Err(DesignError::Timeout { command, after }));
    }
}
