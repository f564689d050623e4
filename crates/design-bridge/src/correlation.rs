//! Correlation table for in-flight commands
//!
//! Each entry is removed exactly once, by whichever of response, deadline,
//! or drain gets to it first. Removal happens under the table lock, so later
//! settlement attempts for the same id find nothing and return `false`.

use design_mcp_core::{CommandId, DesignError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

/// Outcome delivered to the waiting caller
pub type Settlement = Result<serde_json::Value>;

/// Bookkeeping for one command awaiting its response
#[derive(Debug)]
pub struct PendingRequest {
    /// Correlation id
    pub id: CommandId,
    /// Command name, kept for diagnostics
    pub command: String,
    /// When the command was registered
    pub created_at: Instant,
    settle: oneshot::Sender<Settlement>,
    deadline: Option<AbortHandle>,
}

impl PendingRequest {
    pub fn new(
        id: CommandId,
        command: impl Into<String>,
        settle: oneshot::Sender<Settlement>,
    ) -> Self {
        Self {
            id,
            command: command.into(),
            created_at: Instant::now(),
            settle,
            deadline: None,
        }
    }

    /// Time since registration
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Deliver the outcome and cancel the deadline timer
    ///
    /// Returns false if the caller has stopped waiting.
    pub fn settle(mut self, outcome: Settlement) -> bool {
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }
        self.settle.send(outcome).is_ok()
    }
}

/// In-flight commands keyed by correlation id
#[derive(Debug, Default)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<CommandId, PendingRequest>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    // The map is only touched by non-panicking code, so a poisoned lock
    // still holds a consistent map.
    fn entries(&self) -> MutexGuard<'_, HashMap<CommandId, PendingRequest>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a new pending request
    pub fn register(&self, pending: PendingRequest) -> Result<()> {
        let mut entries = self.entries();
        if entries.contains_key(&pending.id) {
            return Err(DesignError::DuplicateId(pending.id));
        }
        entries.insert(pending.id, pending);
        Ok(())
    }

    /// Attach a deadline timer to a pending entry
    ///
    /// If the entry already settled the timer is aborted and false is returned.
    pub fn arm_deadline(&self, id: CommandId, deadline: AbortHandle) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(&id) {
            Some(pending) => {
                pending.deadline = Some(deadline);
                true
            }
            None => {
                deadline.abort();
                false
            }
        }
    }

    /// Complete a request successfully; false if `id` is not pending
    pub fn resolve(&self, id: CommandId, payload: serde_json::Value) -> bool {
        self.settle(id, Ok(payload))
    }

    /// Fail a request; false if `id` is not pending
    pub fn reject(&self, id: CommandId, error: DesignError) -> bool {
        self.settle(id, Err(error))
    }

    /// Remove `id` and deliver `outcome` to its caller
    pub fn settle(&self, id: CommandId, outcome: Settlement) -> bool {
        let pending = self.entries().remove(&id);
        match pending {
            Some(pending) => {
                if !pending.settle(outcome) {
                    debug!("Caller for command {} stopped waiting", id);
                }
                true
            }
            None => false,
        }
    }

    /// Remove `id` without settling it; the caller decides the outcome
    pub fn evict(&self, id: CommandId) -> Option<PendingRequest> {
        self.entries().remove(&id)
    }

    /// Fail every pending request with `error` and empty the table
    ///
    /// Returns the number of requests that were drained.
    pub fn drain_all(&self, error: DesignError) -> usize {
        let drained: Vec<PendingRequest> = self.entries().drain().map(|(_, p)| p).collect();
        let count = drained.len();
        for pending in drained {
            pending.settle(Err(error.clone()));
        }
        count
    }

    /// Whether `id` is currently pending
    pub fn contains(&self, id: CommandId) -> bool {
        self.entries().contains_key(&id)
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
