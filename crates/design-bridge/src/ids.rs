//! Correlation identifier strategies

use design_mcp_core::CommandId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of correlation identifiers
///
/// Implementations must not hand out an id that is still pending; the bridge
/// double-checks against its correlation table.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> CommandId;
}

/// Monotonic counter starting at 1
#[derive(Debug)]
pub struct MonotonicIds {
    next: AtomicU64,
}

impl MonotonicIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for MonotonicIds {
    fn next_id(&self) -> CommandId {
        CommandId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
