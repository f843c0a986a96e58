use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Counts in-flight operations and queued work items.
///
/// Both values are plain signed integers with no floor: an unbalanced
/// decrement makes them negative and they stay that way until incremented
/// again. The counts are held in shared cells so the `active_requests` and
/// `queue_depth` instruments can use them as their own storage, which makes
/// every tracker mutation and the matching instrument update one atomic step.
#[derive(Debug, Default)]
pub struct ActiveOperationTracker {
    active: Arc<AtomicI64>,
    queue_depth: Arc<AtomicI64>,
}

impl ActiveOperationTracker {
    /// Create a tracker with both counts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one more operation as in flight.
    pub fn increment_active(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks one operation as finished.
    pub fn decrement_active(&self) {
        let previous = self.active.fetch_sub(1, Ordering::SeqCst);
        if previous <= 0 {
            core_debug!(
                name: "ActiveOperationTracker.NegativeActiveCount",
                active = previous - 1
            );
        }
    }

    /// Adds `delta` to the queue depth.
    pub fn update_queue_depth(&self, delta: i64) {
        let previous = self.queue_depth.fetch_add(delta, Ordering::SeqCst);
        if previous >= 0 && previous.wrapping_add(delta) < 0 {
            core_debug!(
                name: "ActiveOperationTracker.NegativeQueueDepth",
                queue_depth = previous.wrapping_add(delta)
            );
        }
    }

    /// Number of operations currently in flight.
    pub fn active(&self) -> i64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of queued work items.
    pub fn queue_depth(&self) -> i64 {
        self.queue_depth.load(Ordering::SeqCst)
    }

    pub(crate) fn active_cell(&self) -> Arc<AtomicI64> {
        Arc::clone(&self.active)
    }

    pub(crate) fn queue_depth_cell(&self) -> Arc<AtomicI64> {
        Arc::clone(&self.queue_depth)
    }
}
