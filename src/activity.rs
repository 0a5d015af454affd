//! User-activity tracking.
//!
//! Records the instant of the last observed user interaction (pointer
//! press, key press, touch, scroll) and answers staleness queries. The
//! tracker is never a source of truth for authentication - it only decides
//! whether an inactivity-derived re-validation should fire.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;

/// Tracks the last observed user interaction.
///
/// Cheap to clone: environment event handlers and the keeper share one
/// timestamp through an `Arc`. Uses the tokio clock so staleness follows
/// virtual time under `tokio::time::pause`.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    last_activity: Arc<RwLock<Instant>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            last_activity: Arc::new(RwLock::new(Instant::now())),
        }
    }

    /// Record "now" as the last-activity instant.
    pub fn mark(&self) {
        let mut last = self
            .last_activity
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Instant::now();
    }

    pub fn last_mark(&self) -> Instant {
        *self
            .last_activity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Elapsed time since the last mark.
    pub fn idle_for(&self) -> Duration {
        // duration_since saturates to zero for marks recorded "later"
        // on another thread's view of now.
        Instant::now().duration_since(self.last_mark())
    }

    /// Whether the elapsed time since the last mark exceeds the threshold.
    pub fn stale_for(&self, threshold: Duration) -> bool {
        self.idle_for() > threshold
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}
