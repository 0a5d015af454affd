//! One-shot pre-expiry refresh timer.
//!
//! The scheduler arms a single deadline ahead of session expiry and hands
//! it to the keeper's `tokio::select!` loop through [`RefreshScheduler::wait`].
//! Re-arming replaces any pending deadline, so at most one refresh is ever
//! outstanding. While disarmed, `wait` pends forever and the other select
//! branches keep running.

use chrono::{DateTime, Utc};
use tokio::time::{self, Instant};
use tracing::debug;

pub struct RefreshScheduler {
    /// How long before expiry the refresh should fire.
    lead: chrono::Duration,
    deadline: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(lead: chrono::Duration) -> Self {
        Self {
            lead,
            deadline: None,
        }
    }

    /// Arm the refresh deadline for a session expiring at `expires_at`.
    ///
    /// The deadline is `expires_at - lead`, clamped to now: a session
    /// already inside the lead window refreshes immediately instead of
    /// being scheduled into the past. Any previously armed deadline is
    /// replaced.
    pub fn arm(&mut self, expires_at: DateTime<Utc>) {
        let until_refresh = (expires_at - self.lead) - Utc::now();
        // to_std fails on negative durations, which is exactly the
        // already-inside-the-window case.
        let delay = until_refresh.to_std().unwrap_or(std::time::Duration::ZERO);

        let replaced = self.deadline.is_some();
        self.deadline = Some(Instant::now() + delay);
        debug!(
            delay_secs = delay.as_secs(),
            replaced, "proactive refresh armed"
        );
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            debug!("proactive refresh canceled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time remaining until the armed deadline, if any.
    pub fn armed_in(&self) -> Option<std::time::Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Sleep until the armed deadline, then disarm and return.
    ///
    /// Pends forever while disarmed. Safe to drop mid-sleep (as
    /// `tokio::select!` does when another branch wins): the deadline stays
    /// armed and the next call picks it up again.
    pub async fn wait(&mut self) {
        match self.deadline {
            Some(deadline) => {
                time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
