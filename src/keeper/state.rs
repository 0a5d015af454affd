//! Keeper state and the snapshot exported to consumers.

use crate::session::Session;

/// Authentication phase of the keeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No valid session; consumers should redirect to re-authentication.
    Unauthenticated,
    /// Session confirmed by a direct gateway observation.
    Authenticated,
    /// Operating on a restored backup credential that the backend accepted
    /// but which has not yet been reconfirmed by a direct observation.
    Degraded,
}

/// The keeper's owned state.
///
/// The keeper task is the sole mutator; nothing here is shared. The
/// session is present exactly when the phase is session-bearing, and only
/// ever as the result of a successful gateway call.
#[derive(Debug)]
pub struct KeeperState {
    pub phase: Phase,
    pub current: Option<Session>,
    /// Re-validation attempts since the last success; the circuit breaker
    /// counter.
    pub check_count: u32,
}

impl KeeperState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Unauthenticated,
            current: None,
            check_count: 0,
        }
    }

    pub fn has_session(&self) -> bool {
        self.current.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            has_session: self.has_session(),
            identity: self.current.as_ref().map(|s| s.identity.clone()),
            phase: self.phase,
        }
    }
}

impl Default for KeeperState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the current session state.
///
/// This is the keeper's entire consumer-facing surface: downstream screens
/// poll or subscribe to it for access-gating decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub has_session: bool,
    pub identity: Option<String>,
    pub phase: Phase,
}

impl SessionSnapshot {
    pub fn empty() -> Self {
        Self {
            has_session: false,
            identity: None,
            phase: Phase::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(identity: &str) -> Session {
        Session {
            access_token: "at-1".to_string(),
            refresh_token: "rt-1".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
            identity: identity.to_string(),
        }
    }

    #[test]
    fn test_new_state_is_unauthenticated() {
        let state = KeeperState::new();
        assert_eq!(state.phase, Phase::Unauthenticated);
        assert!(!state.has_session());
        assert_eq!(state.check_count, 0);
        assert_eq!(state.snapshot(), SessionSnapshot::empty());
    }

    #[test]
    fn test_snapshot_reflects_session() {
        let mut state = KeeperState::new();
        state.phase = Phase::Authenticated;
        state.current = Some(session("user@example.com"));

        let snapshot = state.snapshot();
        assert!(snapshot.has_session);
        assert_eq!(snapshot.identity.as_deref(), Some("user@example.com"));
        assert_eq!(snapshot.phase, Phase::Authenticated);
    }
}
