//! Session and credential value types.
//!
//! A `Session` is the unit this crate keeps valid: an opaque credential
//! pair plus its expiry and the account identity it belongs to. Sessions
//! are immutable and replaced wholesale on every successful gateway
//! observation, never mutated field by field.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session as observed from the auth backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// Account identifier (typically an email address).
    pub identity: String,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Check whether the session expires within the given window.
    pub fn expires_within(&self, window: Duration) -> bool {
        Utc::now() + window > self.expires_at
    }

    /// Seconds remaining until expiry (for logging/display).
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }

    /// The credential pair, as persisted to the backup store.
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

// Tokens must not end up in logs via {:?}.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

/// An opaque credential pair.
///
/// This is the shape written to the backup store: tokens only, no identity
/// and no expiry. The auth backend re-derives both when the pair is
/// re-installed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}
