//! Session keeper orchestration.
//!
//! The keeper owns the current session state and runs the unified
//! re-validation routine. Five trigger sources (startup, the periodic
//! timer, the pre-expiry refresh deadline, activity-derived staleness,
//! and external focus/online signals) all funnel into that one routine,
//! which consults the auth gateway, updates state, re-arms the refresh
//! scheduler, and maintains the backup record.
//!
//! Consumers interact only through [`KeeperHandle`]: a read-only session
//! snapshot plus signal/activity inlets. No failure inside the keeper is
//! ever surfaced as an error - everything resolves to a state transition.

pub mod service;
pub mod state;

pub use service::{KeeperHandle, SessionKeeper, Signal};
pub use state::{KeeperState, Phase, SessionSnapshot};
