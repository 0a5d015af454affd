//! sessionkeeper - client-side session lifecycle management.
//!
//! Keeps an authentication session valid across time, process restarts,
//! and connectivity gaps by scheduling proactive token refreshes ahead of
//! expiry, re-validating on user activity and environment signals, and
//! recovering from failures via a locally persisted backup credential.
//!
//! The crate manages the lifecycle of an opaque credential pair obtained
//! from, and validated by, an external auth backend; it issues and
//! verifies nothing itself.
//!
//! # Usage
//!
//! ```no_run
//! use sessionkeeper::{FileBackupStore, HttpAuthGateway, KeeperConfig, SessionKeeper};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = KeeperConfig::load()?;
//! let gateway = HttpAuthGateway::new(config.gateway_url.clone())?;
//! let backup = FileBackupStore::new(FileBackupStore::default_dir()?);
//!
//! let (keeper, handle) = SessionKeeper::new(config, gateway, backup);
//! tokio::spawn(keeper.run());
//!
//! // Wire environment events:
//! //   pointer/key/touch/scroll  -> handle.mark_activity()
//! //   window focus              -> handle.notify_focus()
//! //   connectivity restored     -> handle.notify_online()
//! //
//! // Gate screens on handle.has_session() / handle.subscribe().
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod backup;
pub mod config;
pub mod gateway;
pub mod keeper;
pub mod scheduler;
pub mod session;

pub use activity::ActivityTracker;
pub use backup::{BackupStore, FileBackupStore, KeyringBackupStore};
pub use config::KeeperConfig;
pub use gateway::{AuthGateway, GatewayError, HttpAuthGateway};
pub use keeper::{KeeperHandle, KeeperState, Phase, SessionKeeper, SessionSnapshot, Signal};
pub use scheduler::RefreshScheduler;
pub use session::{Session, TokenPair};
