//! Backup credential persistence.
//!
//! This module provides durable storage for at most one credential pair,
//! used to recover a session across restarts when the live check comes
//! back empty:
//! - `FileBackupStore`: one JSON file in the OS cache directory
//! - `KeyringBackupStore`: one entry in the OS keychain via keyring
//!
//! Every operation is best-effort: an unavailable store degrades to a
//! no-op instead of failing the keeper.

pub mod keychain;
pub mod store;

pub use keychain::KeyringBackupStore;
pub use store::{BackupStore, FileBackupStore};
