//! File-backed backup record storage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::session::TokenPair;

/// Application name used for the default backup directory
const APP_NAME: &str = "sessionkeeper";

/// Backup file name in the store directory
const BACKUP_FILE: &str = "backup.json";

/// Durable storage for at most one credential pair.
///
/// Persistence problems never propagate to the caller: `save` and `clear`
/// degrade to a no-op, `load` to `None`. The keeper treats a missing
/// backup and an unavailable store identically.
pub trait BackupStore: Send + Sync {
    /// Persist a credential pair, overwriting any prior record.
    fn save(&self, pair: &TokenPair);

    /// The last saved record, or `None` if none exists or the store is
    /// unavailable.
    fn load(&self) -> Option<TokenPair>;

    /// Remove any stored record.
    fn clear(&self);
}

impl<S: BackupStore> BackupStore for Arc<S> {
    fn save(&self, pair: &TokenPair) {
        S::save(self, pair)
    }

    fn load(&self) -> Option<TokenPair> {
        S::load(self)
    }

    fn clear(&self) {
        S::clear(self)
    }
}

/// Backup store persisting one JSON file on disk.
pub struct FileBackupStore {
    dir: PathBuf,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default backup directory under the OS cache location.
    pub fn default_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    fn try_save(&self, pair: &TokenPair) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(pair)?;
        std::fs::write(self.backup_path(), contents)?;
        Ok(())
    }

    fn try_load(&self) -> Result<Option<TokenPair>> {
        let path = self.backup_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read backup file")?;
        let pair: TokenPair =
            serde_json::from_str(&contents).context("Failed to parse backup file")?;
        Ok(Some(pair))
    }

    fn try_clear(&self) -> Result<()> {
        let path = self.backup_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl BackupStore for FileBackupStore {
    fn save(&self, pair: &TokenPair) {
        match self.try_save(pair) {
            Ok(()) => debug!("backup record saved"),
            Err(e) => warn!(error = %e, "Failed to save backup record"),
        }
    }

    fn load(&self) -> Option<TokenPair> {
        match self.try_load() {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to load backup record");
                None
            }
        }
    }

    fn clear(&self) {
        match self.try_clear() {
            Ok(()) => debug!("backup record cleared"),
            Err(e) => warn!(error = %e, "Failed to clear backup record"),
        }
    }
}
