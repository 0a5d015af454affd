//! Keychain-backed backup record storage.

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use crate::session::TokenPair;

use super::BackupStore;

const SERVICE_NAME: &str = "sessionkeeper";

/// Keychain account name the backup record is stored under
const ACCOUNT: &str = "session-backup";

/// Backup store keeping the credential pair in the OS keychain.
///
/// The pair is serialized to JSON and stored as the entry's secret. On
/// platforms without a keychain service the operations degrade per the
/// [`BackupStore`] contract.
pub struct KeyringBackupStore {
    service: String,
    account: String,
}

impl KeyringBackupStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME, ACCOUNT)
    }

    /// Use a non-default service/account, e.g. to isolate test entries.
    pub fn with_service(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account).context("Failed to create keyring entry")
    }

    fn try_save(&self, pair: &TokenPair) -> Result<()> {
        let contents = serde_json::to_string(pair)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store backup record in keychain")?;
        Ok(())
    }

    fn try_load(&self) -> Result<Option<TokenPair>> {
        match self.entry()?.get_password() {
            Ok(contents) => {
                let pair: TokenPair = serde_json::from_str(&contents)
                    .context("Failed to parse keychain backup record")?;
                Ok(Some(pair))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read backup record from keychain"),
        }
    }

    fn try_clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete backup record from keychain"),
        }
    }
}

impl Default for KeyringBackupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupStore for KeyringBackupStore {
    fn save(&self, pair: &TokenPair) {
        match self.try_save(pair) {
            Ok(()) => debug!("backup record saved to keychain"),
            Err(e) => warn!(error = %e, "Failed to save backup record to keychain"),
        }
    }

    fn load(&self) -> Option<TokenPair> {
        match self.try_load() {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to load backup record from keychain");
                None
            }
        }
    }

    fn clear(&self) {
        match self.try_clear() {
            Ok(()) => debug!("keychain backup record cleared"),
            Err(e) => warn!(error = %e, "Failed to clear keychain backup record"),
        }
    }
}
