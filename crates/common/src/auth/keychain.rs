//! OS keychain credential store
//!
//! One keychain entry per key under a single service name (macOS Keychain,
//! Windows Credential Manager, Linux Secret Service via `keyring`).

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::store::{CredentialStore, StoreError};

/// Credential store backed by the platform keychain
#[derive(Debug, Clone)]
pub struct KeychainCredentialStore {
    service_name: String,
}

impl KeychainCredentialStore {
    /// # Examples
    /// ```
    /// use tidylinker_common::KeychainCredentialStore;
    ///
    /// let store = KeychainCredentialStore::new("TidyLinker");
    /// assert_eq!(store.service_name(), "TidyLinker");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StoreError::Keychain(format!("Failed to create keychain entry for {key}: {e}"))
        })
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        match self.create_entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Keychain(format!("Failed to retrieve {key}: {e}"))),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        self.create_entry(key)?
            .set_password(value)
            .map_err(|e| StoreError::Keychain(format!("Failed to store {key}: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        match self.create_entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Keychain(format!("Failed to delete {key}: {e}"))),
        }
    }
}
