//! Credential store selection

use std::sync::Arc;

use tidylinker_common::{
    CredentialStore, FileCredentialStore, KeychainCredentialStore, MemoryCredentialStore,
};
use tidylinker_domain::{StorageBackend, StorageConfig};
use tracing::info;

/// Build the credential store named by `config`.
pub fn credential_store_from_config(config: &StorageConfig) -> Arc<dyn CredentialStore> {
    info!(backend = ?config.backend, "credential store selected");
    match config.backend {
        StorageBackend::File => Arc::new(FileCredentialStore::new(config.path.clone())),
        StorageBackend::Keychain => {
            Arc::new(KeychainCredentialStore::new(config.keychain_service.clone()))
        }
        StorageBackend::Memory => Arc::new(MemoryCredentialStore::new()),
    }
}
