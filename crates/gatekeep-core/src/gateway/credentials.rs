use std::sync::Arc;

use tracing::warn;

use crate::storage::{KeyValueStore, StorageError, TOKEN_KEY};

/// Source of the bearer credential, queried once per outgoing request.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Result<Option<String>, StorageError>;

    /// Drop the credential after the server rejected it. Must not fail.
    fn revoke(&self);
}

/// Reads the credential straight from the persisted `Token` slot.
pub struct StoredCredential {
    store: Arc<dyn KeyValueStore>,
}

impl StoredCredential {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl CredentialProvider for StoredCredential {
    fn credential(&self) -> Result<Option<String>, StorageError> {
        self.store.get(TOKEN_KEY)
    }

    fn revoke(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove persisted credential");
        }
    }
}
