use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::gateway::CredentialProvider;
use crate::storage::{KeyValueStore, StorageError, TOKEN_KEY};

/// In-memory session record.
///
/// The authentication flag is derived from the credential rather than
/// stored, so the two can never disagree. The only transitions are the
/// three `pub(crate)` methods below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    credential: Option<String>,
    profile: Option<Value>,
}

impl SessionState {
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn profile(&self) -> Option<&Value> {
        self.profile.as_ref()
    }

    pub(crate) fn set_credential(&mut self, credential: String) {
        self.credential = Some(credential);
    }

    /// Logout transition: credential, flag and profile go together.
    pub(crate) fn clear(&mut self) {
        self.credential = None;
        self.profile = None;
    }

    /// Replace the profile wholesale. Ignored once the session is gone so a
    /// late response cannot resurrect profile data after logout.
    pub(crate) fn set_profile(&mut self, profile: Value) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.profile = Some(profile);
        true
    }
}

/// Shared session handle: the single owner of `SessionState` plus the
/// persisted store it mirrors into. Clone is cheap.
#[derive(Clone)]
pub struct SharedSession {
    state: Arc<RwLock<SessionState>>,
    store: Arc<dyn KeyValueStore>,
    // Set by the first explicit transition or lazy adoption. Once set, the
    // persisted slot is never consulted implicitly again.
    settled: Arc<AtomicBool>,
}

impl SharedSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            store,
            settled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Apply one state transition under the write lock.
    pub(crate) fn update<R>(&self, transition: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.write();
        self.settled.store(true, Ordering::SeqCst);
        transition(&mut *state)
    }

    /// Adopt the persisted credential into memory if nothing has settled the
    /// session yet. A read failure leaves the session unsettled.
    fn adopt_persisted(&self) -> Result<Option<String>, StorageError> {
        let mut state = self.state.write();
        if state.credential.is_some() || self.settled.load(Ordering::SeqCst) {
            return Ok(state.credential.clone());
        }

        let persisted = self.store.get(TOKEN_KEY)?;
        self.settled.store(true, Ordering::SeqCst);
        match persisted {
            Some(token) if !token.is_empty() => {
                state.set_credential(token.clone());
                debug!("Adopted persisted credential into session");
                Ok(Some(token))
            }
            _ => Ok(None),
        }
    }
}

impl CredentialProvider for SharedSession {
    /// The in-memory credential. A host that has not restored the session
    /// yet gets the persisted one adopted into memory on first use, so a
    /// request never carries a credential the session does not hold.
    fn credential(&self) -> Result<Option<String>, StorageError> {
        if let Some(credential) = self.state.read().credential.clone() {
            return Ok(Some(credential));
        }
        if self.settled.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.adopt_persisted()
    }

    fn revoke(&self) {
        self.update(SessionState::clear);
        debug!("Session state cleared after credential was rejected");
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove persisted credential");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
