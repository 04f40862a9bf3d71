//! Session operations: the only legitimate way to change session state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{SessionError, SessionState, SharedSession};
use crate::config::Config;
use crate::events::{Navigator, Notifier, Route, Toast};
use crate::gateway::{Gateway, GatewayError, MultipartBody, Payload, PublicClient};
use crate::storage::{KeyValueStore, TOKEN_KEY, USER_ID_KEY};

// ============================================================================
// Constants
// ============================================================================

/// Registration endpoint, relative to the root API address
const REGISTER_ENDPOINT: &str = "accounts/api/register";

/// Login endpoint, relative to the application origin
const LOGIN_ENDPOINT: &str = "api/users/login";

const PROFILE_ENDPOINT: &str = "users/profile";
const CHANGE_PASSWORD_ENDPOINT: &str = "users/change-password";
const SETTINGS_ENDPOINT: &str = "users/settings";

const LOGIN_SUCCESS_MESSAGE: &str = "Successfully logged in";
const LOGOUT_SUCCESS_MESSAGE: &str = "Logged out successfully";
const PASSWORD_CHANGED_MESSAGE: &str = "Password changed successfully";
const PROFILE_UPDATED_MESSAGE: &str = "Profile data updated successfully";
const SETTINGS_UPDATED_MESSAGE: &str = "General profile settings updated successfully";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
    #[serde(rename = "_id")]
    id: Option<Value>,
}

impl LoginResponse {
    /// User identifiers come back as strings or numbers depending on backend.
    fn user_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Credential and user id extracted from a successful login.
struct Login {
    token: String,
    user_id: Option<String>,
}

/// Owner of the session. Clone is cheap - clones share state and clients.
#[derive(Clone)]
pub struct SessionStore {
    session: SharedSession,
    gateway: Gateway,
    login_client: PublicClient,
    register_client: PublicClient,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl SessionStore {
    /// Wire a store, its gateway and its unauthenticated clients together.
    pub fn new(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, SessionError> {
        let session = SharedSession::new(store);
        let gateway = Gateway::from_config(
            config,
            Arc::new(session.clone()),
            Arc::clone(&notifier),
            Arc::clone(&navigator),
        )?;

        let origin = config.origin_url().map_err(GatewayError::from)?;
        let root_api = config.root_api_url().map_err(GatewayError::from)?;
        // Both share the gateway's connection pool
        let login_client = PublicClient::new(gateway.http().clone(), &origin)?;
        let register_client = PublicClient::new(gateway.http().clone(), &root_api)?;

        Ok(Self {
            session,
            gateway,
            login_client,
            register_client,
            notifier,
            navigator,
        })
    }

    // ===== Accessors =====

    /// The gateway bound to this session, for other authenticated calls.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn credential(&self) -> Option<String> {
        self.session.snapshot().credential().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.snapshot().is_authenticated()
    }

    pub fn profile(&self) -> Option<Value> {
        self.session.snapshot().profile().cloned()
    }

    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    // ===== Unauthenticated operations =====

    /// Create an account. No session state changes either way.
    pub async fn register<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Payload, SessionError> {
        match self.register_client.post(REGISTER_ENDPOINT, payload).await {
            Ok(payload) => {
                info!("Registration submitted");
                Ok(payload)
            }
            Err(e) => {
                debug!(error = %e, "Registration failed");
                Err(e.into())
            }
        }
    }

    /// Log in and start a session.
    pub async fn authenticate<B: Serialize + ?Sized>(&self, credentials: &B) -> Result<(), SessionError> {
        let result = match self.login_client.post(LOGIN_ENDPOINT, credentials).await {
            Ok(payload) => Self::parse_login(&payload),
            Err(e) => Err(e.into()),
        };

        let login = match result {
            Ok(login) => login,
            Err(e) => {
                error!(error = %e, "Login failed");
                self.notifier.toast(Toast::danger(e.login_failure_message()));
                return Err(e);
            }
        };

        self.notifier.toast(Toast::success(LOGIN_SUCCESS_MESSAGE));
        self.session.update(|s| s.set_credential(login.token.clone()));
        self.persist(TOKEN_KEY, &login.token);
        match login.user_id {
            Some(ref user_id) => self.persist(USER_ID_KEY, user_id),
            None => debug!("Login response carried no user id"),
        }

        info!("Login successful");
        self.navigator.navigate(Route::Dashboard);
        Ok(())
    }

    fn parse_login(payload: &Payload) -> Result<Login, SessionError> {
        let response: LoginResponse = match payload.parse() {
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                debug!(error = %e, "Unexpected login response shape");
                return Err(SessionError::MissingToken);
            }
            None => return Err(SessionError::UnexpectedBinary),
        };
        let user_id = response.user_id();
        match response.token {
            Some(token) if !token.is_empty() => Ok(Login { token, user_id }),
            _ => Err(SessionError::MissingToken),
        }
    }

    // ===== Local operations =====

    /// End the session. The in-memory teardown is unconditional; clearing the
    /// persisted keys is best-effort.
    pub fn sign_out(&self) {
        self.session.update(SessionState::clear);
        self.notifier.toast(Toast::success(LOGOUT_SUCCESS_MESSAGE));

        for key in [TOKEN_KEY, USER_ID_KEY] {
            if let Err(e) = self.session.store().remove(key) {
                warn!(key, error = %e, "Failed to clear persisted session key");
            }
        }

        info!("Signed out");
        self.navigator.navigate(Route::Login);
    }

    /// Reflect a persisted credential into memory. Returns whether a session
    /// was restored. Makes no network call.
    pub fn restore(&self) -> bool {
        match self.session.store().get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                self.session.update(|s| s.set_credential(token));
                debug!("Restored persisted session");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                false
            }
        }
    }

    // ===== Authenticated operations =====

    pub async fn fetch_profile(&self) -> Result<Value, SessionError> {
        let result = self.gateway.get(PROFILE_ENDPOINT).await;
        self.commit_profile("fetch_profile", result, None)
    }

    pub async fn change_password<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Value, SessionError> {
        let result = self.gateway.put(CHANGE_PASSWORD_ENDPOINT, payload).await;
        self.commit_profile("change_password", result, Some(PASSWORD_CHANGED_MESSAGE))
    }

    pub async fn update_profile_settings<B: Serialize + ?Sized>(
        &self,
        payload: &B,
    ) -> Result<Value, SessionError> {
        let result = self.gateway.put(PROFILE_ENDPOINT, payload).await;
        self.commit_profile("update_profile_settings", result, Some(PROFILE_UPDATED_MESSAGE))
    }

    /// Update settings that include binary content (e.g. a profile picture).
    pub async fn update_general_settings(&self, settings: MultipartBody) -> Result<Value, SessionError> {
        let result = self.gateway.put_multipart(SETTINGS_ENDPOINT, settings).await;
        self.commit_profile("update_general_settings", result, Some(SETTINGS_UPDATED_MESSAGE))
    }

    // ===== Helpers =====

    fn commit_profile(
        &self,
        operation: &str,
        result: Result<Payload, GatewayError>,
        success_message: Option<&str>,
    ) -> Result<Value, SessionError> {
        let profile = match result {
            Ok(payload) => payload.into_json().ok_or(SessionError::UnexpectedBinary),
            Err(e) => Err(e.into()),
        };

        match profile {
            Ok(profile) => {
                if !self.session.update(|s| s.set_profile(profile.clone())) {
                    debug!(operation, "Session ended before profile arrived, not committing");
                }
                if let Some(message) = success_message {
                    self.notifier.toast(Toast::success(message));
                }
                Ok(profile)
            }
            Err(e) => {
                error!(operation, error = %e, "Session operation failed");
                Err(e)
            }
        }
    }

    /// Best-effort write to persisted storage.
    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.session.store().set(key, value) {
            warn!(key, error = %e, "Failed to persist session key");
        }
    }
}
