//! The authenticated gateway client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::payload::read_response;
use super::{CredentialProvider, GatewayError, MultipartBody, Payload};
use crate::config::{directory_url, Config};
use crate::events::{Navigator, Notifier, Route, Toast, UiEvent};

/// Body attached to an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// Sent as `multipart/form-data` instead of JSON.
    Multipart(MultipartBody),
}

impl RequestBody {
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, GatewayError> {
        serde_json::to_value(body)
            .map(RequestBody::Json)
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))
    }
}

/// Authenticated HTTP gateway.
/// Clone is cheap - all clones share the connection pool and collaborators.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl Gateway {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;
        let base_url = directory_url(base_url.as_str())?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url,
                credentials,
                notifier,
                navigator,
            }),
        })
    }

    /// Create a gateway for the configured API base address.
    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, GatewayError> {
        Self::new(
            config.api_base()?,
            config.request_timeout(),
            credentials,
            notifier,
            navigator,
        )
    }

    /// The underlying HTTP client, for siblings that should share its pool.
    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    // ===== Verbs =====

    pub async fn get(&self, path: &str) -> Result<Payload, GatewayError> {
        self.send(Method::GET, path, RequestBody::Empty).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Payload, GatewayError> {
        match RequestBody::json(body) {
            Ok(body) => self.send(Method::POST, path, body).await,
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Payload, GatewayError> {
        match RequestBody::json(body) {
            Ok(body) => self.send(Method::PUT, path, body).await,
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn put_multipart(
        &self,
        path: &str,
        body: MultipartBody,
    ) -> Result<Payload, GatewayError> {
        self.send(Method::PUT, path, RequestBody::Multipart(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Payload, GatewayError> {
        self.send(Method::DELETE, path, RequestBody::Empty).await
    }

    /// Perform a call relative to the base address. Failures go through
    /// the global failure handler before they are returned.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Payload, GatewayError> {
        match self.dispatch(method, path, body).await {
            Ok(payload) => Ok(payload),
            Err(e) => Err(self.fail(e)),
        }
    }

    // ===== Internals =====

    /// Build a URL for a path relative to the base address.
    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        let path = path.trim_start_matches('/');
        Ok(self.inner.base_url.join(path)?)
    }

    /// Current credential, or none if it cannot be read. A read failure
    /// never blocks the request.
    fn current_credential(&self) -> Option<String> {
        match self.inner.credentials.credential() {
            Ok(credential) => credential,
            Err(e) => {
                // TODO: decide whether a failed credential read should abort the call
                warn!(error = %e, "Failed to read credential, sending request without it");
                None
            }
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<Payload, GatewayError> {
        let url = self.url(path)?;
        debug!(%method, %url, "Sending request");

        let mut request = self.inner.http.request(method, url);
        if let Some(token) = self.current_credential() {
            request = request.bearer_auth(token);
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(multipart) => request.multipart(multipart.into_form()?),
        };

        let response = request
            .send()
            .await
            .map_err(GatewayError::NetworkUnreachable)?;
        read_response(response).await
    }

    /// Global failure handler. Runs for every failed call regardless of
    /// caller, then hands the error back.
    fn fail(&self, error: GatewayError) -> GatewayError {
        let inner = &self.inner;
        inner.notifier.emit(UiEvent::HideLoading);

        match &error {
            GatewayError::Unauthorized { status, .. } => {
                warn!(status = *status, "Request rejected as unauthorized, clearing session");
                inner.credentials.revoke();
                inner.notifier.toast(Toast::danger(error.user_message()));
                inner.navigator.navigate(Route::Login);
            }
            GatewayError::Server { status, .. } => {
                debug!(status = *status, error = %error, "Server returned an error");
                inner.notifier.toast(Toast::danger(error.user_message()));
            }
            _ if error.is_local() => {
                warn!(error = %error, "Request could not be built");
                inner.notifier.toast(Toast::danger(error.user_message()));
            }
            _ => {
                warn!(error = %error, "Request failed without a server response");
                inner.notifier.toast(Toast::danger(error.user_message()));
            }
        }

        error
    }
}
