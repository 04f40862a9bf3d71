use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::payload::read_response;
use super::{GatewayError, Payload};
use crate::config::directory_url;

/// Unauthenticated client for calls made before a credential exists.
///
/// Never attaches a credential and never runs the gateway's global failure
/// handler; the caller decides what a failure means.
#[derive(Clone)]
pub struct PublicClient {
    http: Client,
    base_url: Url,
}

impl PublicClient {
    /// Share an existing connection pool (cheap clone).
    pub fn new(http: Client, base_url: &Url) -> Result<Self, GatewayError> {
        Ok(Self {
            http,
            base_url: directory_url(base_url.as_str())?,
        })
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Payload, GatewayError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        debug!(%url, "Sending unauthenticated request");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(GatewayError::NetworkUnreachable)?;
        read_response(response).await
    }
}
