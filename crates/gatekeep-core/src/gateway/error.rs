use thiserror::Error;

use super::Payload;

/// Fallback shown when the server gives no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

pub const NOT_AUTHORIZED_MESSAGE: &str =
    "You are not authorized to access this route, try logging in";

pub const CONNECTIVITY_ERROR_MESSAGE: &str =
    "Unable to connect to server. Please check your internet connectivity";

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unauthorized ({status}) - session cleared")]
    Unauthorized { status: u16, message: Option<String> },

    #[error("Server error ({status}): {}", message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE))]
    Server { status: u16, message: Option<String> },

    #[error("Unable to reach server: {0}")]
    NetworkUnreachable(#[source] reqwest::Error),

    #[error("Invalid request path: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a non-success response.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            code @ (401 | 403) => GatewayError::Unauthorized { status: code, message },
            code => GatewayError::Server { status: code, message },
        }
    }

    /// Pull a non-empty string `message` field out of a JSON error body.
    fn extract_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Unauthorized { status, .. } | GatewayError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Message the server attached to its error response, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Unauthorized { message, .. } | GatewayError::Server { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }

    /// Whether a server response was received at all.
    pub fn has_response(&self) -> bool {
        self.status().is_some()
    }

    /// Whether the request failed before it left this process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidUrl(_) | GatewayError::InvalidBody(_) | GatewayError::Client(_)
        )
    }

    /// Text for the toast the gateway shows when this error passes through it.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Unauthorized { .. } => NOT_AUTHORIZED_MESSAGE.to_string(),
            GatewayError::Server { message, .. } => message
                .clone()
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            GatewayError::NetworkUnreachable(_) => CONNECTIVITY_ERROR_MESSAGE.to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Per-call classification of a gateway result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Payload),
    Unauthorized,
    ServerError(String),
    NetworkUnreachable,
}

impl From<&Result<Payload, GatewayError>> for Outcome {
    fn from(result: &Result<Payload, GatewayError>) -> Self {
        match result {
            Ok(payload) => Outcome::Success(payload.clone()),
            Err(GatewayError::Unauthorized { .. }) => Outcome::Unauthorized,
            Err(e @ GatewayError::Server { .. }) => Outcome::ServerError(e.user_message()),
            // Anything that never produced a response counts as unreachable
            Err(_) => Outcome::NetworkUnreachable,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
