use thiserror::Error;

use crate::gateway::error::{CONNECTIVITY_ERROR_MESSAGE, GENERIC_ERROR_MESSAGE};
use crate::gateway::GatewayError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Login response did not contain a token")]
    MissingToken,

    #[error("Expected a JSON payload but received binary content")]
    UnexpectedBinary,
}

impl SessionError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Gateway(e) if e.is_unauthorized())
    }

    /// Toast text for a failed login: the server's message when it sent one.
    pub fn login_failure_message(&self) -> String {
        match self {
            SessionError::Gateway(e) if e.has_response() => e
                .server_message()
                .unwrap_or(GENERIC_ERROR_MESSAGE)
                .to_string(),
            SessionError::Gateway(GatewayError::NetworkUnreachable(_)) => {
                CONNECTIVITY_ERROR_MESSAGE.to_string()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}
