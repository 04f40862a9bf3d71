//! Authenticated HTTP gateway.
//!
//! This module provides the `Gateway`, the single chokepoint every
//! authenticated backend call passes through. It attaches the current bearer
//! credential, normalizes successful bodies into a `Payload`, and runs a
//! caller-independent failure handler before handing errors back:
//!
//! - 401/403: revoke the credential, notify, redirect to `Login`
//! - other statuses: notify with the server message or a generic fallback
//! - no response: notify with a connectivity message
//!
//! `PublicClient` is the unauthenticated sibling used before a credential
//! exists (registration and login). It classifies errors the same way but
//! runs none of the global side effects.

pub mod client;
pub mod credentials;
pub mod error;
pub mod multipart;
pub mod payload;
pub mod public;

pub use client::{Gateway, RequestBody};
pub use credentials::{CredentialProvider, StoredCredential};
pub use error::{GatewayError, Outcome};
pub use multipart::MultipartBody;
pub use payload::Payload;
pub use public::PublicClient;
