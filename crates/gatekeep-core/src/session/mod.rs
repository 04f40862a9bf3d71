//! Session state management.
//!
//! This module provides:
//! - `SessionState`: credential, derived authentication flag, cached profile
//! - `SharedSession`: the shared handle the gateway reads credentials from
//! - `SessionStore`: login, logout, restore and profile operations
//!
//! The credential is persisted under the `Token` key so a restarted host can
//! restore the previous session without a network call.

pub mod error;
pub mod state;
pub mod store;

pub use error::SessionError;
pub use state::{SessionState, SharedSession};
pub use store::SessionStore;
