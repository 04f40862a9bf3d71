//! Core library for gatekeep.
//!
//! Client-side session and request-authorization layer for a web backend:
//!
//! - `gateway`: authenticated HTTP gateway that injects the bearer
//!   credential, unwraps payloads and handles failures globally
//! - `session`: session state and the login/logout/profile operations
//! - `storage`: persisted key-value backends for the credential
//! - `events`: notifier and navigator interfaces for the host UI
//! - `config`: address resolution and backend selection

pub mod config;
pub mod events;
pub mod gateway;
pub mod session;
pub mod storage;

pub use config::Config;
pub use events::{AppEvent, EventChannel, Navigator, Notifier, Route, Toast, ToastKind, UiEvent};
pub use gateway::{Gateway, GatewayError, MultipartBody, Outcome, Payload};
pub use session::{SessionError, SessionState, SessionStore};
pub use storage::{KeyValueStore, StorageError};
