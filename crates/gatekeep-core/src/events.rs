//! User-facing side effects: notifications and navigation.
//!
//! The gateway and session store never talk to a UI directly. They emit
//! `UiEvent`s through a `Notifier` and request views through a `Navigator`,
//! both injected at construction. `EventChannel` implements both on top of
//! a single tokio channel for hosts that drain events from one queue.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Danger,
}

/// A transient message for the user (`add_toast` payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Toast {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
}

impl Toast {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: ToastKind::Success,
        }
    }

    pub fn danger(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: ToastKind::Danger,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum UiEvent {
    /// Dismiss any in-progress loading indicator.
    HideLoading,
    AddToast(Toast),
}

/// Named application views the session layer may send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Dashboard => "Dashboard",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn emit(&self, event: UiEvent);

    fn toast(&self, toast: Toast) {
        self.emit(UiEvent::AddToast(toast));
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

// ============================================================================
// Channel-backed sink
// ============================================================================

/// Everything the session layer asks of its host, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Ui(UiEvent),
    Navigate(Route),
}

/// Notifier and navigator that forward into an unbounded channel.
/// Clone is cheap - all clones feed the same receiver.
#[derive(Clone)]
pub struct EventChannel {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: AppEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(event = ?e.0, "Event receiver dropped, discarding event");
        }
    }
}

impl Notifier for EventChannel {
    fn emit(&self, event: UiEvent) {
        self.send(AppEvent::Ui(event));
    }
}

impl Navigator for EventChannel {
    fn navigate(&self, route: Route) {
        self.send(AppEvent::Navigate(route));
    }
}

// ============================================================================
// Tests
// ============================================================================
