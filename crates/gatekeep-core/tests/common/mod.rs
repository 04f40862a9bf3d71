#![allow(dead_code)]

use std::sync::Arc;

use gatekeep_core::events::{AppEvent, EventChannel, Route, Toast, UiEvent};
use gatekeep_core::storage::MemoryStore;
use gatekeep_core::{Config, SessionStore};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::MockServer;

/// Config pointing every address at the mock server.
pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_url: Some(format!("{}/api", server.uri())),
        origin: server.uri(),
        root_api: Some(server.uri()),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub session: SessionStore,
    pub events: UnboundedReceiver<AppEvent>,
}

impl Harness {
    pub fn new(server: &MockServer, store: MemoryStore) -> Self {
        Self::with_config(&config_for(server), store)
    }

    pub fn with_config(config: &Config, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let (channel, events) = EventChannel::new();
        let channel = Arc::new(channel);
        let session = SessionStore::new(config, store.clone(), channel.clone(), channel)
            .expect("session store should build");
        Self {
            store,
            session,
            events,
        }
    }

    pub fn drain(&mut self) -> Vec<AppEvent> {
        drain(&mut self.events)
    }
}

pub fn drain(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn toast(toast: Toast) -> AppEvent {
    AppEvent::Ui(UiEvent::AddToast(toast))
}

pub fn hide_loading() -> AppEvent {
    AppEvent::Ui(UiEvent::HideLoading)
}

pub fn navigate(route: Route) -> AppEvent {
    AppEvent::Navigate(route)
}

/// Base URL of a port nothing listens on.
pub fn dead_server_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
