// Application state module
// Shared between connection tasks; built once by the entry point

use std::sync::atomic::AtomicUsize;

use super::types::Config;
use crate::api::Dispatcher;

/// Application state
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            active_connections: AtomicUsize::new(0),
        }
    }
}
