//! Application state shared across all route handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use agri_control::ControlService;

/// Shared application state.
///
/// All fields are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Running control engine.
    pub service: Arc<ControlService>,
    /// Scenario file reloaded by `POST /control/registry/reload`.
    pub registry_path: Option<PathBuf>,
    /// Port the server listens on, used for the CORS origin list.
    pub port: u16,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<ControlService>, port: u16) -> Self {
        Self {
            service,
            registry_path: None,
            port,
            start_time: Instant::now(),
        }
    }

    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }
}
