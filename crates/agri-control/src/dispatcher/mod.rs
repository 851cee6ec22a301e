//! Device dispatcher trait and the dispatchers shipped with the engine.
//!
//! A dispatcher receives one fully resolved command at a time and reports
//! success or failure. The chain runner awaits it before moving on, so a
//! dispatcher that never returns stalls its chain.

pub mod recording;
pub mod tracing_log;

use agri_core::types::DeviceCommand;
use async_trait::async_trait;

use crate::error::DispatchError;

pub use recording::RecordingDispatcher;
pub use tracing_log::TracingDispatcher;

/// Executes device commands against field hardware (or a stand-in).
#[async_trait]
pub trait DeviceDispatcher: Send + Sync {
    async fn execute(&self, command: &DeviceCommand) -> Result<(), DispatchError>;
}
