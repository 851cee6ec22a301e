//! Default dispatcher: emits the command as a structured log event.
//!
//! Stands in for a real device driver until one is wired up.

use agri_core::types::DeviceCommand;
use async_trait::async_trait;

use crate::dispatcher::DeviceDispatcher;
use crate::error::DispatchError;

/// Dispatcher that logs every command and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl DeviceDispatcher for TracingDispatcher {
    async fn execute(&self, command: &DeviceCommand) -> Result<(), DispatchError> {
        let params = serde_json::to_string(&command.params).unwrap_or_default();
        tracing::info!(
            trace_id = %command.trace_id,
            task_id = %command.task_id,
            device_id = %command.device_id,
            command = %command.command,
            params = %params,
            "Device command executed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::types::Params;

    #[tokio::test]
    async fn test_tracing_dispatcher_always_succeeds() {
        let cmd = DeviceCommand {
            device_id: "valve-7".to_string(),
            command: "open_valve".to_string(),
            params: Params::new(),
            task_id: "t-1".to_string(),
            trace_id: "trace-1".to_string(),
        };
        assert!(TracingDispatcher.execute(&cmd).await.is_ok());
    }
}
