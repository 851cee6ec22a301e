//! In-memory dispatcher that records every command it accepts.
//!
//! Used by tests and by dry-run tooling. Individual command verbs can be
//! configured to fail, which is how device faults are simulated.

use std::collections::HashSet;
use std::sync::Mutex;

use agri_core::types::DeviceCommand;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::dispatcher::DeviceDispatcher;
use crate::error::DispatchError;

#[derive(Default)]
pub struct RecordingDispatcher {
    executed: Mutex<Vec<(DeviceCommand, Instant)>>,
    failed: Mutex<Vec<DeviceCommand>>,
    failing_verbs: Mutex<HashSet<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future command with this verb fail.
    pub fn fail_command(&self, verb: impl Into<String>) {
        if let Ok(mut verbs) = self.failing_verbs.lock() {
            verbs.insert(verb.into());
        }
    }

    /// Commands that executed successfully, in execution order.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.executed
            .lock()
            .map(|e| e.iter().map(|(c, _)| c.clone()).collect())
            .unwrap_or_default()
    }

    /// Successful commands with the (tokio) instant they ran at.
    pub fn timeline(&self) -> Vec<(DeviceCommand, Instant)> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Commands that were attempted and reported as failed.
    pub fn failures(&self) -> Vec<DeviceCommand> {
        self.failed.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.executed.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful commands belonging to one trace.
    pub fn commands_for_trace(&self, trace_id: &str) -> Vec<DeviceCommand> {
        self.commands()
            .into_iter()
            .filter(|c| c.trace_id == trace_id)
            .collect()
    }
}

#[async_trait]
impl DeviceDispatcher for RecordingDispatcher {
    async fn execute(&self, command: &DeviceCommand) -> Result<(), DispatchError> {
        let should_fail = self
            .failing_verbs
            .lock()
            .map(|v| v.contains(&command.command))
            .unwrap_or(false);

        if should_fail {
            if let Ok(mut failed) = self.failed.lock() {
                failed.push(command.clone());
            }
            return Err(DispatchError::DeviceFailed {
                device_id: command.device_id.clone(),
                command: command.command.clone(),
                reason: "simulated device fault".to_string(),
            });
        }

        if let Ok(mut executed) = self.executed.lock() {
            executed.push((command.clone(), Instant::now()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agri_core::types::Params;

    fn cmd(verb: &str, trace: &str) -> DeviceCommand {
        DeviceCommand {
            device_id: "valve-7".to_string(),
            command: verb.to_string(),
            params: Params::new(),
            task_id: "t-1".to_string(),
            trace_id: trace.to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let d = RecordingDispatcher::new();
        d.execute(&cmd("open_valve", "a")).await.unwrap();
        d.execute(&cmd("close_valve", "a")).await.unwrap();

        let verbs: Vec<String> = d.commands().into_iter().map(|c| c.command).collect();
        assert_eq!(verbs, ["open_valve", "close_valve"]);
        assert_eq!(d.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_verb() {
        let d = RecordingDispatcher::new();
        d.fail_command("close_valve");

        assert!(d.execute(&cmd("open_valve", "a")).await.is_ok());
        let err = d.execute(&cmd("close_valve", "a")).await.unwrap_err();
        assert!(matches!(err, DispatchError::DeviceFailed { .. }));
        assert_eq!(d.len(), 1);
        assert_eq!(d.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_commands_for_trace() {
        let d = RecordingDispatcher::new();
        d.execute(&cmd("open_valve", "a")).await.unwrap();
        d.execute(&cmd("open_valve", "b")).await.unwrap();
        assert_eq!(d.commands_for_trace("b").len(), 1);
        assert!(d.commands_for_trace("c").is_empty());
    }
}
