//! Error types for the control engine.

/// Errors from task intake.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Task queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
    #[error("Task intake is closed")]
    Closed,
}

/// Errors from interpreting a task's `schedule_at`.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid schedule_at '{value}': {reason}")]
    Invalid { value: String, reason: String },
}

/// Errors from planning a task into actions.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),
}

/// Errors from the site policy check.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Policy rejected parameter {param}: {reason}")]
    Rejected { param: String, reason: String },
}

/// Errors from executing a device command.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("Device {device_id} failed to execute {command}: {reason}")]
    DeviceFailed {
        device_id: String,
        command: String,
        reason: String,
    },
}

/// Errors from loading the action template registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to read registry file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse registry file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Unsupported registry file type: {0}")]
    UnsupportedFormat(String),
    #[error("Registry file {0} defines no actions")]
    Empty(String),
    #[error("Registry has no source file to reload from")]
    NoSource,
}
