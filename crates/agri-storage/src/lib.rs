//! Execution log storage for the control service.
//!
//! Every successfully executed device command is appended as one JSON line,
//! which the replay tool later reads back and filters by task or trace id.

pub mod error;
pub mod execution_log;

pub use error::StorageError;
pub use execution_log::{
    read_all, ExecutionLog, ExecutionLogEntry, JsonlExecutionLog, MemoryExecutionLog, STATUS_OK,
};
