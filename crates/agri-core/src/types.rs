//! Core domain types shared by every crate in the workspace.
//!
//! Tasks come in from the boundary, actions come out of the planner, and
//! device commands are what the dispatcher finally sees.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgriError;

/// Action verb that suspends a chain instead of reaching a device.
pub const WAIT_ACTION: &str = "wait";

// =============================================================================
// Parameters
// =============================================================================

/// A typed scalar carried in a task's parameter bag.
///
/// Decoded untagged, so JSON `true`, `90`, `1.5` and `"zone-a"` map to the
/// matching variant without any wrapper on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value. Booleans and text are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Bool(_) | ParamValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Open parameter bag. Ordered so log lines and replays are stable.
pub type Params = BTreeMap<String, ParamValue>;

// =============================================================================
// Task
// =============================================================================

/// One unit of work requested by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub task_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    /// RFC 3339 start time. Absent or empty means run now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_at: Option<String>,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub source: String,
}

impl Task {
    pub fn new(task_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_schedule_at(mut self, schedule_at: impl Into<String>) -> Self {
        self.schedule_at = Some(schedule_at.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Fill in missing correlation ids: a fresh UUID for `task_id`, and
    /// `trace_id` falling back to `task_id`.
    pub fn ensure_identifiers(&mut self) {
        if self.task_id.is_empty() {
            self.task_id = Uuid::new_v4().to_string();
        }
        if self.trace_id.is_empty() {
            self.trace_id = self.task_id.clone();
        }
    }

    /// Boundary-level validation of a freshly decoded task.
    pub fn validate(&self) -> Result<(), AgriError> {
        if self.task_type.trim().is_empty() {
            return Err(AgriError::InvalidTask("task_type is required".to_string()));
        }
        if self.target.trim().is_empty() {
            return Err(AgriError::InvalidTask("target is required".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Action / DeviceCommand
// =============================================================================

/// One step of a task-type template, after parameter injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: Params,
}

impl Action {
    pub fn new(action_type: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            device_type: device_type.into(),
            params: Params::new(),
        }
    }

    pub fn is_wait(&self) -> bool {
        self.action_type == WAIT_ACTION
    }
}

/// A fully resolved instruction for the device dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub params: Params,
    pub task_id: String,
    pub trace_id: String,
}

impl DeviceCommand {
    /// Build the command for one non-wait action of `task`.
    pub fn for_action(task: &Task, action: &Action) -> Self {
        Self {
            device_id: task.target.clone(),
            command: action.action_type.clone(),
            params: action.params.clone(),
            task_id: task.task_id.clone(),
            trace_id: task.trace_id.clone(),
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.command, self.device_id)
    }
}
