//! Site policy applied to task parameters before planning.
//!
//! A policy may clamp a parameter into range in place or reject the task
//! outright. Rejected tasks are never planned.

use agri_core::config::{OnViolation, ParamLimit, PolicyConfig};
use agri_core::types::{ParamValue, Task};

use crate::error::PolicyError;

/// Inspects and possibly adjusts a task's parameters.
pub trait PolicyChecker: Send + Sync {
    fn validate(&self, task: &mut Task) -> Result<(), PolicyError>;
}

/// Policy driven by the `[[policy.limits]]` configuration table.
#[derive(Debug, Clone)]
pub struct SitePolicy {
    limits: Vec<ParamLimit>,
}

impl SitePolicy {
    pub fn new(limits: Vec<ParamLimit>) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.limits.clone())
    }

    /// Policy with no limits at all.
    pub fn permissive() -> Self {
        Self::new(Vec::new())
    }

    pub fn limits(&self) -> &[ParamLimit] {
        &self.limits
    }
}

impl Default for SitePolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

impl PolicyChecker for SitePolicy {
    fn validate(&self, task: &mut Task) -> Result<(), PolicyError> {
        for limit in self.limits.iter().filter(|l| l.applies_to(&task.task_type)) {
            let Some(value) = task.params.get_mut(&limit.param) else {
                continue;
            };

            let number = match value.as_f64() {
                Some(n) if n.is_finite() => n,
                _ => {
                    return Err(PolicyError::Rejected {
                        param: limit.param.clone(),
                        reason: format!("value {} is not a finite number", value),
                    })
                }
            };

            let violation = match (limit.min, limit.max) {
                (Some(min), _) if number < min => Some((min, "below minimum")),
                (_, Some(max)) if number > max => Some((max, "above maximum")),
                _ => None,
            };
            let Some((bound, what)) = violation else {
                continue;
            };

            match limit.on_violation {
                OnViolation::Reject => {
                    return Err(PolicyError::Rejected {
                        param: limit.param.clone(),
                        reason: format!("value {} {} {}", number, what, bound),
                    });
                }
                OnViolation::Clamp => {
                    let clamped = clamp_to(value, bound, number > bound);
                    tracing::info!(
                        task_id = %task.task_id,
                        trace_id = %task.trace_id,
                        param = %limit.param,
                        from = number,
                        to = %clamped,
                        "Policy clamped parameter"
                    );
                    *value = clamped;
                }
            }
        }
        Ok(())
    }
}

/// Replace a value with `bound`, keeping integers integral without crossing
/// the bound.
fn clamp_to(value: &ParamValue, bound: f64, was_above: bool) -> ParamValue {
    match value {
        ParamValue::Int(_) => {
            let integral = if was_above { bound.floor() } else { bound.ceil() };
            ParamValue::Int(integral as i64)
        }
        _ => ParamValue::Float(bound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(task_type: &str, param: &str, min: Option<f64>, max: Option<f64>, on: OnViolation) -> ParamLimit {
        ParamLimit {
            task_type: task_type.to_string(),
            param: param.to_string(),
            min,
            max,
            on_violation: on,
        }
    }

    #[test]
    fn test_default_clamps_irrigation_duration() {
        let policy = SitePolicy::default();
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", 90);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Int(60));
    }

    #[test]
    fn test_default_clamps_float_duration() {
        let policy = SitePolicy::default();
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", 75.5);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Float(60.0));
    }

    #[test]
    fn test_value_in_range_untouched() {
        let policy = SitePolicy::default();
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", 45);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Int(45));
    }

    #[test]
    fn test_other_task_types_not_limited() {
        let policy = SitePolicy::default();
        let mut task = Task::new("ventilation", "vent-1").with_param("duration_min", 240);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Int(240));
    }

    #[test]
    fn test_missing_param_passes() {
        let policy = SitePolicy::default();
        let mut task = Task::new("irrigation", "valve-7");
        assert!(policy.validate(&mut task).is_ok());
        assert!(task.params.is_empty());
    }

    #[test]
    fn test_non_numeric_limited_param_rejected() {
        let policy = SitePolicy::default();
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", "ninety");
        let err = policy.validate(&mut task).unwrap_err();
        assert!(err.to_string().contains("duration_min"));
    }

    #[test]
    fn test_reject_rule() {
        let policy = SitePolicy::new(vec![limit(
            "*",
            "flow_rate",
            Some(0.0),
            Some(12.5),
            OnViolation::Reject,
        )]);
        let mut task = Task::new("fertigation", "pump-2").with_param("flow_rate", 20);
        let err = policy.validate(&mut task).unwrap_err();
        assert!(err.to_string().contains("above maximum 12.5"));
        assert_eq!(task.params["flow_rate"], ParamValue::Int(20));
    }

    #[test]
    fn test_clamp_minimum_integer_rounds_inward() {
        let policy = SitePolicy::new(vec![limit(
            "irrigation",
            "duration_min",
            Some(2.5),
            None,
            OnViolation::Clamp,
        )]);
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", 1);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Int(3));
    }

    #[test]
    fn test_clamp_maximum_integer_rounds_inward() {
        let policy = SitePolicy::new(vec![limit(
            "irrigation",
            "duration_min",
            None,
            Some(12.5),
            OnViolation::Clamp,
        )]);
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", 20);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Int(12));
    }

    #[test]
    fn test_permissive_policy() {
        let policy = SitePolicy::permissive();
        assert!(policy.limits().is_empty());
        let mut task = Task::new("irrigation", "valve-7").with_param("duration_min", 900);
        policy.validate(&mut task).unwrap();
        assert_eq!(task.params["duration_min"], ParamValue::Int(900));
    }
}
