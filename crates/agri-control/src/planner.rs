//! Expands a task into its concrete action chain.

use std::sync::Arc;

use agri_core::types::{Action, Task};

use crate::error::PlanError;
use crate::registry::ActionTemplateRegistry;

/// Turns tasks into action chains using the template registry.
pub struct Planner {
    registry: Arc<ActionTemplateRegistry>,
}

impl Planner {
    /// Create a planner reading templates from `registry`.
    pub fn new(registry: Arc<ActionTemplateRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ActionTemplateRegistry> {
        &self.registry
    }

    /// Resolve `task` into a fresh action list.
    ///
    /// Every action's params are overwritten with the task's params; template
    /// params are not merged.
    pub fn plan(&self, task: &Task) -> Result<Vec<Action>, PlanError> {
        let mut actions = self
            .registry
            .lookup(&task.task_type)
            .ok_or_else(|| PlanError::UnknownTaskType(task.task_type.clone()))?;

        for action in &mut actions {
            action.params = task.params.clone();
        }

        tracing::debug!(
            task_id = %task.task_id,
            trace_id = %task.trace_id,
            task_type = %task.task_type,
            steps = actions.len(),
            "Task planned"
        );
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TemplateTable;
    use agri_core::types::ParamValue;

    fn planner() -> Planner {
        Planner::new(Arc::new(ActionTemplateRegistry::with_defaults()))
    }

    #[test]
    fn test_every_action_carries_task_params() {
        let task = Task::new("irrigation", "valve-7")
            .with_param("duration_min", 15)
            .with_param("zone", "north");
        let actions = planner().plan(&task).unwrap();

        assert_eq!(actions.len(), 3);
        for action in &actions {
            assert_eq!(action.params, task.params);
        }
    }

    #[test]
    fn test_template_params_are_overwritten() {
        let mut templated = Action::new("open_valve", "irrigation");
        templated
            .params
            .insert("pressure".to_string(), ParamValue::Int(3));
        let mut table = TemplateTable::new();
        table.insert("irrigation".to_string(), vec![templated]);
        let planner = Planner::new(Arc::new(ActionTemplateRegistry::new(table)));

        let task = Task::new("irrigation", "valve-7").with_param("duration_min", 5);
        let actions = planner.plan(&task).unwrap();
        assert!(!actions[0].params.contains_key("pressure"));
        assert_eq!(actions[0].params["duration_min"], ParamValue::Int(5));
    }

    #[test]
    fn test_unknown_task_type() {
        let task = Task::new("fertigation", "pump-2");
        let err = planner().plan(&task).unwrap_err();
        assert!(matches!(err, PlanError::UnknownTaskType(t) if t == "fertigation"));
    }

    #[test]
    fn test_plan_does_not_touch_registry() {
        let p = planner();
        let task = Task::new("irrigation", "valve-7").with_param("duration_min", 15);
        p.plan(&task).unwrap();

        let templates = p.registry().lookup("irrigation").unwrap();
        assert!(templates.iter().all(|a| a.params.is_empty()));
    }
}
