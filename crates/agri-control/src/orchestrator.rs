//! Per-task pipeline.
//!
//! Runs one task through policy, planning and the action chain. Whatever
//! context calls [`Orchestrator::run`] drives the chain until it finishes,
//! aborts or suspends on its first timed wait.

use std::sync::Arc;

use agri_core::types::Task;

use crate::chain::{ActionChainRunner, ChainOutcome};
use crate::error::{PlanError, PolicyError};
use crate::planner::Planner;
use crate::policy::PolicyChecker;

/// Where the pipeline left a task.
#[derive(Debug)]
pub enum RunOutcome {
    /// Abandoned by policy before planning.
    Rejected(PolicyError),
    /// Abandoned because its task type has no templates.
    Unplanned(PlanError),
    /// Handed to the chain runner.
    Chain(ChainOutcome),
}

/// Orchestrator that coordinates policy, planning and chain execution.
pub struct Orchestrator {
    policy: Arc<dyn PolicyChecker>,
    planner: Planner,
    runner: Arc<ActionChainRunner>,
}

impl Orchestrator {
    pub fn new(
        policy: Arc<dyn PolicyChecker>,
        planner: Planner,
        runner: Arc<ActionChainRunner>,
    ) -> Self {
        Self {
            policy,
            planner,
            runner,
        }
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub async fn run(&self, mut task: Task) -> RunOutcome {
        if let Err(e) = self.policy.validate(&mut task) {
            tracing::warn!(
                task_id = %task.task_id,
                trace_id = %task.trace_id,
                task_type = %task.task_type,
                error = %e,
                "Task rejected by policy"
            );
            return RunOutcome::Rejected(e);
        }

        let actions = match self.planner.plan(&task) {
            Ok(actions) => actions,
            Err(e) => {
                tracing::warn!(
                    task_id = %task.task_id,
                    trace_id = %task.trace_id,
                    error = %e,
                    "Task abandoned"
                );
                return RunOutcome::Unplanned(e);
            }
        };

        RunOutcome::Chain(self.runner.run(task, actions).await)
    }
}
