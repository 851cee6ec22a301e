//! Assembled control engine.
//!
//! [`ControlServiceBuilder`] wires registry, policy, dispatcher, execution log
//! and timer into one [`ControlService`]: a bounded intake drained by a fixed
//! worker pool.

use std::sync::Arc;

use agri_core::config::AgriConfig;
use agri_core::types::Task;
use agri_storage::ExecutionLog;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::chain::ActionChainRunner;
use crate::dispatcher::{DeviceDispatcher, TracingDispatcher};
use crate::error::IntakeError;
use crate::intake::{TaskIntake, TaskReceipt, WorkerPool};
use crate::orchestrator::Orchestrator;
use crate::planner::Planner;
use crate::policy::{PolicyChecker, SitePolicy};
use crate::registry::ActionTemplateRegistry;
use crate::scheduler::Scheduler;
use crate::timer::{Timer, TokioTimer};

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_QUEUE_MULTIPLIER: usize = 4;

/// Point-in-time engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub workers: usize,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub pending_timers: usize,
}

/// Assembles a [`ControlService`]. Unset parts fall back to defaults.
pub struct ControlServiceBuilder {
    registry: Option<Arc<ActionTemplateRegistry>>,
    policy: Option<Arc<dyn PolicyChecker>>,
    dispatcher: Option<Arc<dyn DeviceDispatcher>>,
    log: Option<Arc<dyn ExecutionLog>>,
    timer: Option<Arc<dyn Timer>>,
    workers: usize,
    queue_capacity: Option<usize>,
}

impl Default for ControlServiceBuilder {
    fn default() -> Self {
        Self {
            registry: None,
            policy: None,
            dispatcher: None,
            log: None,
            timer: None,
            workers: DEFAULT_WORKERS,
            queue_capacity: None,
        }
    }
}

impl ControlServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker count, queue capacity and site policy from configuration.
    pub fn from_config(config: &AgriConfig) -> Self {
        Self::new()
            .workers(config.workers.count)
            .queue_capacity(config.workers.queue_capacity())
            .policy(Arc::new(SitePolicy::from_config(&config.policy)))
    }

    pub fn registry(mut self, registry: Arc<ActionTemplateRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn policy(mut self, policy: Arc<dyn PolicyChecker>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn DeviceDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn execution_log(mut self, log: Arc<dyn ExecutionLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Fixed queue capacity. Defaults to four slots per worker.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Spawn the worker pool. Must be called within a tokio runtime.
    pub fn start(self) -> ControlService {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ActionTemplateRegistry::with_defaults()));
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(SitePolicy::default()));
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(TracingDispatcher));
        let timer = self.timer.unwrap_or_else(|| Arc::new(TokioTimer::new()));
        let capacity = self
            .queue_capacity
            .unwrap_or(self.workers * DEFAULT_QUEUE_MULTIPLIER);

        let runner = Arc::new(ActionChainRunner::new(
            dispatcher,
            self.log,
            Arc::clone(&timer),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            policy,
            Planner::new(Arc::clone(&registry)),
            runner,
        ));
        let scheduler = Arc::new(Scheduler::new(orchestrator, Arc::clone(&timer)));

        let (intake, receiver) = TaskIntake::channel(capacity);
        let pool = WorkerPool::spawn(self.workers, receiver, scheduler);

        tracing::info!(
            workers = pool.size(),
            queue_capacity = intake.capacity(),
            "Control service started"
        );

        ControlService {
            workers: pool.size(),
            intake,
            pool: Mutex::new(Some(pool)),
            registry,
            timer,
        }
    }
}

/// Running control engine: task intake plus its worker pool.
pub struct ControlService {
    intake: TaskIntake,
    pool: Mutex<Option<WorkerPool>>,
    registry: Arc<ActionTemplateRegistry>,
    timer: Arc<dyn Timer>,
    workers: usize,
}

impl ControlService {
    pub fn builder() -> ControlServiceBuilder {
        ControlServiceBuilder::new()
    }

    /// Submit a task. Fails immediately when the queue is full or closed.
    pub fn enqueue(&self, task: Task) -> Result<TaskReceipt, IntakeError> {
        self.intake.enqueue(task)
    }

    /// Producer handle for callers that outlive a borrow of the service.
    pub fn intake(&self) -> TaskIntake {
        self.intake.clone()
    }

    /// The live template table, shared with the planner.
    pub fn registry(&self) -> &Arc<ActionTemplateRegistry> {
        &self.registry
    }

    /// Current worker, queue and timer counters.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            workers: self.workers,
            queue_depth: self.intake.depth(),
            queue_capacity: self.intake.capacity(),
            pending_timers: self.timer.pending(),
        }
    }

    /// Stop accepting tasks, drain the queue and join the workers.
    ///
    /// Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            pool.shutdown().await;
        }
    }
}
