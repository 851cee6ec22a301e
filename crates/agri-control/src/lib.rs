//! Task scheduling and action-chain execution engine.
//!
//! Accepts tasks into a bounded intake queue, drains them with a fixed worker
//! pool, defers scheduled tasks, applies site policy, expands each task into
//! its action chain and runs the chain one device command at a time. `wait`
//! steps are timed continuations, so a waiting chain never holds a worker.

pub mod chain;
pub mod dispatcher;
pub mod error;
pub mod intake;
pub mod orchestrator;
pub mod planner;
pub mod policy;
pub mod registry;
pub mod replay;
pub mod scheduler;
pub mod service;
pub mod timer;

pub use chain::{wait_duration, ActionChainRunner, ChainOutcome};
pub use dispatcher::{DeviceDispatcher, RecordingDispatcher, TracingDispatcher};
pub use error::{
    DispatchError, IntakeError, PlanError, PolicyError, RegistryError, ScheduleError,
};
pub use intake::{TaskIntake, TaskReceipt, WorkerPool};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use planner::Planner;
pub use policy::{PolicyChecker, SitePolicy};
pub use registry::ActionTemplateRegistry;
pub use replay::{ReplayFilter, ReplayReport};
pub use scheduler::{Dispatch, Scheduler};
pub use service::{ControlService, ControlServiceBuilder, ServiceStats};
pub use timer::{Timer, TokioTimer};
