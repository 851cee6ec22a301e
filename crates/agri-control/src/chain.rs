//! Action chain runner.
//!
//! A chain is an owned state machine (`Running(index)` → … → `Done`, or
//! `Aborted` at the first device failure) driven by a loop rather than by
//! recursion. Device actions run inline on whichever context is driving the
//! chain. A `wait` action hands the whole run to a timer and returns, so the
//! driving worker is free while the chain sleeps.
//!
//! The run value is moved into exactly one continuation at a time, which is
//! what guarantees a single active context per chain.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agri_core::types::{Action, DeviceCommand, ParamValue, Params, Task};
use agri_storage::{ExecutionLog, ExecutionLogEntry};

use crate::dispatcher::DeviceDispatcher;
use crate::error::DispatchError;
use crate::timer::Timer;

/// Future returned while driving a chain.
pub type ChainFuture = Pin<Box<dyn Future<Output = ChainOutcome> + Send + 'static>>;

/// Wait keys in priority order with their length in milliseconds.
const WAIT_KEYS: [(&str, u64); 3] = [
    ("duration_ms", 1),
    ("duration_sec", 1_000),
    ("duration_min", 60_000),
];

/// Resolve a `wait` action's duration from its parameters.
///
/// The first present key of `duration_ms`, `duration_sec`, `duration_min`
/// decides. Non-numeric, non-positive, non-finite or overflowing values
/// resolve to zero.
pub fn wait_duration(params: &Params) -> Duration {
    let Some((value, unit_ms)) = WAIT_KEYS
        .iter()
        .find_map(|(key, unit)| params.get(*key).map(|v| (v, *unit)))
    else {
        return Duration::ZERO;
    };

    match value {
        ParamValue::Int(n) if *n > 0 => (*n as u64)
            .checked_mul(unit_ms)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO),
        ParamValue::Float(n) if n.is_finite() && *n > 0.0 => {
            Duration::try_from_secs_f64(*n * unit_ms as f64 / 1_000.0).unwrap_or(Duration::ZERO)
        }
        _ => Duration::ZERO,
    }
}

/// Where a chain currently stands.
#[derive(Debug, Clone)]
pub enum ChainState {
    Running(usize),
    Done,
    Aborted { index: usize, error: DispatchError },
}

/// How the context that was driving a chain left it.
#[derive(Debug, Clone)]
pub enum ChainOutcome {
    /// Every action ran; `executed` device commands in total.
    Done { executed: usize },
    /// Handed to a timer; the chain resumes at `resume_at` after `delay`.
    Suspended { resume_at: usize, delay: Duration },
    /// Device failure at `index`; nothing after it ran.
    Aborted { index: usize, error: DispatchError },
}

struct ChainRun {
    task: Task,
    actions: Vec<Action>,
    state: ChainState,
    executed: usize,
}

enum Step {
    Advance,
    Suspend(Duration),
    Finished,
}

/// Executes planned action chains, suspending on `wait` steps.
pub struct ActionChainRunner {
    dispatcher: Arc<dyn DeviceDispatcher>,
    log: Option<Arc<dyn ExecutionLog>>,
    timer: Arc<dyn Timer>,
}

impl ActionChainRunner {
    /// Create a runner. Without a log, executed commands are not recorded.
    pub fn new(
        dispatcher: Arc<dyn DeviceDispatcher>,
        log: Option<Arc<dyn ExecutionLog>>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        Self {
            dispatcher,
            log,
            timer,
        }
    }

    /// Start driving `actions` for `task` from the first step.
    ///
    /// The returned future completes when the chain finishes, aborts, or
    /// suspends on a `wait`; in the last case the rest of the chain continues
    /// on a timer.
    pub fn run(self: &Arc<Self>, task: Task, actions: Vec<Action>) -> ChainFuture {
        tracing::debug!(
            task_id = %task.task_id,
            trace_id = %task.trace_id,
            steps = actions.len(),
            "Action chain started"
        );
        let run = ChainRun {
            task,
            actions,
            state: ChainState::Running(0),
            executed: 0,
        };
        Arc::clone(self).drive(run)
    }

    fn drive(self: Arc<Self>, mut run: ChainRun) -> ChainFuture {
        Box::pin(async move {
            loop {
                match self.step(&mut run).await {
                    Step::Advance => continue,
                    Step::Suspend(delay) => {
                        let resume_at = match run.state {
                            ChainState::Running(i) => i,
                            _ => run.actions.len(),
                        };
                        tracing::debug!(
                            task_id = %run.task.task_id,
                            trace_id = %run.task.trace_id,
                            resume_at,
                            delay_ms = delay.as_millis() as u64,
                            "Action chain waiting"
                        );
                        let runner = Arc::clone(&self);
                        self.timer.arm(
                            delay,
                            Box::pin(async move {
                                runner.drive(run).await;
                            }),
                        );
                        return ChainOutcome::Suspended { resume_at, delay };
                    }
                    Step::Finished => {
                        return match run.state {
                            ChainState::Aborted { index, error } => {
                                ChainOutcome::Aborted { index, error }
                            }
                            _ => ChainOutcome::Done {
                                executed: run.executed,
                            },
                        };
                    }
                }
            }
        })
    }

    async fn step(&self, run: &mut ChainRun) -> Step {
        let ChainState::Running(index) = run.state else {
            return Step::Finished;
        };

        let Some(action) = run.actions.get(index) else {
            run.state = ChainState::Done;
            tracing::info!(
                task_id = %run.task.task_id,
                trace_id = %run.task.trace_id,
                executed = run.executed,
                "Action chain completed"
            );
            return Step::Finished;
        };

        if action.is_wait() {
            let delay = wait_duration(&action.params);
            run.state = ChainState::Running(index + 1);
            return if delay.is_zero() {
                Step::Advance
            } else {
                Step::Suspend(delay)
            };
        }

        let command = DeviceCommand::for_action(&run.task, action);
        let started = Instant::now();
        match self.dispatcher.execute(&command).await {
            Ok(()) => {
                self.record(&command, started.elapsed());
                run.executed += 1;
                run.state = ChainState::Running(index + 1);
                Step::Advance
            }
            Err(error) => {
                tracing::error!(
                    task_id = %command.task_id,
                    trace_id = %command.trace_id,
                    index,
                    device_id = %command.device_id,
                    command = %command.command,
                    error = %error,
                    "Device command failed, aborting chain"
                );
                run.state = ChainState::Aborted { index, error };
                Step::Finished
            }
        }
    }

    fn record(&self, command: &DeviceCommand, elapsed: Duration) {
        let Some(log) = &self.log else {
            return;
        };
        // Synchronous; see `ExecutionLog`.
        if let Err(e) = log.append(&ExecutionLogEntry::ok(command, elapsed)) {
            tracing::warn!(
                task_id = %command.task_id,
                trace_id = %command.trace_id,
                command = %command.command,
                error = %e,
                "Execution log append failed"
            );
        }
    }
}
