//! Delayed-start scheduling.
//!
//! Decides whether a dequeued task runs now on the calling worker or is handed
//! to a one-shot timer that starts the pipeline at `schedule_at`. Armed timers
//! cannot be cancelled or rescheduled.

use std::sync::Arc;
use std::time::Duration;

use agri_core::types::Task;
use chrono::{DateTime, Utc};

use crate::error::ScheduleError;
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::timer::Timer;

/// What `dispatch` did with a task.
#[derive(Debug)]
pub enum Dispatch {
    /// Ran on the calling context.
    Immediate(RunOutcome),
    /// Parked on a timer for the given delay.
    Deferred(Duration),
}

/// Delay from `now` until `schedule_at`.
///
/// `Ok(None)` when the value is blank or not in the future.
pub fn delay_until(schedule_at: &str, now: DateTime<Utc>) -> Result<Option<Duration>, ScheduleError> {
    let value = schedule_at.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let at = DateTime::parse_from_rfc3339(value)
        .map_err(|e| ScheduleError::Invalid {
            value: value.to_string(),
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);

    Ok((at - now).to_std().ok().filter(|d| !d.is_zero()))
}

/// Runs tasks now or defers them until their `schedule_at`.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    timer: Arc<dyn Timer>,
}

impl Scheduler {
    /// Create a scheduler that arms deferred tasks on `timer`.
    pub fn new(orchestrator: Arc<Orchestrator>, timer: Arc<dyn Timer>) -> Self {
        Self {
            orchestrator,
            timer,
        }
    }

    /// Run `task` through the orchestrator, or arm a timer for it when its
    /// `schedule_at` lies in the future. An invalid `schedule_at` runs now.
    pub async fn dispatch(&self, task: Task) -> Dispatch {
        let decision = match task.schedule_at.as_deref() {
            Some(value) => delay_until(value, Utc::now()),
            None => Ok(None),
        };

        match decision {
            Ok(Some(delay)) => {
                tracing::info!(
                    task_id = %task.task_id,
                    trace_id = %task.trace_id,
                    delay_secs = delay.as_secs(),
                    "Task deferred"
                );
                let orchestrator = Arc::clone(&self.orchestrator);
                self.timer.arm(
                    delay,
                    Box::pin(async move {
                        orchestrator.run(task).await;
                    }),
                );
                Dispatch::Deferred(delay)
            }
            Ok(None) => Dispatch::Immediate(self.orchestrator.run(task).await),
            Err(e) => {
                tracing::warn!(
                    task_id = %task.task_id,
                    trace_id = %task.trace_id,
                    error = %e,
                    "Ignoring invalid schedule, running now"
                );
                Dispatch::Immediate(self.orchestrator.run(task).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ActionChainRunner, ChainOutcome};
    use crate::dispatcher::RecordingDispatcher;
    use crate::planner::Planner;
    use crate::policy::SitePolicy;
    use crate::registry::ActionTemplateRegistry;
    use crate::timer::TokioTimer;
    use chrono::TimeZone;

    fn scheduler() -> (Scheduler, Arc<RecordingDispatcher>, Arc<TokioTimer>) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let timer = Arc::new(TokioTimer::new());
        let runner = Arc::new(ActionChainRunner::new(dispatcher.clone(), None, timer.clone()));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(SitePolicy::default()),
            Planner::new(Arc::new(ActionTemplateRegistry::with_defaults())),
            runner,
        ));
        (Scheduler::new(orchestrator, timer.clone()), dispatcher, timer)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_delay_until_future() {
        let delay = delay_until("2026-10-16T08:00:00Z", now()).unwrap();
        assert_eq!(delay, Some(Duration::from_secs(2 * 3600)));
    }

    #[test]
    fn test_delay_until_with_offset() {
        let delay = delay_until("2026-10-16T14:30:00+08:00", now()).unwrap();
        assert_eq!(delay, Some(Duration::from_secs(30 * 60)));
    }

    #[test]
    fn test_delay_until_past_or_now() {
        assert_eq!(delay_until("2026-10-16T05:00:00Z", now()).unwrap(), None);
        assert_eq!(delay_until("2026-10-16T06:00:00Z", now()).unwrap(), None);
    }

    #[test]
    fn test_delay_until_blank() {
        assert_eq!(delay_until("", now()).unwrap(), None);
        assert_eq!(delay_until("   ", now()).unwrap(), None);
    }

    #[test]
    fn test_delay_until_invalid() {
        let err = delay_until("tomorrow morning", now()).unwrap_err();
        assert!(err.to_string().contains("tomorrow morning"));
    }

    #[tokio::test]
    async fn test_unscheduled_runs_immediately() {
        let (scheduler, dispatcher, _) = scheduler();
        let outcome = scheduler.dispatch(Task::new("irrigation", "valve-7")).await;
        assert!(matches!(
            outcome,
            Dispatch::Immediate(RunOutcome::Chain(ChainOutcome::Done { executed: 2 }))
        ));
        assert_eq!(dispatcher.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_schedule_runs_immediately() {
        let (scheduler, dispatcher, _) = scheduler();
        let task = Task::new("irrigation", "valve-7").with_schedule_at("not-a-time");
        assert!(matches!(scheduler.dispatch(task).await, Dispatch::Immediate(_)));
        assert_eq!(dispatcher.len(), 2);
    }

    #[tokio::test]
    async fn test_past_schedule_runs_immediately() {
        let (scheduler, dispatcher, _) = scheduler();
        let task = Task::new("irrigation", "valve-7").with_schedule_at("2020-01-01T00:00:00Z");
        assert!(matches!(scheduler.dispatch(task).await, Dispatch::Immediate(_)));
        assert_eq!(dispatcher.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_hours_ahead_is_deferred() {
        let (scheduler, dispatcher, timer) = scheduler();
        let at = (Utc::now() + chrono::Duration::hours(2)).to_rfc3339();
        let task = Task::new("irrigation", "valve-7").with_schedule_at(at);

        let outcome = scheduler.dispatch(task).await;
        assert!(matches!(outcome, Dispatch::Deferred(d) if d > Duration::from_secs(7000)));
        assert_eq!(timer.pending(), 1);

        tokio::time::sleep(Duration::from_secs(2 * 3600 - 60)).await;
        assert!(dispatcher.is_empty());

        tokio::time::sleep(Duration::from_secs(120)).await;
        let verbs: Vec<String> = dispatcher.commands().into_iter().map(|c| c.command).collect();
        assert_eq!(verbs, ["open_valve", "close_valve"]);
    }
}
