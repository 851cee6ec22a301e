//! Bounded task intake and the fixed worker pool that drains it.
//!
//! Enqueueing never waits: once the queue holds `capacity` tasks further
//! submissions fail with [`IntakeError::QueueFull`]. Workers share the single
//! receiver behind an async mutex and each processes its tasks in dequeue
//! order.

use std::sync::Arc;

use agri_core::types::Task;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::IntakeError;
use crate::scheduler::Scheduler;

/// Identifiers assigned to an accepted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReceipt {
    pub task_id: String,
    pub trace_id: String,
}

/// Producer side of the task queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskIntake {
    sender: mpsc::Sender<Task>,
    capacity: usize,
}

impl TaskIntake {
    /// Create an intake holding at most `capacity` tasks (minimum 1) and the
    /// receiver for the worker pool.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Task>) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, capacity }, receiver)
    }

    /// Accept a task without waiting.
    ///
    /// Missing identifiers are generated before the task is queued.
    pub fn enqueue(&self, mut task: Task) -> Result<TaskReceipt, IntakeError> {
        task.ensure_identifiers();
        let receipt = TaskReceipt {
            task_id: task.task_id.clone(),
            trace_id: task.trace_id.clone(),
        };

        self.sender.try_send(task).map_err(|e| match e {
            TrySendError::Full(task) => {
                tracing::warn!(
                    task_id = %task.task_id,
                    trace_id = %task.trace_id,
                    capacity = self.capacity,
                    "Task queue full, rejecting task"
                );
                IntakeError::QueueFull {
                    capacity: self.capacity,
                }
            }
            TrySendError::Closed(_) => IntakeError::Closed,
        })?;

        tracing::debug!(
            task_id = %receipt.task_id,
            trace_id = %receipt.trace_id,
            "Task enqueued"
        );
        Ok(receipt)
    }

    /// Maximum number of queued tasks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently waiting in the queue.
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    /// True once the worker pool has shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Fixed set of workers draining one intake.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    stop: watch::Sender<bool>,
}

impl WorkerPool {
    /// Start exactly `count` workers (minimum 1) feeding `scheduler`.
    pub fn spawn(count: usize, receiver: mpsc::Receiver<Task>, scheduler: Arc<Scheduler>) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let (stop, _) = watch::channel(false);

        let handles = (0..count.max(1))
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let scheduler = Arc::clone(&scheduler);
                let stop = stop.subscribe();
                tokio::spawn(worker_loop(id, receiver, scheduler, stop))
            })
            .collect();

        Self { handles, stop }
    }

    /// Number of workers started.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Close the queue, let workers drain what is already in it, and wait for
    /// them to exit. Armed timers are left to fire on their own.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker terminated abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

async fn worker_loop(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Task>>>,
    scheduler: Arc<Scheduler>,
    mut stop: watch::Receiver<bool>,
) {
    tracing::debug!(worker = id, "Worker started");
    loop {
        let next = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                task = rx.recv() => task,
                _ = stop.changed() => {
                    rx.close();
                    rx.recv().await
                }
            }
        };

        let Some(task) = next else {
            break;
        };
        scheduler.dispatch(task).await;
    }
    tracing::debug!(worker = id, "Worker stopped");
}
