//! One-shot timers for deferred tasks and `wait` steps.
//!
//! Arming a timer never blocks the caller: the continuation is parked on its
//! own runtime task and runs once the delay has elapsed.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Work to run when a timer fires.
pub type Continuation = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Timer: Send + Sync {
    /// Run `continuation` after `delay` on a context independent of the
    /// caller.
    fn arm(&self, delay: Duration, continuation: Continuation);

    /// Timers armed but not yet fired.
    fn pending(&self) -> usize {
        0
    }
}

/// Timer backed by `tokio::time::sleep` on a spawned task.
///
/// Must be armed from within a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioTimer {
    pending: Arc<AtomicUsize>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for TokioTimer {
    fn arm(&self, delay: Duration, continuation: Continuation) {
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.fetch_sub(1, Ordering::SeqCst);
            continuation.await;
        });
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let timer = TokioTimer::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        timer.arm(
            Duration::from_secs(5),
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
            }),
        );
        assert_eq!(timer.pending(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(timer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_returns_immediately() {
        let timer = TokioTimer::new();
        let start = tokio::time::Instant::now();
        timer.arm(Duration::from_secs(3600), Box::pin(async {}));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
