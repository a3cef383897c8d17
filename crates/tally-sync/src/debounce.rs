//! # Debouncer
//!
//! Runs a task once a burst of calls has gone quiet.
//!
//! ```text
//!  schedule  schedule  schedule                 fires
//!     │         │         │                       │
//!     ▼         ▼         ▼                       ▼
//!  ───●─────────●─────────●───────── delay ───────■────►
//!     └─abort───┘└─abort──┘
//! ```
//!
//! Each `schedule` aborts the outstanding task before spawning a new one.
//! The task body is synchronous, so an aborted task never runs any part of
//! it. Tasks are spawned on the caller's tokio runtime; without one,
//! `schedule` refuses and the caller decides what to do.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

/// A cancellable, reschedulable one-shot timer.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels any outstanding task and schedules `task` after the delay.
    ///
    /// Returns false, dropping `task` unrun, when the calling thread is not
    /// inside a tokio runtime. The outstanding task is left alone then.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            return false;
        };

        let delay = self.delay;
        let handle = runtime.spawn(async move {
            sleep(delay).await;
            task();
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(handle) {
            trace!("Debounce rescheduled");
            previous.abort();
        }
        true
    }

    /// Cancels the outstanding task. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        let taken = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// True while a scheduled task has not yet run.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = Arc::clone(&count);
            move || {
                let count = Arc::clone(&count);
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            }
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let (count, task) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(120));

        assert!(debouncer.schedule(task()));
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(119)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_collapses_burst() {
        let (count, task) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(120));

        for _ in 0..10 {
            debouncer.schedule(task());
            sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let (count, task) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(120));

        debouncer.schedule(task());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_schedule_without_runtime_is_refused() {
        let (count, task) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(120));

        assert!(!debouncer.schedule(task()));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
