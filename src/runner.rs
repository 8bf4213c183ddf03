//! Background job submission.
//!
//! Pipeline runs are fire-and-forget: the event handler submits a unit of
//! work and returns immediately, with no result channel back. Keeping the
//! policy behind this interface means a bounded variant can replace the
//! unbounded one without touching any caller.

use std::future::Future;

/// Submits independent, uncancelable units of work.
///
/// Currently unbounded: every job gets its own task. A panicking job takes
/// down only its own task, never the event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobRunner;

impl JobRunner {
    /// Create a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Submit a unit of work. No handle is returned to the caller.
    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_submitted_job_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        JobRunner::new().submit(async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_poison_runner() {
        let runner = JobRunner::new();
        runner.submit(async {
            panic!("job failure stays inside the task");
        });

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        runner.submit(async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
