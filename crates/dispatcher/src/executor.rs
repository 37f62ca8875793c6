//! RetryExecutor - runs action instances on worker tasks with retries
//!
//! Each submitted action is moved into its own task, so the task's
//! ownership of the instance is the single-occupancy guard: no two
//! executions of the same instance can ever overlap. A returned error is
//! the sole retry signal; whether it leads to a re-invocation is decided
//! here from the action's own retry policy.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use observability::{record_action_result, record_action_retry};

use crate::actions::DetectionAction;
use crate::metrics::ActionMetrics;

/// Executor for one-shot detection actions
pub struct RetryExecutor {
    /// Bounds concurrently-executing actions across all detections
    semaphore: Arc<Semaphore>,
    /// Shared metrics
    metrics: Arc<ActionMetrics>,
}

impl RetryExecutor {
    /// Create an executor allowing at most `max_in_flight` concurrent actions
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            metrics: Arc::new(ActionMetrics::new()),
        }
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ActionMetrics> {
        &self.metrics
    }

    /// Submit an action for execution.
    ///
    /// Returns the handle of the worker task; the task drives the action
    /// through success, retries, or final failure.
    pub fn submit(&self, action: DetectionAction) -> JoinHandle<()> {
        self.metrics.inc_submitted_count();
        let semaphore = Arc::clone(&self.semaphore);
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            // Closed only on executor teardown, which drops the tasks too
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            run_action(action, &metrics).await;
        })
    }
}

/// Drive one action instance to completion
async fn run_action(mut action: DetectionAction, metrics: &ActionMetrics) {
    let policy = action.retry_policy();
    let mut attempt: u32 = 1;

    loop {
        match action.execute().await {
            Ok(()) => {
                metrics.inc_completed_count();
                record_action_result(action.label(), true);
                debug!(action = %action.describe(), attempt, "Action handled");
                return;
            }
            Err(err) if policy.enabled && attempt < policy.max_attempts => {
                let backoff = policy.backoff_for(attempt);
                metrics.inc_retried_count();
                record_action_retry(action.label());
                warn!(
                    action = %action.describe(),
                    error = %err,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Action failed, will retry"
                );
                sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => {
                metrics.inc_failed_count();
                record_action_result(action.label(), false);
                error!(
                    action = %action.describe(),
                    error = %err,
                    attempts = attempt,
                    "Action failed permanently"
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{probe_action, ProbeOutcome};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_success_counts_completed() {
        let executor = RetryExecutor::new(4);
        let (action, calls) = probe_action(ProbeOutcome::Succeed);

        executor.submit(action).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.metrics().completed_count(), 1);
        assert_eq!(executor.metrics().failed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_reinvokes_same_instance() {
        let executor = RetryExecutor::new(4);
        let (action, calls) = probe_action(ProbeOutcome::FailTimes(2));

        executor.submit(action).await.unwrap();

        // two failures, third attempt succeeds
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(executor.metrics().retried_count(), 2);
        assert_eq!(executor.metrics().completed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_count_failed() {
        let executor = RetryExecutor::new(4);
        let (action, calls) = probe_action(ProbeOutcome::AlwaysFail);

        executor.submit(action).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(executor.metrics().failed_count(), 1);
        assert_eq!(executor.metrics().completed_count(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_bound_is_respected() {
        let executor = RetryExecutor::new(1);
        let (slow, _slow_calls) = probe_action(ProbeOutcome::Sleep(Duration::from_millis(50)));
        let (fast, fast_calls) = probe_action(ProbeOutcome::Succeed);

        let slow_handle = executor.submit(slow);
        tokio::time::sleep(Duration::from_millis(10)).await;
        // with a single permit the second action waits for the first
        assert_eq!(fast_calls.load(Ordering::SeqCst), 0);
        let fast_handle = executor.submit(fast);

        slow_handle.await.unwrap();
        fast_handle.await.unwrap();
        assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
    }
}
