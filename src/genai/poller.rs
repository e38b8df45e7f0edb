//! # Long-Running Operation Poller
//!
//! Video generation returns a job handle instead of a result. The poller
//! re-reads the job at a fixed interval until the service marks it done.
//!
//! ## Polling Policy:
//! - **Constant cadence**: Every re-check is preceded by the same delay (10s by default)
//! - **No backoff, no retry on error**: A failed status check ends the wait
//! - **Bounded**: An overall timeout and a cancellation token stop the wait
//!
//! ## Example:
//! A job reporting "not done" on submission and on the next two checks, then
//! "done" on the third, costs three delays and three status requests.

use crate::genai::client::{GenAiBackend, GenAiError};
use crate::genai::types::Operation;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct OperationPoller {
    interval: Duration,
    timeout: Option<Duration>,
}

impl OperationPoller {
    /// `timeout` of `None` waits for as long as the job takes.
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Wait until `operation` is done.
    ///
    /// ## Returns:
    /// - **Ok(operation)**: The finished job, with no `error` set
    /// - **Err(OperationFailed)**: The job finished with an error status
    /// - **Err(PollTimeout)**: The overall timeout expired first
    /// - **Err(Cancelled)**: `cancel` fired during a delay
    /// - **Err(other)**: A status request failed; it is not retried
    pub async fn wait(
        &self,
        backend: &dyn GenAiBackend,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<Operation, GenAiError> {
        let interval = self.interval;
        let poll = async move {
            let mut operation = operation;
            let mut checks: u32 = 0;

            while !operation.done {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(GenAiError::Cancelled),
                    _ = tokio::time::sleep(interval) => {}
                }

                checks += 1;
                debug!(operation = %operation.name, checks, "Checking video operation status");
                let next = backend.get_operation(&operation.name).await?;
                operation = next;
            }

            info!(operation = %operation.name, checks, "Video operation finished");
            Ok(operation)
        };

        let operation = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, poll)
                .await
                .map_err(|_| GenAiError::PollTimeout(limit))??,
            None => poll.await?,
        };

        if let Some(status) = &operation.error {
            return Err(GenAiError::OperationFailed(format!("{} (code {})", status.message, status.code)));
        }
        Ok(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::{finished_operation, pending_operation, ScriptedBackend};
    use crate::genai::types::OperationStatus;
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn test_three_pending_checks_then_done() {
        let backend = ScriptedBackend::new();
        // Initial handle not done; status checks 1 and 2 not done; check 3 done.
        backend
            .push_operation(Ok(pending_operation("op")))
            .push_operation(Ok(pending_operation("op")))
            .push_operation(Ok(finished_operation("op", "https://files.test/video")));

        let poller = OperationPoller::new(INTERVAL, None);
        let start = Instant::now();
        let handle = pending_operation("op");
        let done = poller
            .wait(&backend, handle, &CancellationToken::new())
            .await
            .unwrap();

        assert!(done.done);
        assert_eq!(done.video_uri(), Some("https://files.test/video"));
        assert_eq!(backend.operation_checks.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_done_does_not_poll() {
        let backend = ScriptedBackend::new();
        let poller = OperationPoller::new(INTERVAL, None);

        let start = Instant::now();
        let done = poller
            .wait(&backend, finished_operation("op", "https://files.test/v"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(done.done);
        assert_eq!(backend.operation_checks.load(Ordering::SeqCst), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_stops_a_stalled_job() {
        let backend = ScriptedBackend::new();
        for _ in 0..10 {
            backend.push_operation(Ok(pending_operation("op")));
        }

        let poller = OperationPoller::new(INTERVAL, Some(Duration::from_secs(35)));
        let result = poller
            .wait(&backend, pending_operation("op"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(GenAiError::PollTimeout(_))));
        assert_eq!(backend.operation_checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_the_delay() {
        let backend = ScriptedBackend::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let poller = OperationPoller::new(INTERVAL, None);
        let result = poller.wait(&backend, pending_operation("op"), &cancel).await;

        assert!(matches!(result, Err(GenAiError::Cancelled)));
        assert_eq!(backend.operation_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_errors_are_not_retried() {
        let backend = ScriptedBackend::new();
        backend.push_operation(Err(GenAiError::Api { status: 500, message: "boom".into() }));

        let poller = OperationPoller::new(INTERVAL, None);
        let result = poller
            .wait(&backend, pending_operation("op"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(GenAiError::Api { status: 500, .. })));
        assert_eq!(backend.operation_checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_operation_is_reported() {
        let backend = ScriptedBackend::new();
        let mut failed = pending_operation("op");
        failed.done = true;
        failed.error = Some(OperationStatus { code: 3, message: "prompt rejected".into() });

        let poller = OperationPoller::new(INTERVAL, None);
        let result = poller.wait(&backend, failed, &CancellationToken::new()).await;

        assert!(matches!(result, Err(GenAiError::OperationFailed(message)) if message.contains("prompt rejected")));
    }
}
