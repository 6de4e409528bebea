//! Bounded polling of asynchronous backend tasks.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use debridgate_common::Error;

/// Coarse phase of a backend task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// Still queued or running.
    Pending,
    Complete,
    /// Terminal failure reported by the backend.
    Error,
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskPhase::Pending)
    }
}

/// How long to keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Re-fetches after the initial fetch.
    pub retries: u32,
    /// Pause between fetches.
    pub retry_interval: Duration,
}

impl PollPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            retry_interval: Duration::from_secs(5),
        }
    }

    /// Set the pause between fetches.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// A poll that did not end in a complete task.
///
/// `last` holds the most recent task seen, so callers can still report a
/// best-effort state.
#[derive(Debug)]
pub struct PollFailure<T> {
    pub last: Option<T>,
    pub error: Error,
}

impl<T> PollFailure<T> {
    fn new(last: Option<T>, error: Error) -> Self {
        Self { last, error }
    }

    /// Discard the last-seen task.
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl<T> fmt::Display for PollFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

/// Fetch a task until it completes, fails, or the policy runs out.
///
/// Returns the task once `phase_of` reports [`TaskPhase::Complete`]. A task
/// in [`TaskPhase::Error`], an exhausted policy, a fetch error and
/// cancellation all yield a [`PollFailure`] carrying the last task seen.
pub async fn wait_for_completion<T, F, Fut, P>(
    mut fetch: F,
    phase_of: P,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> std::result::Result<T, PollFailure<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = debridgate_common::Result<T>>,
    P: Fn(&T) -> TaskPhase,
{
    let mut last: Option<T> = None;
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PollFailure::new(
                last,
                Error::Cancelled("task polling cancelled".to_string()),
            ));
        }

        let task = match fetch().await {
            Ok(task) => task,
            Err(err) => return Err(PollFailure::new(last, err)),
        };

        match phase_of(&task) {
            TaskPhase::Complete => {
                if attempt > 0 {
                    debug!("Task completed after {} retries", attempt);
                }
                return Ok(task);
            }
            TaskPhase::Error => {
                return Err(PollFailure::new(
                    Some(task),
                    Error::TaskIncomplete("task failed upstream".to_string()),
                ));
            }
            TaskPhase::Pending => {}
        }

        last = Some(task);

        if attempt >= policy.retries {
            warn!("Task still pending after {} retries", policy.retries);
            return Err(PollFailure::new(
                last,
                Error::TaskIncomplete(format!(
                    "task still pending after {} retries",
                    policy.retries
                )),
            ));
        }
        attempt += 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PollFailure::new(
                    last,
                    Error::Cancelled("task polling cancelled".to_string()),
                ));
            }
            _ = sleep(policy.retry_interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn fast(retries: u32) -> PollPolicy {
        PollPolicy::new(retries).with_retry_interval(Duration::from_millis(10))
    }

    fn phase(progress: &u32) -> TaskPhase {
        if *progress >= 100 {
            TaskPhase::Complete
        } else {
            TaskPhase::Pending
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.retry_interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let fetches = Arc::new(AtomicU32::new(0));
        let counter = fetches.clone();

        let started = Instant::now();
        let result = wait_for_completion(
            move || {
                let count = counter.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(10u32)
                }
            },
            phase,
            &fast(3),
            &CancellationToken::new(),
        )
        .await;
        let elapsed = started.elapsed();

        // 3 retries x 10ms
        assert!(elapsed >= Duration::from_millis(30), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(200), "{:?}", elapsed);

        let failure = result.unwrap_err();
        assert!(matches!(failure.error, Error::TaskIncomplete(_)));
        assert_eq!(failure.last, Some(10));
        // Initial fetch + 3 retries
        assert_eq!(fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_returns_on_completion() {
        let fetches = Arc::new(AtomicU32::new(0));
        let counter = fetches.clone();

        let result = wait_for_completion(
            move || {
                let count = counter.clone();
                async move {
                    let n = count.fetch_add(1, Ordering::SeqCst);
                    Ok(n * 50)
                }
            },
            phase,
            &fast(5),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.unwrap(), 100);
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_phase_stops_polling() {
        let result = wait_for_completion(
            || async { Ok(-1i32) },
            |_| TaskPhase::Error,
            &fast(5),
            &CancellationToken::new(),
        )
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.last, Some(-1));
        assert!(matches!(failure.error, Error::TaskIncomplete(_)));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let policy = PollPolicy::new(3).with_retry_interval(Duration::from_secs(60));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = wait_for_completion(|| async { Ok(1u32) }, phase, &policy, &cancel).await;

        let failure = result.unwrap_err();
        assert!(matches!(failure.error, Error::Cancelled(_)));
        assert_eq!(failure.last, Some(1));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_last_task() {
        let fetches = Arc::new(AtomicU32::new(0));
        let counter = fetches.clone();

        let result = wait_for_completion(
            move || {
                let count = counter.clone();
                async move {
                    if count.fetch_add(1, Ordering::SeqCst) == 0 {
                        Ok(42u32)
                    } else {
                        Err(Error::Network("connection reset".to_string()))
                    }
                }
            },
            phase,
            &fast(3),
            &CancellationToken::new(),
        )
        .await;

        let failure = result.unwrap_err();
        assert!(matches!(failure.error, Error::Network(_)));
        assert_eq!(failure.last, Some(42));
    }
}
