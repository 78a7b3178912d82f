//! Retry executor - run a store operation until it succeeds

use std::future::Future;

use contracts::ContractError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::backoff::ExpBackoff;
use crate::error::DispatcherError;

/// Invoke `task` until it succeeds
///
/// Each failure is logged with `task_name` and the computed wait, then the
/// executor sleeps for the next backoff delay. There is no attempt limit:
/// store errors never reach the caller. On success the backoff is reset.
///
/// # Errors
/// Only `DispatcherError::Cancelled`, once `cancel` fires before an attempt
/// or while waiting between attempts.
pub async fn retry_until_complete<T, F, Fut>(
    mut task: F,
    task_name: &str,
    backoff: &mut ExpBackoff,
    cancel: &CancellationToken,
) -> Result<T, DispatcherError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ContractError>>,
{
    let mut attempt: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(DispatcherError::cancelled(task_name));
        }
        attempt += 1;

        match task().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(task = task_name, attempts = attempt, "Task completed after retries");
                }
                backoff.reset();
                return Ok(value);
            }
            Err(e) => {
                let wait = backoff.next_delay();
                error!(
                    task = task_name,
                    attempt,
                    error = %e,
                    wait_ms = wait.as_millis() as u64,
                    "Could not perform task, waiting before retry"
                );

                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(DispatcherError::cancelled(task_name));
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn backoff() -> ExpBackoff {
        ExpBackoff::new(Duration::from_millis(100), Duration::from_secs(300))
    }

    fn store_down() -> ContractError {
        ContractError::store_write("test", "store unavailable")
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();
        let mut backoff = backoff();
        let start = Instant::now();

        let value = retry_until_complete(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ContractError>("done")
            },
            "test",
            &mut backoff,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_n_times_then_succeeds() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();
        let mut backoff = backoff();
        let start = Instant::now();

        let value = retry_until_complete(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= 3 {
                    Err(store_down())
                } else {
                    Ok(n)
                }
            },
            "test",
            &mut backoff,
            &cancel,
        )
        .await
        .unwrap();

        // 3 failures -> 4 invocations, sleeps of 100 + 200 + 400 ms
        assert_eq!(value, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(720), "elapsed {elapsed:?}");

        // reset on success
        assert_eq!(backoff.current(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_never_returns() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();
        let mut backoff = backoff();

        let outcome = tokio::time::timeout(
            Duration::from_secs(3600),
            retry_until_complete(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(store_down())
                },
                "test",
                &mut backoff,
                &cancel,
            ),
        )
        .await;

        assert!(outcome.is_err(), "retry loop returned");
        assert!(calls.load(Ordering::SeqCst) > 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_call_count_cutoff() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();
        let token = &cancel;
        let mut backoff = backoff();

        let result = retry_until_complete(
            move || {
                if calls.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
                    token.cancel();
                }
                async { Err::<(), _>(store_down()) }
            },
            "series insert",
            &mut backoff,
            &cancel,
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("series insert"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_pre_cancelled_skips_attempt() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut backoff = backoff();

        let result = retry_until_complete(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ContractError>(())
            },
            "test",
            &mut backoff,
            &cancel,
        )
        .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
