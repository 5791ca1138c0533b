//! Bounded retry with a configurable backoff policy.
//!
//! One helper for every retry site: store access and page recognition.
//! Whole-document failures are not retried here; the indexing loop picks
//! them up again next cycle.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry policy: attempt ceiling plus backoff shape.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub exponential: bool,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Fixed pacing delay between attempts.
    pub fn paced(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            exponential: false,
            max_delay: delay,
        }
    }

    /// Capped exponential backoff.
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            exponential: true,
            max_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.initial_delay;
        }
        let factor = 1u32 << attempt.min(16);
        (self.initial_delay * factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds or the attempt ceiling is reached.
///
/// Failures below the ceiling are logged and retried after the policy's
/// delay; the final failure is returned to the caller.
pub async fn with_retries<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("{} failed after {} attempts: {}", what, attempts, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::paced(3, Duration::from_millis(1));

        let result: Result<u32, String> = with_retries(&policy, "test op", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("not yet".to_string())
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_attempt_ceiling() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::paced(2, Duration::from_millis(1));

        let result: Result<(), String> = with_retries(&policy, "test op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("always".to_string())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy =
            RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(300));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for(4), Duration::from_millis(300));
    }
}
