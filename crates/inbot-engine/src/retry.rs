//! Bounded retries with exponential backoff and jitter.
//!
//! Only errors reporting themselves as [`Transient`] are retried; everything else
//! is returned on the first failure.

use crate::backend::Backend;
use crate::error::Transient;
use futures::future::BoxFuture;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff before attempt `attempt + 1` (zero-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let spread = backoff.as_millis() as u64 / 2;
        if spread == 0 {
            return backoff;
        }
        let jitter = rand::thread_rng().gen_range(0..=spread);
        backoff + Duration::from_millis(jitter)
    }

    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        E: Transient + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut tried = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tried += 1;
                    if !err.is_transient() || tried >= attempts {
                        return Err(err);
                    }
                    let delay = self.delay_with_jitter(tried - 1);
                    tracing::debug!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        tried,
                        attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Like [`RetryPolicy::run`], for operations that need the page on every attempt.
    pub async fn run_on<B, T, E, F>(
        &self,
        operation: &str,
        backend: &mut B,
        mut attempt: F,
    ) -> Result<T, E>
    where
        B: Backend + ?Sized,
        E: Transient + Display,
        F: for<'b> FnMut(&'b mut B) -> BoxFuture<'b, Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut tried = 0;
        loop {
            match attempt(&mut *backend).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tried += 1;
                    if !err.is_transient() || tried >= attempts {
                        return Err(err);
                    }
                    let delay = self.delay_with_jitter(tried - 1);
                    tracing::debug!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        tried,
                        attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, BackendError> = instant(3)
            .run("flaky", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(BackendError::Timeout("slow".into()))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), BackendError> = instant(5)
            .run("missing", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::ElementNotFound("#x".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), BackendError> = instant(2)
            .run("always slow", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::Timeout("slow".into()))
            })
            .await;
        assert!(matches!(result, Err(BackendError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(30), Duration::from_millis(350));
    }
}
