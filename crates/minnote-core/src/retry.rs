//! Bounded retry with linear backoff for storage calls

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use minnote_storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Wait after the n-th failure is `n * backoff_step`
    pub backoff_step: Duration,
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError {
    /// Failure that retrying cannot fix
    Permanent(StorageError),
    /// Every attempt failed transiently
    Exhausted { attempts: u32, last: StorageError },
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts,
            backoff_step,
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        path: &Path,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = minnote_storage::Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(RetryError::Permanent(e)),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(
                        operation,
                        path = %path.display(),
                        attempts = attempt,
                        error = %e,
                        "Storage operation failed, retry budget exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.backoff_after(attempt);
                    tracing::warn!(
                        operation,
                        path = %path.display(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(100))
    }
}
