//! Retry loop shared by provider adapters.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::ports::LlmProviderError;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The wait before retry `k` is `k * step`.
    Linear {
        /// Unit step.
        step: Duration,
    },
    /// The same wait before every retry.
    Fixed {
        /// Constant delay.
        delay: Duration,
    },
}

impl Backoff {
    /// Wait before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self {
            Self::Linear { step } => step.saturating_mul(retry),
            Self::Fixed { delay } => *delay,
        }
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `retries + 1`.
    pub retries: u32,
    /// Delay schedule.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Linear one-second steps.
    #[must_use]
    pub fn linear(retries: u32) -> Self {
        Self {
            retries,
            backoff: Backoff::Linear {
                step: Duration::from_secs(1),
            },
        }
    }

    /// Fixed one-second delay.
    #[must_use]
    pub fn fixed(retries: u32) -> Self {
        Self {
            retries,
            backoff: Backoff::Fixed {
                delay: Duration::from_secs(1),
            },
        }
    }
}

/// Async sleep abstraction so tests can observe delays without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-backed sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `attempt` until it succeeds, fails permanently, exhausts the policy,
/// or `cancellation` fires.
///
/// `attempt` receives the 1-based attempt number. On success the number of
/// attempts made is returned alongside the value.
pub async fn run_with_retry<T, F, Fut>(
    provider: &str,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    cancellation: &CancellationToken,
    mut attempt: F,
) -> Result<(T, u32), LlmProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmProviderError>>,
{
    let total = policy.retries.saturating_add(1);
    let mut number = 1;
    loop {
        if cancellation.is_cancelled() {
            return Err(LlmProviderError::cancelled());
        }
        let outcome = tokio::select! {
            biased;
            () = cancellation.cancelled() => Err(LlmProviderError::cancelled()),
            result = attempt(number) => result,
        };
        let error = match outcome {
            Ok(value) => return Ok((value, number)),
            Err(error) => error,
        };
        if !error.is_retryable() || number >= total {
            return Err(error);
        }
        let delay = policy.backoff.delay_for(number);
        warn!(
            provider,
            attempt = number,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            %error,
            "retrying provider request"
        );
        tokio::select! {
            biased;
            () = cancellation.cancelled() => return Err(LlmProviderError::cancelled()),
            () = sleeper.sleep(delay) => {}
        }
        number += 1;
    }
}
