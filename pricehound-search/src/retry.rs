//! Attempt pacing and cancellation for marketplace requests.
//!
//! Every wait a source performs (pre-attempt jitter, backoff, the request
//! itself) goes through this module so a cancelled search stops promptly.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::types::Marketplace;

/// Pause inserted between marketplace attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause every time.
    Fixed(Duration),
    /// Uniformly random pause in `[min, max]`.
    Random {
        /// Shortest pause.
        min: Duration,
        /// Longest pause.
        max: Duration,
    },
}

impl Backoff {
    /// Fixed pause from milliseconds.
    pub fn fixed_ms(ms: u64) -> Self {
        Self::Fixed(Duration::from_millis(ms))
    }

    /// Random pause from a `(min, max)` millisecond range.
    pub fn random_ms((min, max): (u64, u64)) -> Self {
        Self::Random {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// The pause to use before the next attempt.
    pub fn delay(&self) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Random { min, max } if min >= max => min,
            Self::Random { min, max } => {
                let ms = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX))
            }
        }
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// # Errors
///
/// Returns [`SearchError::Cancelled`] if the token is cancelled before the
/// delay elapses.
pub async fn pause(
    cancel: &CancellationToken,
    marketplace: Marketplace,
    delay: Duration,
) -> Result<(), SearchError> {
    if delay.is_zero() {
        return check(cancel, marketplace);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(cancelled(marketplace)),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Drive `fut` to completion unless `cancel` fires first.
///
/// # Errors
///
/// Returns [`SearchError::Cancelled`] if the token is cancelled before the
/// future completes; the future is dropped.
pub async fn until_cancelled<F>(
    cancel: &CancellationToken,
    marketplace: Marketplace,
    fut: F,
) -> Result<F::Output, SearchError>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(cancelled(marketplace)),
        out = fut => Ok(out),
    }
}

/// Fail fast if the token is already cancelled.
pub fn check(cancel: &CancellationToken, marketplace: Marketplace) -> Result<(), SearchError> {
    if cancel.is_cancelled() {
        Err(cancelled(marketplace))
    } else {
        Ok(())
    }
}

fn cancelled(marketplace: Marketplace) -> SearchError {
    SearchError::Cancelled(format!("{marketplace} search was cancelled"))
}
