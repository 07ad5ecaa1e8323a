//! Exponential backoff shared by the reader, the loader and the sync loop.
//!
//! Delays start at `base`, grow by `factor` on every attempt and stay at
//! `ceiling` once they reach it. The sequence never ends, so a transient
//! failure is retried until it clears.

use std::time::Duration;

use tokio_retry::{Action, RetryIf};
use tracing::warn;

/// Default first delay.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Default growth factor.
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;

/// Default delay ceiling.
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(10);

/// Parameters of the retry delay sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub factor: u32,
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            factor: DEFAULT_BACKOFF_FACTOR,
            ceiling: DEFAULT_BACKOFF_CEILING,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, factor: u32, ceiling: Duration) -> Self {
        Self {
            base,
            factor,
            ceiling,
        }
    }

    /// The unbounded delay sequence: `base`, `base * factor`, ... capped at `ceiling`.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next: self.base.min(self.ceiling),
            factor: self.factor.max(1),
            ceiling: self.ceiling,
        }
    }
}

/// Iterator over retry delays. Never returns `None`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    factor: u32,
    ceiling: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = self.next.saturating_mul(self.factor).min(self.ceiling);
        Some(current)
    }
}

/// Run `action` until it succeeds or fails with an error `is_transient` rejects.
///
/// Every transient failure is logged with the name of the operation and
/// retried after the next delay of `policy`.
pub async fn retry_transient<A, F>(
    policy: &BackoffPolicy,
    operation: &'static str,
    action: A,
    mut is_transient: F,
) -> Result<A::Item, A::Error>
where
    A: Action,
    A::Error: std::fmt::Display,
    F: FnMut(&A::Error) -> bool,
{
    RetryIf::start(policy.delays(), action, |error: &A::Error| {
        let retry = is_transient(error);
        if retry {
            warn!(operation, error = %error, "Transient failure, backing off");
        }
        retry
    })
    .await
}
