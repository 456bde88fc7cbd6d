//! Bounded waiting policies.
//!
//! Every wait in the engine is bounded by an explicit policy value rather
//! than hard-coded sleeps, so callers configure it and tests can shorten it
//! or run it under paused tokio time.
//!
//! - [`WaitPolicy`] - fixed interval with a maximum number of attempts, used
//!   for re-querying a listing that did not render
//! - [`DownloadPolicy`] - fixed poll interval under a wall-clock budget, used
//!   for confirming a download batch

use std::time::Duration;

use tokio::time::Instant;

/// Default attempts when a listing comes back empty.
pub const DEFAULT_LISTING_ATTEMPTS: u32 = 5;

/// Default pause between listing attempts.
pub const DEFAULT_LISTING_INTERVAL: Duration = Duration::from_millis(300);

/// Default wall-clock budget for one download batch.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default pause between download directory inspections.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Retry a check a bounded number of times with a fixed pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    interval: Duration,
    max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_LISTING_INTERVAL,
            max_attempts: DEFAULT_LISTING_ATTEMPTS,
        }
    }
}

impl WaitPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Policy that tries once and never sleeps.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, 1)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt is allowed after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Sleeps for one interval.
    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Polling budget for one download batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadPolicy {
    batch_timeout: Duration,
    poll_interval: Duration,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DownloadPolicy {
    /// Creates a policy. A zero poll interval is raised to 1ms.
    #[must_use]
    pub fn new(batch_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            batch_timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    #[must_use]
    pub fn batch_timeout(&self) -> Duration {
        self.batch_timeout
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Deadline for a batch whose triggers finished now.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.batch_timeout
    }

    /// Sleeps one poll interval, never past `deadline`.
    ///
    /// Returns `false` once the deadline has passed.
    pub async fn tick(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        true
    }
}
