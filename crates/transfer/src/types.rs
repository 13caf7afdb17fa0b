//! Public types for transfer operations.

use std::time::Duration;

use crate::error::TransferError;

/// Bounded retry policy for transient server replies during a chunked
/// download, with capped exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum consecutive transient failures before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent retry.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Calculates the delay for a given attempt number (1-based),
    /// with ±25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        self.delay_with_jitter(attempt, nanos)
    }

    fn delay_with_jitter(&self, attempt: u32, jitter_nanos: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        // Add ±25% jitter: nanos within the second map onto [-1.0, 1.0).
        let jitter = capped * 0.25;
        let offset = (jitter_nanos as f64 / 1_000_000_000.0) * 2.0 - 1.0;
        let with_jitter = (capped + jitter * offset).max(0.001);
        Duration::from_secs_f64(with_jitter)
    }
}

/// Events emitted by `Fetcher` and `Downloader`.
///
/// Bytes are cumulative for the operation at hand. Exactly one of
/// `Completed`/`Failed` is emitted per operation, as its final event.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// An operation started for a remote file.
    Started { remote_path: String },
    /// Bytes received so far by a chunked download.
    Progress { remote_path: String, bytes: u64 },
    /// A transient server reply triggered a retry.
    Retrying {
        remote_path: String,
        attempt: u32,
        code: u32,
    },
    /// An existing local file was renamed aside before a fetch.
    BackupCreated { target: String, backup: String },
    /// The operation finished; `bytes` is the final total.
    Completed { remote_path: String, bytes: u64 },
    /// The operation failed terminally.
    Failed { remote_path: String, error: String },
}

/// Per-file result of a batch fetch, in input order.
#[derive(Debug)]
pub struct FetchOutcome {
    pub remote_path: String,
    pub result: Result<(), TransferError>,
}
