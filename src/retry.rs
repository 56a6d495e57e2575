//! Retry policy for the transport layer.
//!
//! [`RetryPolicy`] controls how transient failures (retryable HTTP statuses,
//! connection errors, attempt timeouts) are retried with exponential backoff.
//! The delays are deterministic: attempt `k` (0-indexed) waits
//! `backoff_base * 2^k` before the `k+1`-th retry, so retry timing can be
//! asserted exactly in tests.

use std::time::Duration;

/// HTTP status codes retried by default.
pub const DEFAULT_RETRY_STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Default backoff base between retries.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Configuration for transport-level retry with exponential backoff.
///
/// A policy with `max_attempts = n` allows at most `n + 1` physical attempts
/// for one logical request: the initial try plus `n` retries.
///
/// # Example
///
/// ```
/// use diffio::retry::RetryPolicy;
///
/// // No retry (the default).
/// let none = RetryPolicy::none();
/// assert_eq!(none.max_attempts, 0);
///
/// // 3 retries with 500ms, 1s, 2s waits in between.
/// let standard = RetryPolicy::standard();
/// assert_eq!(standard.max_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries beyond the first attempt. Default: 0.
    pub max_attempts: u32,

    /// Base delay; doubled for each subsequent retry. Default: 500ms.
    pub backoff_base: Duration,

    /// HTTP status codes that trigger a retry.
    /// Default: `[408, 429, 500, 502, 503, 504]`.
    pub retryable_status_codes: Vec<u16>,
}

impl RetryPolicy {
    /// No retry. Failing attempts surface immediately.
    ///
    /// This is the default: generation creation is not guaranteed
    /// idempotent by the API, so retries are opt-in.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            backoff_base: DEFAULT_RETRY_BACKOFF,
            retryable_status_codes: DEFAULT_RETRY_STATUS_CODES.to_vec(),
        }
    }

    /// Sensible defaults for flaky networks: 3 retries, 500ms base.
    pub fn standard() -> Self {
        Self {
            max_attempts: 3,
            ..Self::none()
        }
    }

    /// Set the number of retries.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff base.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Replace the retryable status code set.
    pub fn with_retryable_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retryable_status_codes = codes;
        self
    }

    /// Whether a response status should be retried under this policy.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// The delay before the retry that follows attempt N (0-indexed):
    /// `backoff_base * 2^attempt`, saturating instead of overflowing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
