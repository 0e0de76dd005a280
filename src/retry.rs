//! Retry decisions and exponential backoff for failed requests.

// self
use crate::_prelude::*;

/// Decides whether a failed attempt is retried and how long to wait first.
///
/// Only HTTP 500 and 503 qualify. Failures without a response (DNS, TCP, TLS, timeouts) are
/// never retried, and neither is any other status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum number of retries after the initial attempt.
	pub max_retries: u32,
	/// Delay unit doubled on every retry.
	pub base_delay: Duration,
	/// Upper bound for any single delay.
	pub max_delay: Duration,
}
impl RetryPolicy {
	/// Default maximum number of retries.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default delay unit.
	pub const DEFAULT_BASE_DELAY: Duration = Duration::milliseconds(1_000);
	/// Default delay cap.
	pub const DEFAULT_MAX_DELAY: Duration = Duration::milliseconds(10_000);
	/// Statuses eligible for retry.
	pub const RETRYABLE_STATUSES: [u16; 2] = [500, 503];

	/// Creates a policy allowing `max_retries` retries with the default delays.
	pub fn new(max_retries: u32) -> Self {
		Self { max_retries, ..Default::default() }
	}

	/// Returns `true` when another attempt should follow a failure with `status`, given that
	/// `attempt` retries have already been issued.
	pub fn should_retry(&self, attempt: u32, status: Option<u16>) -> bool {
		attempt < self.max_retries
			&& status.is_some_and(|status| Self::RETRYABLE_STATUSES.contains(&status))
	}

	/// Returns `min(base * 2^attempt, cap)`; the first retry passes `attempt = 1`.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let factor = 1_u32.checked_shl(attempt).and_then(|f| i32::try_from(f).ok());

		factor
			.and_then(|f| self.base_delay.checked_mul(f))
			.map_or(self.max_delay, |delay| delay.min(self.max_delay))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: Self::DEFAULT_MAX_RETRIES,
			base_delay: Self::DEFAULT_BASE_DELAY,
			max_delay: Self::DEFAULT_MAX_DELAY,
		}
	}
}
