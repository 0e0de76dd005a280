//! Optional observability helpers for client requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to wrap each client call in a span named
//!   `bearer_http.request` with `method` and `stage` fields, and to emit events for interceptor
//!   steps, retries, token invalidation, and error classification.
//! - Enable `metrics` to increment the `bearer_http_request_total` counter for every
//!   attempt/success/failure/cache hit, labeled by `method` + `outcome`, and the
//!   `bearer_http_retry_total` counter labeled by `status`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each client call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a verb method.
	Attempt,
	/// Response served from the cache without a transport call.
	CacheHit,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::CacheHit => "cache_hit",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
