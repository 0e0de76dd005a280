// self
use crate::{
	_prelude::*,
	cache::CacheKey,
	error::ErrorClass,
	http::{Method, RequestDescriptor, ResponseBody},
	store::{StorageKind, StoreError},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by client calls.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the provided method + stage.
	pub fn new(method: Method, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_http.request", method = method.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a request leaving the pipeline.
pub fn log_request(request: &RequestDescriptor) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			method = request.method.as_str(),
			url = %request.url,
			attempt = request.attempt,
			authenticated = request.headers.contains_key("authorization"),
			"sending request"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = request;
	}
}

/// Logs a successful response.
pub fn log_response(request: &RequestDescriptor, status: u16, body: &ResponseBody) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			method = request.method.as_str(),
			url = %request.url,
			status,
			body = %body.preview(),
			"request succeeded"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (request, status, body);
	}
}

/// Logs a `GET` served from the response cache.
pub fn log_cache_hit(key: &CacheKey) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(key = key.as_str(), "served from cache");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = key;
	}
}

/// Logs a scheduled retry.
pub fn log_retry(request: &RequestDescriptor, status: u16, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			method = request.method.as_str(),
			url = %request.url,
			status,
			attempt = request.attempt,
			delay_ms = delay.whole_milliseconds() as u64,
			"retrying request"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (request, status, delay);
	}
}

/// Logs a terminal failure with its human-readable classification.
pub fn log_failure(request: &RequestDescriptor, status: Option<u16>, class: ErrorClass) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(
			method = request.method.as_str(),
			url = %request.url,
			status,
			"{class}"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (request, status, class);
	}
}

/// Logs a token lookup that fell back to an unauthenticated request.
pub fn log_token_unavailable(err: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %err, "token unavailable; sending request unauthenticated");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = err;
	}
}

/// Logs the outcome of token invalidation after an unauthorized response.
pub fn log_token_invalidated(result: std::result::Result<(), &StoreError>) {
	#[cfg(feature = "tracing")]
	{
		match result {
			Ok(()) => tracing::info!("token invalidated after unauthorized response"),
			Err(err) => tracing::warn!(error = %err, "token invalidation failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = result;
	}
}

/// Logs a token store operation that failed.
pub fn log_store_failure(operation: &'static str, kind: StorageKind, err: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			operation,
			backend = kind.as_str(),
			error = %err,
			"token store operation failed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, kind, err);
	}
}
