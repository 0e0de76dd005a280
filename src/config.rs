//! Validated client configuration and request URL resolution.
//!
//! A [`ClientConfig`] is only obtainable through [`ClientConfigBuilder::build`], so every
//! instance carries a usable base URL, a supported storage kind, and well-ordered retry delays.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	cache::CachePolicy,
	error::ConfigError,
	retry::RetryPolicy,
	store::StorageKind,
};

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL that relative request paths are resolved against.
	pub base_url: Url,
	/// Per-attempt transport timeout.
	pub timeout: Duration,
	/// Whether `GET` responses are cached; when disabled every request carries a
	/// cache-busting query parameter.
	pub cache_enabled: bool,
	/// Bounds applied to the response cache.
	pub cache_policy: CachePolicy,
	/// Retry limit and backoff delays.
	pub retry: RetryPolicy,
	/// Token backend active at construction.
	pub storage: StorageKind,
	/// Key under which the token is stored.
	pub token_key: String,
	/// Value of the client-identifier header.
	pub client_name: String,
	/// Headers attached to every request, keyed by lower-case name.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfig {
	/// Default per-attempt timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::milliseconds(30_000);
	/// Default client-identifier header value.
	pub const DEFAULT_CLIENT_NAME: &'static str = "bearer-http";

	/// Creates a new builder for `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `path` into a request URL without query parameters.
	///
	/// Absolute `http`/`https` URLs are used as-is; anything else is appended to the base URL
	/// with exactly one `/` between them.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		if let Ok(url) = Url::parse(path)
			&& matches!(url.scheme(), "http" | "https")
		{
			return Ok(url);
		}

		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Resolves `path` and appends `query` in key order.
	pub fn endpoint(
		&self,
		path: &str,
		query: &BTreeMap<String, String>,
	) -> Result<Url, ConfigError> {
		let mut url = self.resolve(path)?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}
}
