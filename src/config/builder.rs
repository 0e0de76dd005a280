// self
use crate::{
	_prelude::*,
	cache::CachePolicy,
	config::ClientConfig,
	error::ConfigError,
	http,
	pipeline,
	retry::RetryPolicy,
	store::{StorageKind, TokenStore},
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL that relative request paths are resolved against.
	pub base_url: Url,
	/// Per-attempt transport timeout.
	pub timeout: Duration,
	/// Whether `GET` responses are cached.
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
	/// Headers attached to every request.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with `base_url` and default settings.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			cache_enabled: true,
			cache_policy: CachePolicy::unbounded(),
			retry: RetryPolicy::default(),
			storage: StorageKind::default(),
			token_key: TokenStore::DEFAULT_KEY.into(),
			client_name: ClientConfig::DEFAULT_CLIENT_NAME.into(),
			default_headers: BTreeMap::new(),
		}
	}

	/// Sets the per-attempt timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Enables or disables response caching.
	pub fn cache(mut self, enabled: bool) -> Self {
		self.cache_enabled = enabled;

		self
	}

	/// Overrides the cache bounds.
	pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
		self.cache_policy = policy;

		self
	}

	/// Sets the maximum number of retries.
	pub fn retry_count(mut self, max_retries: u32) -> Self {
		self.retry.max_retries = max_retries;

		self
	}

	/// Overrides the backoff base delay and cap.
	pub fn retry_delays(mut self, base: Duration, cap: Duration) -> Self {
		self.retry.base_delay = base;
		self.retry.max_delay = cap;

		self
	}

	/// Selects the token backend.
	pub fn storage(mut self, kind: StorageKind) -> Self {
		self.storage = kind;

		self
	}

	/// Overrides the token key.
	pub fn token_key(mut self, key: impl Into<String>) -> Self {
		self.token_key = key.into();

		self
	}

	/// Overrides the client-identifier header value.
	pub fn client_name(mut self, name: impl Into<String>) -> Self {
		self.client_name = name.into();

		self
	}

	/// Adds a header sent with every request.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: self.base_url.into() });
		}

		let storage = self.storage.ensure_supported()?;
		let (base, cap) = (self.retry.base_delay, self.retry.max_delay);

		if base.is_negative() || base > cap {
			return Err(ConfigError::InvalidRetryDelays { base, cap });
		}

		http::validate_header(pipeline::CLIENT_NAME_HEADER, &self.client_name)?;

		for (name, value) in &self.default_headers {
			http::validate_header(name, value)?;
		}

		Ok(ClientConfig {
			base_url: self.base_url,
			timeout: self.timeout,
			cache_enabled: self.cache_enabled,
			cache_policy: self.cache_policy,
			retry: self.retry,
			storage,
			token_key: self.token_key,
			client_name: self.client_name,
			default_headers: self.default_headers,
		})
	}
}
