//! Public HTTP client facade.
//!
//! [`HttpClient`] resolves paths against the configured base URL, serves cacheable `GET`s from
//! the [`ResponseCache`], and pushes everything else through the single-flight
//! [`RequestQueue`] into the [`RequestPipeline`]. Token management delegates to the shared
//! [`TokenStore`].

// self
use crate::{
	_prelude::*,
	cache::{CacheKey, ResponseCache},
	config::ClientConfig,
	http::{
		self, FilePart, HttpTransport, Method, MultipartForm, RequestBody, RequestDescriptor,
		ResponseBody,
	},
	obs::{self, RequestOutcome, RequestSpan},
	pipeline::{self, RequestPipeline},
	queue::RequestQueue,
	store::{StorageKind, TokenLookup, TokenOptions, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestHttpClient = HttpClient<ReqwestTransport>;

/// Per-call query parameters and headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Query parameters, appended in key order.
	pub query: BTreeMap<String, String>,
	/// Extra headers; they take precedence over configured default headers.
	pub headers: BTreeMap<String, String>,
}
impl RequestOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(name.into(), value.into());

		self
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}
}

/// Async HTTP client with bearer-token injection, response caching, and bounded retries.
///
/// Clones share the configuration, token store, cache, and queue, so every clone observes the
/// same tokens and the same FIFO ordering.
pub struct HttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: Arc<ClientConfig>,
	pipeline: Arc<RequestPipeline<T>>,
	store: Arc<TokenStore>,
	cache: Arc<ResponseCache>,
	queue: Arc<RequestQueue>,
}
impl<T> HttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over caller-provided parts.
	///
	/// `config.storage` becomes the active backend of `store`. `config.token_key` is not applied:
	/// tokens are read and written under the default key `store` was built with.
	pub fn with_parts(
		config: ClientConfig,
		store: Arc<TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		store.set_active_kind(config.storage)?;

		let pipeline = RequestPipeline::new(transport.into(), store.clone(), &config);
		let cache = ResponseCache::new(config.cache_policy.clone());

		Ok(Self {
			config: Arc::new(config),
			pipeline: Arc::new(pipeline),
			store,
			cache: Arc::new(cache),
			queue: Default::default(),
		})
	}

	/// Creates a client over `transport` with in-process token backends.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Result<Self> {
		let store = TokenStore::new(config.storage, &config.token_key)?;

		Self::with_parts(config, Arc::new(store), transport)
	}

	/// Issues a `GET`, serving it from the cache when caching is enabled.
	pub async fn get(&self, path: &str, options: RequestOptions) -> Result<ResponseBody> {
		self.send(Method::Get, "get", path, RequestBody::Empty, options).await
	}

	/// Issues a `POST` with `body`.
	pub async fn post(
		&self,
		path: &str,
		body: RequestBody,
		options: RequestOptions,
	) -> Result<ResponseBody> {
		self.send(Method::Post, "post", path, body, options).await
	}

	/// Issues a `PUT` with `body`.
	pub async fn put(
		&self,
		path: &str,
		body: RequestBody,
		options: RequestOptions,
	) -> Result<ResponseBody> {
		self.send(Method::Put, "put", path, body, options).await
	}

	/// Issues a `DELETE`.
	pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<ResponseBody> {
		self.send(Method::Delete, "delete", path, RequestBody::Empty, options).await
	}

	/// Posts `file` as multipart form data along with `extra_fields` as text parts.
	pub async fn upload(
		&self,
		path: &str,
		file: FilePart,
		extra_fields: BTreeMap<String, String>,
	) -> Result<ResponseBody> {
		let form = extra_fields
			.into_iter()
			.fold(MultipartForm::new(), |form, (name, value)| form.text(name, value))
			.file(file);

		let body = RequestBody::Multipart(form);

		self.send(Method::Post, "upload", path, body, RequestOptions::new()).await
	}

	/// Stores `value` as the bearer token.
	///
	/// When `kind` is given the token is written to that backend, which becomes the active one
	/// only after the write succeeds. Values that cannot appear in an `authorization` header are
	/// rejected.
	pub async fn save_token(&self, value: &str, kind: Option<StorageKind>) -> Result<()> {
		http::validate_header(pipeline::AUTHORIZATION, value)?;

		let kind = kind.map(StorageKind::ensure_supported).transpose()?;
		let options = TokenOptions { kind, ..Default::default() };

		self.store.set(value, &options).await?;

		if let Some(kind) = kind {
			self.store.set_active_kind(kind)?;
		}

		Ok(())
	}

	/// Deletes the bearer token from the active backend.
	pub async fn remove_token(&self) -> Result<()> {
		self.store.remove(&TokenOptions::default()).await?;

		Ok(())
	}

	/// Switches the active token backend without migrating the stored token.
	pub fn set_token_storage_backend(&self, kind: StorageKind) -> Result<()> {
		self.store.set_active_kind(kind)?;

		Ok(())
	}

	/// Reads the bearer token from the active backend.
	pub async fn token(&self) -> Result<TokenLookup> {
		Ok(self.store.get(&TokenOptions::default()).await?)
	}

	/// Drops every cached response.
	pub fn clear_cache(&self) {
		self.cache.clear();
	}

	/// Returns the validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the token store.
	pub fn token_store(&self) -> &Arc<TokenStore> {
		&self.store
	}

	/// Returns the response cache.
	pub fn cache(&self) -> &ResponseCache {
		&self.cache
	}

	/// Returns the request queue.
	pub fn queue(&self) -> &RequestQueue {
		&self.queue
	}

	async fn send(
		&self,
		method: Method,
		stage: &'static str,
		path: &str,
		body: RequestBody,
		options: RequestOptions,
	) -> Result<ResponseBody> {
		let span = RequestSpan::new(method, stage);

		span.instrument(async move {
			obs::record_request_outcome(method, RequestOutcome::Attempt);

			match self.execute(method, path, body, options).await {
				Ok((body, outcome)) => {
					obs::record_request_outcome(method, outcome);

					Ok(body)
				},
				Err(e) => {
					obs::record_request_outcome(method, RequestOutcome::Failure);

					Err(e)
				},
			}
		})
		.await
	}

	async fn execute(
		&self,
		method: Method,
		path: &str,
		body: RequestBody,
		options: RequestOptions,
	) -> Result<(ResponseBody, RequestOutcome)> {
		let cache_key = if method == Method::Get && self.config.cache_enabled {
			Some(CacheKey::new(&self.config.resolve(path)?, &options.query))
		} else {
			None
		};

		if let Some(key) = &cache_key
			&& let Some(body) = self.cache.read(key)
		{
			obs::log_cache_hit(key);

			return Ok((body, RequestOutcome::CacheHit));
		}

		let url = self.config.endpoint(path, &options.query)?;
		let mut request = RequestDescriptor::new(method, url).with_body(body);

		for (name, value) in options.headers {
			request.set_header(name, value)?;
		}

		let pipeline = self.pipeline.clone();
		let cache = self.cache.clone();

		self.queue
			.enqueue(move || async move {
				// An identical GET queued ahead of this one may have filled the cache.
				if let Some(key) = &cache_key
					&& let Some(body) = cache.read(key)
				{
					obs::log_cache_hit(key);

					return Ok((body, RequestOutcome::CacheHit));
				}

				let body = pipeline.dispatch(request).await?;

				if let Some(key) = cache_key {
					cache.write(key, body.clone());
				}

				Ok((body, RequestOutcome::Success))
			})
			.await
	}
}
#[cfg(feature = "reqwest")]
impl HttpClient<ReqwestTransport> {
	/// Creates a reqwest-backed client with in-process token backends.
	///
	/// The configured timeout bounds every attempt separately.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Self::with_transport(config, transport)
	}
}
impl<T> Clone for HttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			pipeline: self.pipeline.clone(),
			store: self.store.clone(),
			cache: self.cache.clone(),
			queue: self.queue.clone(),
		}
	}
}
impl<T> Debug for HttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("store", &self.store)
			.field("cached", &self.cache.len())
			.field("pending", &self.queue.pending())
			.finish()
	}
}
