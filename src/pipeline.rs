//! Request/response interceptors and the retry loop wrapped around a transport.
//!
//! [`RequestPipeline::dispatch`] runs the request interceptor once, then executes the
//! descriptor until it succeeds, fails terminally, or exhausts the [`RetryPolicy`]. Retries
//! replay the intercepted descriptor verbatim, so the request id, the cache-busting stamp, and
//! the body bytes stay identical across attempts.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::ErrorClass,
	http::{CONTENT_TYPE, HttpTransport, RequestDescriptor, ResponseBody},
	obs,
	retry::RetryPolicy,
	store::{StoreError, TokenLookup, TokenOptions, TokenStore},
};

/// `authorization` header name.
pub const AUTHORIZATION: &str = "authorization";
/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Header carrying the client identifier.
pub const CLIENT_NAME_HEADER: &str = "x-client-name";
/// Query parameter appended when caching is disabled.
pub const CACHE_BUST_PARAM: &str = "_t";

/// Millisecond stamps that never repeat for one client.
#[derive(Debug, Default)]
pub struct CacheBuster {
	last: AtomicU64,
}
impl CacheBuster {
	/// Returns the current Unix time in milliseconds, bumped past the previous stamp when the
	/// clock has not advanced.
	pub fn next(&self) -> u64 {
		let now = u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
			.unwrap_or_default();
		let mut last = self.last.load(Ordering::Acquire);

		loop {
			let stamp = now.max(last + 1);

			match self.last.compare_exchange_weak(last, stamp, Ordering::AcqRel, Ordering::Acquire)
			{
				Ok(_) => return stamp,
				Err(current) => last = current,
			}
		}
	}
}

/// Interceptors plus retry orchestration over a shared transport and token store.
pub struct RequestPipeline<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<TokenStore>,
	retry: RetryPolicy,
	cache_enabled: bool,
	client_name: String,
	default_headers: BTreeMap<String, String>,
	buster: CacheBuster,
}
impl<T> RequestPipeline<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a pipeline configured from `config`.
	pub fn new(transport: Arc<T>, store: Arc<TokenStore>, config: &ClientConfig) -> Self {
		Self {
			transport,
			store,
			retry: config.retry.clone(),
			cache_enabled: config.cache_enabled,
			client_name: config.client_name.clone(),
			default_headers: config.default_headers.clone(),
			buster: CacheBuster::default(),
		}
	}

	/// Returns the retry policy.
	pub fn retry(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Returns the transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Returns the token store consulted on every request.
	pub fn store(&self) -> &Arc<TokenStore> {
		&self.store
	}

	/// Applies the request interceptor to `request`.
	///
	/// Default headers only fill names the caller left unset, while the interceptor-owned
	/// headers always overwrite. A token that is absent, unreadable, or not a valid header
	/// value leaves the request unauthenticated.
	pub async fn intercept_request(&self, request: &mut RequestDescriptor) -> Result<()> {
		for (name, value) in &self.default_headers {
			if request.header(name).is_none() {
				request.set_header(name, value.as_str())?;
			}
		}

		if !self.cache_enabled {
			let stamp = self.buster.next();

			request.url.query_pairs_mut().append_pair(CACHE_BUST_PARAM, &stamp.to_string());
		}
		if let Some(content_type) = &request.multipart {
			request.headers.insert(CONTENT_TYPE.into(), content_type.clone());
		}

		match self.store.get(&TokenOptions::default()).await {
			Ok(TokenLookup::Present(secret)) =>
				if let Err(e) = request.set_header(AUTHORIZATION, secret.bearer()) {
					obs::log_token_unavailable(&StoreError::Backend { message: e.to_string() });
				},
			Ok(TokenLookup::Absent) => {},
			Ok(TokenLookup::Unavailable(e)) | Err(e) => obs::log_token_unavailable(&e),
		}

		let request_id = URL_SAFE_NO_PAD.encode(rand::random::<[u8; 16]>());

		request.set_header(REQUEST_ID_HEADER, request_id)?;
		request.set_header(CLIENT_NAME_HEADER, self.client_name.as_str())?;

		Ok(())
	}

	/// Intercepts and executes `request`, retrying while the policy allows.
	///
	/// Non-2xx responses become [`Error::Status`]; transport failures become
	/// [`Error::Transport`] and are never retried.
	pub async fn dispatch(&self, mut request: RequestDescriptor) -> Result<ResponseBody> {
		self.intercept_request(&mut request).await?;

		loop {
			obs::log_request(&request);

			let response = match self.transport.execute(&request).await {
				Ok(response) => response,
				Err(e) => {
					obs::log_failure(&request, None, ErrorClass::from_status(None));

					return Err(e.into());
				},
			};

			if response.is_success() {
				obs::log_response(&request, response.status, &response.body);

				return Ok(response.body);
			}

			let status = response.status;

			if status == 401 {
				self.invalidate_token().await;
			}
			if self.retry.should_retry(request.attempt, Some(status)) {
				request.attempt += 1;

				let delay = self.retry.delay_for(request.attempt);

				obs::log_retry(&request, status, delay);
				obs::record_retry(status);
				tokio::time::sleep(delay.unsigned_abs()).await;

				continue;
			}

			obs::log_failure(&request, Some(status), ErrorClass::from_status(Some(status)));

			return Err(Error::Status { status, body: response.body });
		}
	}

	async fn invalidate_token(&self) {
		let result = self.store.remove(&TokenOptions::default()).await;

		obs::log_token_invalidated(result.as_ref().map(|_| ()));
	}
}
impl<T> Debug for RequestPipeline<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline")
			.field("retry", &self.retry)
			.field("cache_enabled", &self.cache_enabled)
			.field("client_name", &self.client_name)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedReply, ScriptedTransport},
		http::{Method, MultipartForm, RequestBody},
		store::{StorageKind, SyncKv},
	};

	struct UnreadableKv;
	impl SyncKv for UnreadableKv {
		fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
			Err(StoreError::Backend { message: "disk unreadable".into() })
		}

		fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "disk full".into() })
		}

		fn remove(&self, _key: &str) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "disk read-only".into() })
		}
	}

	fn config(cache: bool, retries: u32) -> ClientConfig {
		let base = Url::parse("https://api.example.com").expect("Fixture URL should parse.");

		ClientConfig::builder(base)
			.cache(cache)
			.retry_count(retries)
			.storage(StorageKind::Memory)
			.build()
			.expect("Fixture config should be valid.")
	}

	fn pipeline(
		config: &ClientConfig,
		replies: Vec<ScriptedReply>,
	) -> (RequestPipeline<ScriptedTransport>, Arc<ScriptedTransport>, Arc<TokenStore>) {
		let transport = Arc::new(ScriptedTransport::new(replies));
		let store = Arc::new(
			TokenStore::new(config.storage, &config.token_key).expect("Memory kind is supported."),
		);

		(RequestPipeline::new(transport.clone(), store.clone(), config), transport, store)
	}

	fn get(path: &str) -> RequestDescriptor {
		let url = Url::parse("https://api.example.com")
			.and_then(|base| base.join(path))
			.expect("Fixture path should join.");

		RequestDescriptor::new(Method::Get, url)
	}

	#[test]
	fn cache_buster_never_repeats() {
		let buster = CacheBuster::default();
		let stamps = (0..1_000).map(|_| buster.next()).collect::<Vec<_>>();

		assert!(stamps.windows(2).all(|w| w[0] < w[1]));
	}

	#[tokio::test]
	async fn interceptor_attaches_metadata_and_token() {
		let config = config(true, 3);
		let (pipeline, _, store) = pipeline(&config, Vec::new());
		let form = MultipartForm::new().text("k", "v");
		let expected_type = form.content_type();
		let mut request = get("/upload").with_body(RequestBody::Multipart(form));

		request.headers.insert(CONTENT_TYPE.into(), "application/json".into());
		store.set("abc", &TokenOptions::default()).await.expect("Memory set should succeed.");
		pipeline.intercept_request(&mut request).await.expect("Interceptor should succeed.");

		assert_eq!(request.header(AUTHORIZATION), Some("Bearer abc"));
		assert_eq!(request.header(CLIENT_NAME_HEADER), Some("bearer-http"));
		assert_eq!(request.header(CONTENT_TYPE), Some(expected_type.as_str()));
		assert_eq!(request.header(REQUEST_ID_HEADER).map(str::len), Some(22));
		assert_eq!(request.query_param(CACHE_BUST_PARAM), None);
	}

	#[tokio::test]
	async fn interceptor_busts_cache_and_skips_missing_token() {
		let config = config(false, 3);
		let (pipeline, _, _) = pipeline(&config, Vec::new());
		let mut first = get("/users?page=1");
		let mut second = get("/users?page=1");

		pipeline.intercept_request(&mut first).await.expect("Interceptor should succeed.");
		pipeline.intercept_request(&mut second).await.expect("Interceptor should succeed.");

		assert_eq!(first.header(AUTHORIZATION), None);
		assert_eq!(first.query_param("page").as_deref(), Some("1"));
		assert_ne!(first.query_param(CACHE_BUST_PARAM), second.query_param(CACHE_BUST_PARAM));
		assert_ne!(first.header(REQUEST_ID_HEADER), second.header(REQUEST_ID_HEADER));
	}

	#[tokio::test(start_paused = true)]
	async fn retries_replay_the_same_descriptor() {
		let config = config(true, 3);
		let (pipeline, transport, _) = pipeline(
			&config,
			vec![ScriptedReply::Status(503, ""), ScriptedReply::Status(200, "{\"ok\":true}")],
		);
		let body = pipeline.dispatch(get("/items")).await.expect("Second attempt should succeed.");
		let observed = transport.observed();

		assert_eq!(body.text(), "{\"ok\":true}");
		assert_eq!(observed.len(), 2);
		assert_eq!(
			observed[0].request.header(REQUEST_ID_HEADER),
			observed[1].request.header(REQUEST_ID_HEADER)
		);
		assert_eq!(observed[0].request.url, observed[1].request.url);
		assert_eq!((observed[0].request.attempt, observed[1].request.attempt), (0, 1));
		assert!(observed[1].at - observed[0].at >= std::time::Duration::from_millis(2_000));
	}

	#[tokio::test]
	async fn unauthorized_removes_token_without_retry() {
		let config = config(true, 3);
		let (pipeline, transport, store) =
			pipeline(&config, vec![ScriptedReply::Status(401, "denied")]);

		store.set("stale", &TokenOptions::default()).await.expect("Memory set should succeed.");

		let err = pipeline.dispatch(get("/me")).await.expect_err("401 should surface.");

		assert_eq!(err.status(), Some(401));
		assert_eq!(transport.observed().len(), 1);
		assert_eq!(
			store.get(&TokenOptions::default()).await.expect("Memory get should succeed."),
			TokenLookup::Absent
		);
	}

	#[tokio::test]
	async fn transport_failures_are_not_retried() {
		let config = config(true, 3);
		let (pipeline, transport, _) = pipeline(&config, vec![ScriptedReply::Offline]);
		let err = pipeline.dispatch(get("/health")).await.expect_err("Offline should surface.");

		assert!(matches!(err, Error::Transport(_)));
		assert_eq!(transport.observed().len(), 1);
	}

	#[tokio::test]
	async fn unreadable_token_sends_request_unauthenticated() {
		let config = config(true, 3);
		let transport = Arc::new(ScriptedTransport::new([ScriptedReply::Status(200, "[]")]));
		let store = Arc::new(
			TokenStore::new(StorageKind::Local, &config.token_key)
				.expect("Local kind is supported.")
				.with_local(Arc::new(UnreadableKv)),
		);
		let pipeline = RequestPipeline::new(transport.clone(), store, &config);
		let body = pipeline.dispatch(get("/feed")).await.expect("Request should still be sent.");
		let observed = transport.observed();

		assert_eq!(body.text(), "[]");
		assert_eq!(observed.len(), 1);
		assert_eq!(observed[0].request.header(AUTHORIZATION), None);
		assert!(observed[0].request.header(REQUEST_ID_HEADER).is_some());
	}

	#[tokio::test]
	async fn token_unusable_as_header_sends_request_unauthenticated() {
		let config = config(true, 3);
		let (pipeline, transport, store) =
			pipeline(&config, vec![ScriptedReply::Status(200, "{}")]);

		store.set("abc\n", &TokenOptions::default()).await.expect("Memory set should succeed.");

		let body = pipeline.dispatch(get("/me")).await.expect("Request should still be sent.");
		let observed = transport.observed();

		assert_eq!(body.text(), "{}");
		assert_eq!(observed.len(), 1);
		assert_eq!(observed[0].request.header(AUTHORIZATION), None);
	}
}
