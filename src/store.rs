//! Token persistence contracts and the [`TokenStore`] facade over every backend kind.
//!
//! A [`TokenStore`] routes `set`/`get`/`remove` calls to one of the backends listed in
//! [`StorageKind`]. The synchronous backends implement [`SyncKv`], the durable backend
//! implements [`AsyncKv`], and the cookie backend is a [`CookieJarKv`] so cookie attributes can
//! be applied on write. Host-managed kinds have no implementation and fail with
//! [`StoreError::Unsupported`] instead of pretending to succeed.

pub mod cookie;
pub mod durable;
pub mod file;
pub mod memory;
pub mod secret;

pub use cookie::{CookieJarKv, CookieOptions};
pub use durable::DurableFileKv;
pub use file::FileKv;
pub use memory::MemoryKv;
pub use secret::TokenSecret;

// self
use crate::{_prelude::*, error::ConfigError, obs};

/// Boxed future returned by [`AsyncKv`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Synchronous string key-value primitive backing the memory, local, and session kinds.
pub trait SyncKv
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if present.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores or replaces the value under `key`.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Deletes the value under `key`; deleting a missing key succeeds.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Asynchronous string key-value primitive backing the durable kind.
pub trait AsyncKv
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores or replaces the value under `key`.
	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()>;

	/// Deletes the value under `key`; deleting a missing key succeeds.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Closed set of token storage backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
	/// Ephemeral in-process map, shareable between clients.
	Memory,
	/// Synchronous persistent key-value store.
	#[default]
	Local,
	/// Synchronous key-value store scoped to one client.
	Session,
	/// Cookie jar honoring expiry, secure, and same-site attributes.
	Cookie,
	/// Asynchronous durable key-value store.
	Durable,
	/// Host-managed server session; not implemented.
	ServerManaged,
	/// Host-managed HTTP-only cookie; not implemented.
	HttpOnlyCookie,
}
impl StorageKind {
	/// Every kind, placeholders included.
	pub const ALL: [Self; 7] = [
		Self::Memory,
		Self::Local,
		Self::Session,
		Self::Cookie,
		Self::Durable,
		Self::ServerManaged,
		Self::HttpOnlyCookie,
	];

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Memory => "memory",
			Self::Local => "local",
			Self::Session => "session",
			Self::Cookie => "cookie",
			Self::Durable => "durable",
			Self::ServerManaged => "server_managed",
			Self::HttpOnlyCookie => "http_only_cookie",
		}
	}

	/// Returns `true` for host-managed kinds that have no implementation.
	pub const fn is_placeholder(self) -> bool {
		matches!(self, Self::ServerManaged | Self::HttpOnlyCookie)
	}

	/// Rejects placeholder kinds.
	pub fn ensure_supported(self) -> Result<Self, ConfigError> {
		if self.is_placeholder() {
			return Err(ConfigError::UnsupportedStorage { kind: self });
		}

		Ok(self)
	}
}
impl Display for StorageKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for StorageKind {
	type Err = StoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| StoreError::Backend { message: format!("Unknown storage kind `{s}`") })
	}
}

/// Error type produced by token storage backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The selected backend kind has no implementation.
	#[error("Storage backend `{kind}` is not implemented.")]
	Unsupported {
		/// Rejected backend kind.
		kind: StorageKind,
	},
}

/// Per-call selection of backend, key, and cookie attributes.
#[derive(Clone, Debug, Default)]
pub struct TokenOptions {
	/// Backend override; `None` uses the store's active kind.
	pub kind: Option<StorageKind>,
	/// Key override; `None` uses the store's default key.
	pub key: Option<String>,
	/// Attributes applied when writing to the cookie backend.
	pub cookie: CookieOptions,
}
impl TokenOptions {
	/// Targets a specific backend kind.
	pub fn with_kind(mut self, kind: StorageKind) -> Self {
		self.kind = Some(kind);

		self
	}

	/// Targets a specific key.
	pub fn with_key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());

		self
	}

	/// Overrides the cookie attributes.
	pub fn with_cookie(mut self, cookie: CookieOptions) -> Self {
		self.cookie = cookie;

		self
	}
}

/// Outcome of a token read.
///
/// Backend failures are reported as [`TokenLookup::Unavailable`] rather than as errors so a
/// request can proceed unauthenticated while the degradation stays visible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenLookup {
	/// A token is stored under the key.
	Present(TokenSecret),
	/// No token is stored under the key.
	Absent,
	/// The backend could not be read.
	Unavailable(StoreError),
}
impl TokenLookup {
	/// Returns the token, discarding the absent/unavailable distinction.
	pub fn into_secret(self) -> Option<TokenSecret> {
		match self {
			Self::Present(secret) => Some(secret),
			_ => None,
		}
	}

	/// Returns `true` when a token is present.
	pub fn is_present(&self) -> bool {
		matches!(self, Self::Present(_))
	}
}

/// Routes token reads and writes to the configured backend.
///
/// Every backend is an explicit instance owned by the store. Share one [`MemoryKv`] between
/// several stores through [`TokenStore::with_memory`] when clients must see the same tokens.
/// Switching the active kind never migrates or clears values held by the previous backend.
pub struct TokenStore {
	active: RwLock<StorageKind>,
	default_key: String,
	memory: Arc<MemoryKv>,
	local: Arc<dyn SyncKv>,
	session: Arc<dyn SyncKv>,
	cookies: Arc<CookieJarKv>,
	durable: Arc<dyn AsyncKv>,
}
impl TokenStore {
	/// Default key under which tokens are stored.
	pub const DEFAULT_KEY: &'static str = "auth_token";

	/// Creates a store with in-process backends for every kind and `kind` active.
	pub fn new(kind: StorageKind, default_key: impl Into<String>) -> Result<Self, ConfigError> {
		Ok(Self {
			active: RwLock::new(kind.ensure_supported()?),
			default_key: default_key.into(),
			memory: Default::default(),
			local: Arc::new(MemoryKv::default()),
			session: Arc::new(MemoryKv::default()),
			cookies: Default::default(),
			durable: Arc::new(MemoryKv::default()),
		})
	}

	/// Replaces the memory backend, typically with one shared across clients.
	pub fn with_memory(mut self, memory: Arc<MemoryKv>) -> Self {
		self.memory = memory;

		self
	}

	/// Replaces the local backend, e.g. with a [`FileKv`].
	pub fn with_local(mut self, local: Arc<dyn SyncKv>) -> Self {
		self.local = local;

		self
	}

	/// Replaces the session backend.
	pub fn with_session(mut self, session: Arc<dyn SyncKv>) -> Self {
		self.session = session;

		self
	}

	/// Replaces the cookie jar.
	pub fn with_cookie_jar(mut self, cookies: Arc<CookieJarKv>) -> Self {
		self.cookies = cookies;

		self
	}

	/// Replaces the durable backend, e.g. with a [`DurableFileKv`].
	pub fn with_durable(mut self, durable: Arc<dyn AsyncKv>) -> Self {
		self.durable = durable;

		self
	}

	/// Returns the active backend kind.
	pub fn active_kind(&self) -> StorageKind {
		*self.active.read()
	}

	/// Switches the active backend kind without migrating stored values.
	pub fn set_active_kind(&self, kind: StorageKind) -> Result<(), ConfigError> {
		*self.active.write() = kind.ensure_supported()?;

		Ok(())
	}

	/// Returns the key used when options do not override it.
	pub fn default_key(&self) -> &str {
		&self.default_key
	}

	/// Returns the cookie jar backend.
	pub fn cookie_jar(&self) -> &CookieJarKv {
		&self.cookies
	}

	/// Stores `value`; backend failures are logged and propagated.
	pub async fn set(&self, value: &str, options: &TokenOptions) -> Result<(), StoreError> {
		let (kind, key) = self.resolve(options);
		let result = match kind {
			StorageKind::Memory => SyncKv::set(self.memory.as_ref(), key, value),
			StorageKind::Local => self.local.set(key, value),
			StorageKind::Session => self.session.set(key, value),
			StorageKind::Cookie => self.cookies.set_with(key, value, &options.cookie),
			StorageKind::Durable => self.durable.set(key, value).await,
			StorageKind::ServerManaged | StorageKind::HttpOnlyCookie =>
				Err(StoreError::Unsupported { kind }),
		};

		result.inspect_err(|e| obs::log_store_failure("set", kind, e))
	}

	/// Reads the token.
	///
	/// Placeholder kinds return [`StoreError::Unsupported`]; every other backend failure is
	/// logged and reported as [`TokenLookup::Unavailable`].
	pub async fn get(&self, options: &TokenOptions) -> Result<TokenLookup, StoreError> {
		let (kind, key) = self.resolve(options);
		let result = match kind {
			StorageKind::Memory => SyncKv::get(self.memory.as_ref(), key),
			StorageKind::Local => self.local.get(key),
			StorageKind::Session => self.session.get(key),
			StorageKind::Cookie => SyncKv::get(self.cookies.as_ref(), key),
			StorageKind::Durable => self.durable.get(key).await,
			StorageKind::ServerManaged | StorageKind::HttpOnlyCookie => {
				let err = StoreError::Unsupported { kind };

				obs::log_store_failure("get", kind, &err);

				return Err(err);
			},
		};

		match result {
			Ok(Some(value)) => Ok(TokenLookup::Present(TokenSecret::new(value))),
			Ok(None) => Ok(TokenLookup::Absent),
			Err(e) => {
				obs::log_store_failure("get", kind, &e);

				Ok(TokenLookup::Unavailable(e))
			},
		}
	}

	/// Deletes the token; backend failures are logged and propagated.
	pub async fn remove(&self, options: &TokenOptions) -> Result<(), StoreError> {
		let (kind, key) = self.resolve(options);
		let result = match kind {
			StorageKind::Memory => SyncKv::remove(self.memory.as_ref(), key),
			StorageKind::Local => self.local.remove(key),
			StorageKind::Session => self.session.remove(key),
			StorageKind::Cookie => self.cookies.remove(key),
			StorageKind::Durable => self.durable.remove(key).await,
			StorageKind::ServerManaged | StorageKind::HttpOnlyCookie =>
				Err(StoreError::Unsupported { kind }),
		};

		result.inspect_err(|e| obs::log_store_failure("remove", kind, e))
	}

	fn resolve<'a>(&'a self, options: &'a TokenOptions) -> (StorageKind, &'a str) {
		let kind = options.kind.unwrap_or_else(|| self.active_kind());
		let key = options.key.as_deref().unwrap_or(&self.default_key);

		(kind, key)
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("active", &self.active_kind())
			.field("default_key", &self.default_key)
			.finish()
	}
}
