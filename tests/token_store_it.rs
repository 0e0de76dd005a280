// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use time::Duration;
// self
use bearer_http::{
	error::ConfigError,
	store::{
		CookieJarKv, CookieOptions, DurableFileKv, FileKv, MemoryKv, StorageKind, StoreError,
		TokenLookup, TokenOptions, TokenStore,
	},
};

fn scratch_path(label: &str) -> PathBuf {
	std::env::temp_dir().join(format!("bearer-http-{label}-{}.json", rand::random::<u64>()))
}

fn supported_kinds() -> impl Iterator<Item = StorageKind> {
	StorageKind::ALL.into_iter().filter(|kind| !kind.is_placeholder())
}

async fn lookup(store: &TokenStore, options: &TokenOptions) -> TokenLookup {
	store.get(options).await.expect("Supported backends should answer lookups.")
}

#[tokio::test]
async fn every_supported_backend_round_trips() {
	let store = TokenStore::new(StorageKind::Memory, TokenStore::DEFAULT_KEY)
		.expect("Memory kind should be supported.");

	for kind in supported_kinds() {
		let options = TokenOptions::default().with_kind(kind);

		store.set("abc", &options).await.expect("Set should succeed.");

		let secret = lookup(&store, &options).await.into_secret();

		assert_eq!(secret.as_ref().map(|s| s.expose()), Some("abc"), "{kind}");

		store.remove(&options).await.expect("Remove should succeed.");

		assert_eq!(lookup(&store, &options).await, TokenLookup::Absent, "{kind}");
	}
}

#[tokio::test]
async fn placeholder_backends_fail_loudly() {
	let store = TokenStore::new(StorageKind::Local, TokenStore::DEFAULT_KEY)
		.expect("Local kind should be supported.");

	for kind in [StorageKind::ServerManaged, StorageKind::HttpOnlyCookie] {
		let options = TokenOptions::default().with_kind(kind);
		let unsupported = StoreError::Unsupported { kind };

		assert_eq!(store.set("abc", &options).await, Err(unsupported.clone()));
		assert_eq!(store.get(&options).await, Err(unsupported.clone()));
		assert_eq!(store.remove(&options).await, Err(unsupported));
		assert!(matches!(
			store.set_active_kind(kind),
			Err(ConfigError::UnsupportedStorage { kind: rejected }) if rejected == kind
		));
		assert!(TokenStore::new(kind, TokenStore::DEFAULT_KEY).is_err());
	}

	assert_eq!(store.active_kind(), StorageKind::Local);
}

#[tokio::test]
async fn shared_memory_backend_is_visible_to_every_store() {
	let memory = Arc::new(MemoryKv::default());
	let first = TokenStore::new(StorageKind::Memory, TokenStore::DEFAULT_KEY)
		.expect("Memory kind should be supported.")
		.with_memory(memory.clone());
	let second = TokenStore::new(StorageKind::Memory, TokenStore::DEFAULT_KEY)
		.expect("Memory kind should be supported.")
		.with_memory(memory.clone());

	first.set("shared", &TokenOptions::default()).await.expect("Set should succeed.");

	assert!(lookup(&second, &TokenOptions::default()).await.is_present());
	assert_eq!(memory.len(), 1);

	second.remove(&TokenOptions::default()).await.expect("Remove should succeed.");

	assert_eq!(lookup(&first, &TokenOptions::default()).await, TokenLookup::Absent);
}

#[tokio::test]
async fn file_backends_persist_across_reopen() {
	let local_path = scratch_path("local");
	let durable_path = scratch_path("durable");

	{
		let local = FileKv::open(&local_path).expect("Local file store should open.");
		let durable =
			DurableFileKv::open(&durable_path).await.expect("Durable file store should open.");
		let store = TokenStore::new(StorageKind::Local, "persisted")
			.expect("Local kind should be supported.")
			.with_local(Arc::new(local))
			.with_durable(Arc::new(durable));

		store
			.set("local-token", &TokenOptions::default())
			.await
			.expect("Local set should succeed.");
		store
			.set("durable-token", &TokenOptions::default().with_kind(StorageKind::Durable))
			.await
			.expect("Durable set should succeed.");
	}

	let local = FileKv::open(&local_path).expect("Local file store should reopen.");
	let durable =
		DurableFileKv::open(&durable_path).await.expect("Durable file store should reopen.");
	let store = TokenStore::new(StorageKind::Durable, "persisted")
		.expect("Durable kind should be supported.")
		.with_local(Arc::new(local))
		.with_durable(Arc::new(durable));
	let durable_secret = lookup(&store, &TokenOptions::default()).await.into_secret();
	let local_secret =
		lookup(&store, &TokenOptions::default().with_kind(StorageKind::Local)).await.into_secret();

	assert_eq!(durable_secret.as_ref().map(|s| s.expose()), Some("durable-token"));
	assert_eq!(local_secret.as_ref().map(|s| s.expose()), Some("local-token"));

	let _ = std::fs::remove_file(local_path);
	let _ = std::fs::remove_file(durable_path);
}

#[tokio::test]
async fn cookie_backend_applies_attributes_and_expiry() {
	let jar = Arc::new(CookieJarKv::default());
	let store = TokenStore::new(StorageKind::Cookie, TokenStore::DEFAULT_KEY)
		.expect("Cookie kind should be supported.")
		.with_cookie_jar(jar.clone());

	store.set("fresh", &TokenOptions::default()).await.expect("Cookie set should succeed.");

	let cookie = jar.cookie(TokenStore::DEFAULT_KEY).expect("Cookie should be stored.");

	assert_eq!(cookie.value(), "fresh");
	assert_eq!(cookie.secure(), Some(true));
	assert_eq!(cookie.same_site(), Some(bearer_http::cookie::SameSite::Strict));

	let expired = TokenOptions::default()
		.with_cookie(CookieOptions::default().with_expires_in(Some(Duration::seconds(-1))));

	store.set("stale", &expired).await.expect("Cookie set should succeed.");

	assert_eq!(lookup(&store, &TokenOptions::default()).await, TokenLookup::Absent);
}
