//! Thread-safe in-memory key-value backend for the memory, session, and default local kinds.

// self
use crate::{
	_prelude::*,
	store::{AsyncKv, StoreError, StoreFuture, SyncKv},
};

type KvMap = Arc<RwLock<HashMap<String, String>>>;

/// Thread-safe backend that keeps values in-process.
///
/// Clones share the same map, so one instance can back several [`TokenStore`]s.
///
/// [`TokenStore`]: crate::store::TokenStore
#[derive(Clone, Debug, Default)]
pub struct MemoryKv(KvMap);
impl MemoryKv {
	/// Returns the number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: &KvMap, key: &str) -> Option<String> {
		map.read().get(key).cloned()
	}

	fn set_now(map: &KvMap, key: &str, value: &str) {
		map.write().insert(key.to_owned(), value.to_owned());
	}

	fn remove_now(map: &KvMap, key: &str) {
		map.write().remove(key);
	}
}
impl SyncKv for MemoryKv {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(Self::get_now(&self.0, key))
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		Self::set_now(&self.0, key, value);

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		Self::remove_now(&self.0, key);

		Ok(())
	}
}
impl AsyncKv for MemoryKv {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(&map, key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::set_now(&map, key, value);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::remove_now(&map, key);

			Ok(())
		})
	}
}
