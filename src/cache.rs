//! In-memory response cache consulted by `GET` requests.
//!
//! Entries are keyed by the request URL plus a canonical rendering of its query parameters.
//! The default [`CachePolicy`] keeps every entry for the life of the cache; bounding it by
//! entry count or age is an explicit opt-in.

// std
use std::collections::VecDeque;
// crates.io
use tokio::time::Instant;
// self
use crate::{_prelude::*, http::ResponseBody};

/// Canonical cache key: URL followed by key-sorted JSON query parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);
impl CacheKey {
	/// Derives the key for `url` and `params`.
	///
	/// Parameter order never affects the key because `params` is already sorted.
	pub fn new(url: &Url, params: &BTreeMap<String, String>) -> Self {
		// A BTreeMap of strings always serializes.
		let rendered = serde_json::to_string(params).unwrap_or_default();

		Self(format!("{url}{rendered}"))
	}

	/// Returns the key text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Optional bounds applied to the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CachePolicy {
	/// Maximum number of entries; the oldest insertion is evicted on overflow.
	pub max_entries: Option<usize>,
	/// Maximum entry age; older entries read as absent.
	pub ttl: Option<Duration>,
}
impl CachePolicy {
	/// Unbounded policy: no size limit and no expiry.
	pub const fn unbounded() -> Self {
		Self { max_entries: None, ttl: None }
	}

	/// Limits the number of entries.
	pub fn with_max_entries(mut self, max_entries: usize) -> Self {
		self.max_entries = Some(max_entries);

		self
	}

	/// Expires entries older than `ttl`.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);

		self
	}
}

#[derive(Debug)]
struct CacheEntry {
	body: ResponseBody,
	stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
	entries: HashMap<CacheKey, CacheEntry>,
	order: VecDeque<CacheKey>,
}
impl CacheState {
	fn forget(&mut self, key: &CacheKey) {
		if self.entries.remove(key).is_some() {
			self.order.retain(|k| k != key);
		}
	}
}

/// Thread-safe map from [`CacheKey`] to the last successful response body.
#[derive(Debug, Default)]
pub struct ResponseCache {
	policy: CachePolicy,
	state: Mutex<CacheState>,
}
impl ResponseCache {
	/// Creates an empty cache governed by `policy`.
	pub fn new(policy: CachePolicy) -> Self {
		Self { policy, state: Default::default() }
	}

	/// Returns the active policy.
	pub fn policy(&self) -> &CachePolicy {
		&self.policy
	}

	/// Returns the cached body for `key`, dropping it first if it outlived the TTL.
	pub fn read(&self, key: &CacheKey) -> Option<ResponseBody> {
		let mut state = self.state.lock();
		let entry = state.entries.get(key)?;

		if let Some(ttl) = self.policy.ttl
			&& entry.stored_at.elapsed() >= ttl.unsigned_abs()
		{
			state.forget(key);

			return None;
		}

		Some(entry.body.clone())
	}

	/// Stores `body` under `key`, overwriting any previous entry.
	pub fn write(&self, key: CacheKey, body: ResponseBody) {
		let mut state = self.state.lock();

		state.forget(&key);
		state.order.push_back(key.clone());
		state.entries.insert(key, CacheEntry { body, stored_at: Instant::now() });

		if let Some(max) = self.policy.max_entries {
			while state.entries.len() > max {
				let Some(oldest) = state.order.pop_front() else {
					break;
				};

				state.entries.remove(&oldest);
			}
		}
	}

	/// Drops every entry.
	pub fn clear(&self) {
		let mut state = self.state.lock();

		state.entries.clear();
		state.order.clear();
	}

	/// Returns the number of stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn key(path: &str, params: &[(&str, &str)]) -> CacheKey {
		let url = Url::parse("https://api.example.com")
			.and_then(|base| base.join(path))
			.expect("Fixture URL should parse.");
		let params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

		CacheKey::new(&url, &params)
	}

	fn body(text: &'static str) -> ResponseBody {
		ResponseBody::from_static(text.as_bytes())
	}

	#[test]
	fn key_concatenates_url_and_sorted_params() {
		let a = key("/users", &[("page", "1"), ("limit", "10")]);
		let b = key("/users", &[("limit", "10"), ("page", "1")]);

		assert_eq!(a, b);
		assert_eq!(a.as_str(), "https://api.example.com/users{\"limit\":\"10\",\"page\":\"1\"}");
		assert_ne!(a, key("/users", &[("page", "2"), ("limit", "10")]));
		assert_eq!(key("/users", &[]).as_str(), "https://api.example.com/users{}");
	}

	#[test]
	fn write_overwrites_and_clear_empties() {
		let cache = ResponseCache::default();
		let k = key("/profile", &[]);

		cache.write(k.clone(), body("old"));
		cache.write(k.clone(), body("new"));

		assert_eq!(cache.read(&k), Some(body("new")));
		assert_eq!(cache.len(), 1);

		cache.clear();

		assert!(cache.is_empty());
		assert_eq!(cache.read(&k), None);
	}

	#[test]
	fn max_entries_evicts_oldest_insertion() {
		let cache = ResponseCache::new(CachePolicy::default().with_max_entries(2));
		let (a, b, c) = (key("/a", &[]), key("/b", &[]), key("/c", &[]));

		cache.write(a.clone(), body("a"));
		cache.write(b.clone(), body("b"));
		cache.write(a.clone(), body("a2"));
		cache.write(c.clone(), body("c"));

		assert_eq!(cache.read(&b), None);
		assert_eq!(cache.read(&a), Some(body("a2")));
		assert_eq!(cache.read(&c), Some(body("c")));
	}

	#[tokio::test(start_paused = true)]
	async fn ttl_expires_entries() {
		let cache = ResponseCache::new(CachePolicy::default().with_ttl(Duration::seconds(5)));
		let k = key("/profile", &[]);

		cache.write(k.clone(), body("fresh"));
		tokio::time::advance(std::time::Duration::from_secs(4)).await;

		assert_eq!(cache.read(&k), Some(body("fresh")));

		tokio::time::advance(std::time::Duration::from_secs(1)).await;

		assert_eq!(cache.read(&k), None);
		assert!(cache.is_empty());
	}
}
