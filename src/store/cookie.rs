//! Cookie-jar backend honoring expiry, `Secure`, and `SameSite` attributes.

// crates.io
use cookie::{Cookie, CookieJar, SameSite};
// self
use crate::{
	_prelude::*,
	store::{StoreError, SyncKv},
};

/// Attributes applied to a token cookie when it is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieOptions {
	/// Lifetime of the cookie; `None` writes a session cookie.
	pub expires_in: Option<Duration>,
	/// Whether the cookie carries the `Secure` attribute.
	pub secure: bool,
	/// `SameSite` policy attached to the cookie.
	pub same_site: SameSite,
	/// Path scope of the cookie.
	pub path: String,
}
impl CookieOptions {
	const DEFAULT_LIFETIME: Duration = Duration::days(7);

	/// Overrides the lifetime.
	pub fn with_expires_in(mut self, expires_in: Option<Duration>) -> Self {
		self.expires_in = expires_in;

		self
	}

	/// Overrides the `Secure` attribute.
	pub fn with_secure(mut self, secure: bool) -> Self {
		self.secure = secure;

		self
	}

	/// Overrides the `SameSite` policy.
	pub fn with_same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = same_site;

		self
	}
}
impl Default for CookieOptions {
	fn default() -> Self {
		Self {
			expires_in: Some(Self::DEFAULT_LIFETIME),
			secure: true,
			same_site: SameSite::Strict,
			path: "/".into(),
		}
	}
}

/// Thread-safe cookie jar holding token cookies.
///
/// Expired cookies read as absent and are pruned on access.
#[derive(Debug, Default)]
pub struct CookieJarKv(Mutex<CookieJar>);
impl CookieJarKv {
	/// Writes `value` as a cookie named `key` with the provided attributes.
	pub fn set_with(
		&self,
		key: &str,
		value: &str,
		options: &CookieOptions,
	) -> Result<(), StoreError> {
		if key.is_empty() || key.contains([';', '=', ' ']) {
			return Err(StoreError::Backend { message: format!("Invalid cookie name `{key}`") });
		}

		let mut builder = Cookie::build((key.to_owned(), value.to_owned()))
			.path(options.path.clone())
			.secure(options.secure)
			.same_site(options.same_site);

		if let Some(lifetime) = options.expires_in {
			builder = builder.expires(OffsetDateTime::now_utc() + lifetime);
		}

		self.0.lock().add(builder.build());

		Ok(())
	}

	/// Returns a copy of the live cookie named `key`, including its attributes.
	pub fn cookie(&self, key: &str) -> Option<Cookie<'static>> {
		let mut jar = self.0.lock();
		let expired =
			jar.get(key)?.expires_datetime().is_some_and(|at| at <= OffsetDateTime::now_utc());

		if expired {
			jar.remove(Cookie::new(key.to_owned(), ""));

			return None;
		}

		jar.get(key).cloned()
	}

	/// Renders every live cookie as a `Cookie` request header value.
	pub fn header_value(&self) -> Option<String> {
		let now = OffsetDateTime::now_utc();
		let jar = self.0.lock();
		let pairs = jar
			.iter()
			.filter(|c| c.expires_datetime().is_none_or(|at| at > now))
			.map(|c| c.stripped().to_string())
			.collect::<Vec<_>>();

		if pairs.is_empty() { None } else { Some(pairs.join("; ")) }
	}
}
impl SyncKv for CookieJarKv {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.cookie(key).map(|c| c.value().to_owned()))
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.set_with(key, value, &CookieOptions::default())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.0.lock().remove(Cookie::new(key.to_owned(), ""));

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cookie_attributes_are_applied() {
		let jar = CookieJarKv::default();
		let options = CookieOptions::default()
			.with_secure(false)
			.with_same_site(SameSite::Lax)
			.with_expires_in(Some(Duration::hours(1)));

		jar.set_with("auth_token", "abc", &options).expect("Cookie write should succeed.");

		let cookie = jar.cookie("auth_token").expect("Cookie should be present.");

		assert_eq!(cookie.value(), "abc");
		assert_eq!(cookie.secure(), Some(false));
		assert_eq!(cookie.same_site(), Some(SameSite::Lax));
		assert_eq!(cookie.path(), Some("/"));
		assert!(cookie.expires_datetime().is_some());
		assert_eq!(jar.header_value().as_deref(), Some("auth_token=abc"));
	}

	#[test]
	fn expired_cookie_reads_as_absent() {
		let jar = CookieJarKv::default();
		let options = CookieOptions::default().with_expires_in(Some(Duration::seconds(-1)));

		jar.set_with("auth_token", "stale", &options).expect("Cookie write should succeed.");

		assert_eq!(jar.get("auth_token"), Ok(None));
		assert_eq!(jar.header_value(), None);
	}

	#[test]
	fn session_cookie_has_no_expiry() {
		let jar = CookieJarKv::default();

		jar.set_with("auth_token", "session", &CookieOptions::default().with_expires_in(None))
			.expect("Cookie write should succeed.");

		let cookie = jar.cookie("auth_token").expect("Session cookie should be present.");

		assert!(cookie.expires_datetime().is_none());

		jar.remove("auth_token").expect("Cookie removal should succeed.");

		assert_eq!(jar.get("auth_token"), Ok(None));
	}

	#[test]
	fn invalid_cookie_names_are_rejected() {
		let jar = CookieJarKv::default();

		assert!(jar.set("bad name", "value").is_err());
	}
}
