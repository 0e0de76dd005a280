//! Transport primitives for the request pipeline.
//!
//! The module exposes [`HttpTransport`] alongside [`RequestDescriptor`] and
//! [`TransportResponse`] so downstream crates can plug in custom HTTP stacks. A transport
//! executes exactly the descriptor it receives: the pipeline has already applied every
//! interceptor, and a retry hands the same descriptor back with only
//! [`RequestDescriptor::attempt`] advanced.

pub mod body;

pub use body::*;

// self
use crate::{_prelude::*, error::{ConfigError, TransportError}};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a fully populated request.
///
/// Implementations must answer with `Ok` for every HTTP response, whatever its status, and
/// reserve `Err` for failures where no response exists (DNS, TCP, TLS, timeouts). Any
/// request timeout is configured on the transport itself and applies to each attempt.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and collects the full response.
	fn execute<'a>(&'a self, request: &'a RequestDescriptor) -> TransportFuture<'a>;
}

/// HTTP verbs issued by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// `GET`, the only cacheable verb.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully populated request handed to a transport and replayed verbatim on retry.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL, query string included.
	pub url: Url,
	/// Headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
	/// Content type of a multipart body, boundary included.
	pub multipart: Option<String>,
	/// Number of retries already issued for this request.
	pub attempt: u32,
}
impl RequestDescriptor {
	/// Creates a body-less descriptor.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None, multipart: None, attempt: 0 }
	}

	/// Attaches `body`, recording its content type.
	pub fn with_body(mut self, body: RequestBody) -> Self {
		let multipart = match &body {
			RequestBody::Multipart(form) => Some(form.content_type()),
			_ => None,
		};
		let (content_type, data) = body.encode();

		if let Some(content_type) = content_type {
			self.headers.insert(CONTENT_TYPE.into(), content_type);
		}

		self.body = data;
		self.multipart = multipart;

		self
	}

	/// Returns the header value stored under `name`, matched case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Inserts or replaces a header after validating it.
	pub fn set_header(
		&mut self,
		name: impl AsRef<str>,
		value: impl Into<String>,
	) -> Result<(), ConfigError> {
		let name = name.as_ref();
		let value = value.into();

		validate_header(name, &value)?;
		self.headers.insert(name.to_ascii_lowercase(), value);

		Ok(())
	}

	/// Returns the first value of query parameter `name`.
	pub fn query_param(&self, name: &str) -> Option<String> {
		self.url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
	}
}

/// Complete HTTP response as surfaced by a transport.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lower-case name; non-UTF-8 values are skipped.
	pub headers: BTreeMap<String, String>,
	/// Response body.
	pub body: ResponseBody,
}
impl TransportResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// `content-type` header name.
pub const CONTENT_TYPE: &str = "content-type";

/// Checks that `name` is an RFC 9110 token and `value` has no control characters.
pub fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
	let name_ok = !name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
	let value_ok = value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f));

	if name_ok && value_ok {
		Ok(())
	} else {
		Err(ConfigError::InvalidHeader { name: name.to_owned() })
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose every attempt is bounded by `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout.unsigned_abs()).build()?;

		Ok(Self(client))
	}

	fn method(method: Method) -> reqwest::Method {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute<'a>(&'a self, request: &'a RequestDescriptor) -> TransportFuture<'a> {
		Box::pin(async move {
			let mut builder = self.0.request(Self::method(request.method), request.url.clone());

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.body(body.clone());
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?;

			Ok(TransportResponse { status, headers, body: ResponseBody::new(body.to_vec()) })
		})
	}
}
