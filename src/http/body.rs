//! Request and response payloads, including the multipart encoder used by uploads.

// std
use std::borrow::Cow;
// crates.io
use rand::{Rng, distr::Alphanumeric};
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Outgoing request payload.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Pre-encoded JSON document.
	Json(Vec<u8>),
	/// Raw bytes with an optional content type.
	Bytes {
		/// Content type sent with the bytes, if any.
		content_type: Option<String>,
		/// Payload.
		data: Vec<u8>,
	},
	/// `multipart/form-data` payload.
	Multipart(MultipartForm),
}
impl RequestBody {
	/// Encodes `value` as a JSON body.
	pub fn json<T>(value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_vec(value).map(Self::Json).map_err(Error::Encode)
	}

	/// Wraps raw bytes with the given content type.
	pub fn bytes(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		Self::Bytes { content_type: Some(content_type.into()), data: data.into() }
	}

	/// Returns `true` for multipart payloads.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}

	/// Splits the body into its content type and encoded bytes.
	pub fn encode(self) -> (Option<String>, Option<Vec<u8>>) {
		match self {
			Self::Empty => (None, None),
			Self::Json(data) => (Some("application/json".into()), Some(data)),
			Self::Bytes { content_type, data } => (content_type, Some(data)),
			Self::Multipart(form) => (Some(form.content_type()), Some(form.encode())),
		}
	}
}

/// File attached to an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
	/// Form field name the file is sent under.
	pub field: String,
	/// File name reported to the server.
	pub file_name: String,
	/// Content type of the file.
	pub content_type: String,
	/// File contents.
	pub data: Vec<u8>,
}
impl FilePart {
	/// Creates a `file` field with an `application/octet-stream` content type.
	pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
		Self {
			field: "file".into(),
			file_name: file_name.into(),
			content_type: "application/octet-stream".into(),
			data: data.into(),
		}
	}

	/// Overrides the form field name.
	pub fn with_field(mut self, field: impl Into<String>) -> Self {
		self.field = field.into();

		self
	}

	/// Overrides the content type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = content_type.into();

		self
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum MultipartPart {
	Text { name: String, value: String },
	File(FilePart),
}

/// In-memory `multipart/form-data` builder.
///
/// Encoding is deterministic for a given form, so a retried upload resends identical bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartForm {
	boundary: String,
	parts: Vec<MultipartPart>,
}
impl MultipartForm {
	const BOUNDARY_LEN: usize = 24;

	/// Creates an empty form with a random boundary.
	pub fn new() -> Self {
		let suffix = rand::rng()
			.sample_iter(Alphanumeric)
			.take(Self::BOUNDARY_LEN)
			.map(char::from)
			.collect::<String>();

		Self { boundary: format!("----bearer-http-{suffix}"), parts: Vec::new() }
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(MultipartPart::Text { name: name.into(), value: value.into() });

		self
	}

	/// Appends a file field.
	pub fn file(mut self, file: FilePart) -> Self {
		self.parts.push(MultipartPart::File(file));

		self
	}

	/// Returns the boundary separating parts.
	pub fn boundary(&self) -> &str {
		&self.boundary
	}

	/// Returns the `content-type` header value, boundary included.
	pub fn content_type(&self) -> String {
		format!("multipart/form-data; boundary={}", self.boundary)
	}

	/// Encodes the form into its wire representation.
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::new();

		for part in &self.parts {
			buf.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());

			match part {
				MultipartPart::Text { name, value } => {
					buf.extend_from_slice(
						format!(
							"Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
							escape_quoted(name)
						)
						.as_bytes(),
					);
					buf.extend_from_slice(value.as_bytes());
				},
				MultipartPart::File(file) => {
					buf.extend_from_slice(
						format!(
							"Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
							escape_quoted(&file.field),
							escape_quoted(&file.file_name),
							file.content_type,
						)
						.as_bytes(),
					);
					buf.extend_from_slice(&file.data);
				},
			}

			buf.extend_from_slice(b"\r\n");
		}

		buf.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

		buf
	}
}
impl Default for MultipartForm {
	fn default() -> Self {
		Self::new()
	}
}

/// Response payload shared cheaply between the cache and callers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResponseBody(Arc<[u8]>);
impl ResponseBody {
	const PREVIEW_LEN: usize = 256;

	/// Wraps owned bytes.
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(Arc::from(bytes.into()))
	}

	/// Wraps static bytes.
	pub fn from_static(bytes: &'static [u8]) -> Self {
		Self(Arc::from(bytes))
	}

	/// Returns the raw bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Returns the body length in bytes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` for an empty body.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.0)
	}

	/// Decodes the body as JSON, reporting the path of the first mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.0);

		Ok(serde_path_to_error::deserialize(&mut de)?)
	}

	/// Returns a short, log-friendly prefix of the body.
	pub fn preview(&self) -> Cow<'_, str> {
		let end = self.0.len().min(Self::PREVIEW_LEN);

		String::from_utf8_lossy(&self.0[..end])
	}
}
impl Debug for ResponseBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseBody")
			.field("len", &self.len())
			.field("preview", &self.preview())
			.finish()
	}
}
impl From<Vec<u8>> for ResponseBody {
	fn from(value: Vec<u8>) -> Self {
		Self::new(value)
	}
}

fn escape_quoted(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"").replace(['\r', '\n'], " ")
}
