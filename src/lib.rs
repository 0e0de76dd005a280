//! Drop-in async HTTP client with bearer-token lifecycle management, pluggable token stores,
//! response caching, and bounded retries behind a single-flight request queue.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod queue;
pub mod retry;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		client::HttpClient,
		config::ClientConfig,
		error::TransportError,
		http::{HttpTransport, RequestDescriptor, ResponseBody, TransportFuture, TransportResponse},
		store::TokenStore,
	};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

	/// Client type alias used by reqwest-backed integration tests.
	#[cfg(feature = "reqwest")]
	pub type ReqwestTestClient = HttpClient<ReqwestTransport>;

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport(config: &ClientConfig) -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.timeout(config.timeout.unsigned_abs())
			.danger_accept_invalid_certs(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs an [`HttpClient`] backed by in-memory token backends and the reqwest transport
	/// used across integration tests.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(config: ClientConfig) -> (ReqwestTestClient, Arc<TokenStore>) {
		let store = Arc::new(
			TokenStore::new(config.storage, &config.token_key)
				.expect("Test configuration should select a supported storage backend."),
		);
		let transport = test_reqwest_transport(&config);
		let client = HttpClient::with_parts(config, store.clone(), transport)
			.expect("Test client should build from a validated configuration.");

		(client, store)
	}

	/// Scripted reply served by [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub enum ScriptedReply {
		/// HTTP response with the given status and body.
		Status(u16, &'static str),
		/// Network failure without a response.
		Offline,
	}

	/// Request observed by [`ScriptedTransport`], stamped with the paused-clock instant.
	#[derive(Clone, Debug)]
	pub struct ObservedRequest {
		/// Request exactly as the transport received it.
		pub request: RequestDescriptor,
		/// Instant at which the transport received it.
		pub at: tokio::time::Instant,
	}

	/// In-process transport that replays a fixed script of replies and records every request.
	///
	/// Once the script is exhausted every further call answers `200` with an empty JSON object.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		replies: Mutex<VecDeque<ScriptedReply>>,
		observed: Mutex<Vec<ObservedRequest>>,
		latency: Option<std::time::Duration>,
	}
	impl ScriptedTransport {
		/// Creates a transport that answers with `replies` in order.
		pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
			Self {
				replies: Mutex::new(replies.into_iter().collect()),
				observed: Default::default(),
				latency: None,
			}
		}

		/// Delays every reply by `latency`.
		pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
			self.latency = Some(latency);

			self
		}

		/// Returns every request observed so far.
		pub fn observed(&self) -> Vec<ObservedRequest> {
			self.observed.lock().clone()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute<'a>(&'a self, request: &'a RequestDescriptor) -> TransportFuture<'a> {
			Box::pin(async move {
				self.observed.lock().push(ObservedRequest {
					request: request.clone(),
					at: tokio::time::Instant::now(),
				});

				if let Some(latency) = self.latency {
					tokio::time::sleep(latency).await;
				}

				let reply = self.replies.lock().pop_front();

				match reply {
					Some(ScriptedReply::Status(status, body)) => Ok(TransportResponse {
						status,
						headers: BTreeMap::new(),
						body: ResponseBody::from_static(body.as_bytes()),
					}),
					Some(ScriptedReply::Offline) => Err(TransportError::Io(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						"scripted transport is offline",
					))),
					None => Ok(TransportResponse {
						status: 200,
						headers: BTreeMap::new(),
						body: ResponseBody::from_static(b"{}"),
					}),
				}
			})
		}
	}

	/// Builds a client over a [`ScriptedTransport`] and in-memory token backends.
	pub fn build_scripted_client(
		config: ClientConfig,
		transport: Arc<ScriptedTransport>,
	) -> (HttpClient<ScriptedTransport>, Arc<TokenStore>) {
		let store = Arc::new(
			TokenStore::new(config.storage, &config.token_key)
				.expect("Test configuration should select a supported storage backend."),
		);
		let client = HttpClient::with_parts(config, store.clone(), transport)
			.expect("Test client should build from a validated configuration.");

		(client, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use cookie;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
