// std
use std::time::Duration as StdDuration;
// self
use bearer_http::{
	_preludet::*,
	client::{HttpClient, RequestOptions},
	config::ClientConfig,
	http::{Method, RequestBody},
	pipeline::{AUTHORIZATION, CACHE_BUST_PARAM, REQUEST_ID_HEADER},
	store::{StorageKind, TokenLookup},
};

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
	id: u64,
}

fn config(cache: bool, retries: u32) -> ClientConfig {
	let base = Url::parse("https://api.example.com").expect("Fixture base URL should parse.");

	ClientConfig::builder(base)
		.cache(cache)
		.retry_count(retries)
		.storage(StorageKind::Memory)
		.build()
		.expect("Fixture configuration should be valid.")
}

fn client(
	cache: bool,
	retries: u32,
	replies: impl IntoIterator<Item = ScriptedReply>,
) -> (HttpClient<ScriptedTransport>, Arc<ScriptedTransport>) {
	let transport = Arc::new(ScriptedTransport::new(replies));
	let (client, _store) = build_scripted_client(config(cache, retries), transport.clone());

	(client, transport)
}

fn assert_gap(observed: &[ObservedRequest], index: usize, millis: u64) {
	let gap = observed[index].at - observed[index - 1].at;
	let expected = StdDuration::from_millis(millis);

	assert!(
		gap >= expected && gap < expected + StdDuration::from_millis(50),
		"Gap before attempt {index} was {gap:?}, expected about {expected:?}."
	);
}

#[tokio::test(start_paused = true)]
async fn profile_scenario_retries_then_serves_from_cache() {
	let (client, transport) = client(true, 2, [
		ScriptedReply::Status(500, "boom"),
		ScriptedReply::Status(500, "boom"),
		ScriptedReply::Status(200, "{\"id\":1}"),
	]);

	client.save_token("abc", None).await.expect("Saving the token should succeed.");

	let profile = client
		.get("/profile", RequestOptions::new())
		.await
		.expect("Third attempt should succeed.")
		.json::<Profile>()
		.expect("Profile body should decode.");

	assert_eq!(profile, Profile { id: 1 });

	let observed = transport.observed();

	assert_eq!(observed.len(), 3);
	assert!(observed.iter().all(|o| o.request.header(AUTHORIZATION) == Some("Bearer abc")));
	assert_gap(&observed, 1, 2_000);
	assert_gap(&observed, 2, 4_000);

	let cached = client.get("/profile", RequestOptions::new()).await.expect("Cache should answer.");

	assert_eq!(cached.text(), "{\"id\":1}");
	assert_eq!(transport.observed().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn service_unavailable_is_retried_up_to_the_limit() {
	let replies = std::iter::repeat_n(ScriptedReply::Status(503, ""), 6);
	let (client, transport) = client(true, 3, replies);
	let err = client
		.get("/busy", RequestOptions::new())
		.await
		.expect_err("Every attempt fails with 503.");

	assert_eq!(err.status(), Some(503));

	let observed = transport.observed();
	let attempts = observed.iter().map(|o| o.request.attempt).collect::<Vec<_>>();

	assert_eq!(attempts, vec![0, 1, 2, 3]);
	assert_gap(&observed, 1, 2_000);
	assert_gap(&observed, 2, 4_000);
	assert_gap(&observed, 3, 8_000);
	assert!(client.cache().is_empty());
}

#[tokio::test]
async fn not_found_is_not_retried() {
	let (client, transport) = client(true, 3, [ScriptedReply::Status(404, "missing")]);
	let err = client.get("/nope", RequestOptions::new()).await.expect_err("404 should surface.");

	assert!(matches!(&err, Error::Status { status: 404, body } if body.text() == "missing"));
	assert_eq!(transport.observed().len(), 1);
}

#[tokio::test]
async fn network_failures_are_not_retried() {
	let (client, transport) = client(true, 3, [ScriptedReply::Offline]);
	let err = client
		.post("/items", RequestBody::Empty, RequestOptions::new())
		.await
		.expect_err("Offline transport should fail.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(err.status(), None);
	assert_eq!(transport.observed().len(), 1);
}

#[tokio::test]
async fn unauthorized_removes_token_before_the_error_returns() {
	let (client, transport) = client(true, 3, [ScriptedReply::Status(401, "expired")]);

	client.save_token("stale", None).await.expect("Saving the token should succeed.");

	let err = client.get("/me", RequestOptions::new()).await.expect_err("401 should surface.");

	assert_eq!(err.status(), Some(401));
	assert_eq!(client.token().await.expect("Lookup should succeed."), TokenLookup::Absent);

	client.get("/me", RequestOptions::new()).await.expect("Script is exhausted, so 200 follows.");

	let observed = transport.observed();

	assert_eq!(observed[0].request.header(AUTHORIZATION), Some("Bearer stale"));
	assert_eq!(observed[1].request.header(AUTHORIZATION), None);
}

#[tokio::test]
async fn disabled_cache_sends_distinct_cache_busters() {
	let (client, transport) = client(false, 3, Vec::new());
	let options = RequestOptions::new().with_query("q", "rust");
	let first = client.get("/search", options.clone()).await.expect("GET should succeed.");
	let second = client.get("/search", options).await.expect("GET should succeed.");

	assert_eq!(first.as_bytes(), second.as_bytes());

	let observed = transport.observed();
	let stamps = observed
		.iter()
		.map(|o| o.request.query_param(CACHE_BUST_PARAM).expect("Cache buster should be set."))
		.collect::<Vec<_>>();

	assert_eq!(observed.len(), 2);
	assert_ne!(stamps[0], stamps[1]);
	assert!(observed.iter().all(|o| o.request.query_param("q").as_deref() == Some("rust")));
	assert_ne!(
		observed[0].request.header(REQUEST_ID_HEADER),
		observed[1].request.header(REQUEST_ID_HEADER)
	);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_run_in_fifo_order_without_overlap() {
	let transport =
		Arc::new(ScriptedTransport::default().with_latency(StdDuration::from_millis(100)));
	let (client, _store) = build_scripted_client(config(false, 3), transport.clone());
	let (a, b, c, d) = tokio::join!(
		client.post("/1", RequestBody::Empty, RequestOptions::new()),
		client.get("/2", RequestOptions::new()),
		client.put("/3", RequestBody::Empty, RequestOptions::new()),
		client.delete("/4", RequestOptions::new()),
	);

	for result in [a, b, c, d] {
		result.expect("Every queued request should succeed.");
	}

	let observed = transport.observed();
	let order = observed
		.iter()
		.map(|o| (o.request.method, o.request.url.path().to_owned()))
		.collect::<Vec<_>>();

	assert_eq!(order, vec![
		(Method::Post, "/1".to_owned()),
		(Method::Get, "/2".to_owned()),
		(Method::Put, "/3".to_owned()),
		(Method::Delete, "/4".to_owned()),
	]);

	for index in 1..observed.len() {
		assert_gap(&observed, index, 100);
	}

	assert!(!client.queue().is_busy());
	assert_eq!(client.queue().pending(), 0);
}
