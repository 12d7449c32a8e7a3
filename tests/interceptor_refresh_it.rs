#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use bearer_interceptor::{
	_preludet::*,
	provider::{ClientAuthMethod, ProviderConfig},
	session::{SessionId, TokenSet},
	store::{MemoryStore, TokenStateStore},
};

const CLIENT_ID: &str = "gallery-client";
const CLIENT_SECRET: &str = "secret-refresh";

fn build_provider(server: &MockServer) -> ProviderConfig {
	ProviderConfig::builder()
		.token_endpoint(
			Url::parse(&server.url("/connect/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Provider configuration should build successfully.")
}

fn session() -> SessionId {
	SessionId::new("session-refresh").expect("Session identifier should be valid for tests.")
}

async fn seed_tokens(
	store: &MemoryStore,
	session: &SessionId,
	access: &str,
	refresh: &str,
	expires_in: Duration,
) -> TokenSet {
	let tokens = TokenSet::builder()
		.access_token(access)
		.refresh_token(refresh)
		.identity_token("identity-seed")
		.expires_at(OffsetDateTime::now_utc() + expires_in)
		.build()
		.expect("Token set fixture should build successfully.");

	store
		.write(session, tokens.clone())
		.await
		.expect("Failed to seed token set into the store.");

	tokens
}

#[tokio::test]
async fn fresh_token_is_attached_unchanged_without_a_network_call() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();
	let seeded =
		seed_tokens(&store, &session, "access-fresh", "refresh-fresh", Duration::seconds(600))
			.await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(500);
		})
		.await;
	let token = interceptor
		.bearer_token(&session)
		.await
		.expect("A fresh token set should yield a bearer token.");

	assert_eq!(token.expose(), "access-fresh");

	mock.assert_calls_async(0).await;

	assert_eq!(interceptor.refresh_metrics.attempts(), 0);

	let stored = store
		.read(&session)
		.await
		.expect("Store read should succeed after the fast path.")
		.expect("Token set should remain present after the fast path.");

	assert_eq!(stored.expires_at, seeded.expires_at, "Fast path must not rewrite the store.");
}

#[tokio::test]
async fn fast_path_is_idempotent_across_repeated_requests() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();
	let seeded =
		seed_tokens(&store, &session, "access-idem", "refresh-idem", Duration::seconds(600)).await;
	let first = interceptor
		.bearer_token(&session)
		.await
		.expect("First fast-path call should yield a bearer token.");
	let second = interceptor
		.bearer_token(&session)
		.await
		.expect("Second fast-path call should yield a bearer token.");

	assert_eq!(first.expose(), second.expose());
	assert_eq!(interceptor.refresh_metrics.attempts(), 0);

	let stored = store
		.read(&session)
		.await
		.expect("Store read should succeed after repeated fast paths.")
		.expect("Token set should remain present after repeated fast paths.");

	assert_eq!(stored.expires_at, seeded.expires_at);
	assert_eq!(stored.access_token.expose(), seeded.access_token.expose());
}

#[tokio::test]
async fn stale_token_triggers_exactly_one_refresh_and_rotates_the_set() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();
	let seeded =
		seed_tokens(&store, &session, "access-old", "refresh-old", Duration::seconds(30)).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"AT2\",\"refresh_token\":\"RT2\",\"id_token\":\"IT2\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let token = interceptor
		.bearer_token(&session)
		.await
		.expect("A stale token set with a live refresh token should yield a bearer token.");

	mock.assert_async().await;

	assert_eq!(token.expose(), "AT2");
	assert_eq!(interceptor.refresh_metrics.attempts(), 1);
	assert_eq!(interceptor.refresh_metrics.successes(), 1);

	let stored = store
		.read(&session)
		.await
		.expect("Store read should succeed after a refresh.")
		.expect("Refreshed token set should be persisted.");

	assert_eq!(stored.access_token.expose(), "AT2");
	assert_eq!(stored.refresh_token.expose(), "RT2");
	assert_eq!(stored.identity_token.expose(), "IT2");
	assert!(
		stored.expires_at > seeded.expires_at,
		"Refreshed expiry must strictly exceed the previous expiry.",
	);
	assert!(stored.expires_at >= before + Duration::seconds(3500));
	assert!(stored.expires_at <= OffsetDateTime::now_utc() + Duration::seconds(3700));
}

#[tokio::test]
async fn stored_values_carry_forward_when_the_provider_omits_rotation() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();

	seed_tokens(&store, &session, "access-old", "refresh-keep", Duration::seconds(10)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"AT2\",\"token_type\":\"bearer\",\"expires_in\":1800}");
		})
		.await;
	let token = interceptor
		.bearer_token(&session)
		.await
		.expect("Refresh without rotation should still yield a bearer token.");

	mock.assert_async().await;

	assert_eq!(token.expose(), "AT2");

	let stored = store
		.read(&session)
		.await
		.expect("Store read should succeed after a refresh.")
		.expect("Refreshed token set should be persisted.");

	assert_eq!(stored.refresh_token.expose(), "refresh-keep");
	assert_eq!(stored.identity_token.expose(), "identity-seed");
}

#[tokio::test]
async fn invalid_grant_degrades_to_unauthenticated_and_clears_the_session() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();

	seed_tokens(&store, &session, "access-dead", "refresh-dead", Duration::seconds(5)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let token = interceptor.bearer_token(&session).await;

	mock.assert_async().await;

	assert!(token.is_none(), "A rejected refresh must degrade to no token.");
	assert_eq!(interceptor.refresh_metrics.failures(), 1);

	let stored =
		store.read(&session).await.expect("Store read should succeed after a rejected refresh.");

	assert!(stored.is_none(), "A dead refresh token should not be replayed on later requests.");
}

#[tokio::test]
async fn provider_outage_degrades_without_clearing_the_session() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();

	seed_tokens(&store, &session, "access-old", "refresh-live", Duration::seconds(5)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(503);
		})
		.await;
	let token = interceptor.bearer_token(&session).await;

	mock.assert_async().await;

	assert!(token.is_none());

	let stored = store
		.read(&session)
		.await
		.expect("Store read should succeed after a provider outage.")
		.expect("A transient failure must not discard the stored set.");

	assert_eq!(stored.refresh_token.expose(), "refresh-live");
}

#[tokio::test]
async fn missing_session_yields_no_token_and_no_exchange() {
	let server = MockServer::start_async().await;
	let (interceptor, _store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(500);
		})
		.await;
	let token = interceptor.bearer_token(&session).await;

	assert!(token.is_none(), "An unauthenticated session has nothing to refresh.");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn concurrent_stale_observers_share_a_single_refresh_exchange() {
	let server = MockServer::start_async().await;
	let (interceptor, store) =
		build_reqwest_test_interceptor(build_provider(&server), CLIENT_ID, CLIENT_SECRET);
	let session = session();

	seed_tokens(&store, &session, "access-old", "refresh-old", Duration::seconds(5)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-singleflight\",\"refresh_token\":\"refresh-singleflight\",\"id_token\":\"identity-singleflight\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let (first, second) =
		tokio::join!(interceptor.bearer_token(&session), interceptor.bearer_token(&session));
	let first = first.expect("First concurrent request should obtain a bearer token.");
	let second = second.expect("Second concurrent request should obtain a bearer token.");

	assert_eq!(first.expose(), "access-singleflight");
	assert_eq!(second.expose(), "access-singleflight");

	mock.assert_calls_async(1).await;

	assert_eq!(interceptor.refresh_metrics.attempts(), 1);
}
