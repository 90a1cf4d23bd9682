#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use marketplace_oauth::{
	_preludet::*,
	auth::{Credential, TokenSecret},
	config::ClientConfig,
	error::ErrorKind,
	flows::ReqwestTokenManager,
	provider::GrantType,
};

const CLIENT_ID: &str = "client-refresh";
const CLIENT_SECRET: &str = "secret-refresh";

fn manager(server: &MockServer, config: ClientConfig) -> ReqwestTokenManager {
	build_reqwest_test_manager(test_descriptor(&server.base_url()), config)
}

fn seed(manager: &ReqwestTokenManager, access: &str, refresh: &str, expires_in: Duration) {
	manager.store().replace(Credential::new(
		access,
		Some(TokenSecret::new(refresh)),
		OffsetDateTime::now_utc() + expires_in,
	));
}

#[tokio::test]
async fn refresh_keeps_previous_refresh_token_when_not_rotated() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-old", "RT-original", Duration::minutes(-1));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/o2/token")
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=RT-original");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-new\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let grant = manager.refresh(None).await.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "access-new");
	assert_eq!(grant.refresh_token.as_ref().map(|secret| secret.expose()), Some("RT-original"));
	assert_eq!(grant.grant_type, GrantType::RefreshToken);

	let stored = manager.store().snapshot();

	assert_eq!(stored.access_token.as_ref().map(|secret| secret.expose()), Some("access-new"));
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("RT-original"));
	assert!(!manager.status().is_expired);
	assert_eq!(manager.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn refresh_stores_rotated_refresh_token() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-old", "RT-original", Duration::minutes(10));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token").body_includes("refresh_token=RT-original");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-new\",\"refresh_token\":\"RT-rotated\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;

	manager.refresh(None).await.expect("Explicit refresh should run even for a valid token.");

	mock.assert_async().await;

	assert_eq!(
		manager.store().refresh_token().as_ref().map(TokenSecret::expose),
		Some("RT-rotated")
	);
}

#[tokio::test]
async fn refresh_prefers_argument_over_store_and_config() {
	let server = MockServer::start_async().await;
	let manager = manager(
		&server,
		ClientConfig::new(CLIENT_ID, CLIENT_SECRET).with_refresh_token("RT-config"),
	);

	seed(&manager, "access-old", "RT-store", Duration::minutes(-1));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token").body_includes("refresh_token=RT-argument");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-arg\",\"token_type\":\"bearer\",\"expires_in\":60}");
		})
		.await;
	let grant = manager.refresh(Some("RT-argument")).await.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.refresh_token.as_ref().map(|secret| secret.expose()), Some("RT-argument"));
	assert_eq!(
		manager.store().refresh_token().as_ref().map(TokenSecret::expose),
		Some("RT-argument")
	);
}

#[tokio::test]
async fn refresh_falls_back_to_configured_token_after_restart() {
	let server = MockServer::start_async().await;
	let manager = manager(
		&server,
		ClientConfig::new(CLIENT_ID, CLIENT_SECRET).with_refresh_token("RT-config"),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token").body_includes("refresh_token=RT-config");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-boot\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let token = manager.valid_access_token().await.expect("Fallback token should bootstrap.");

	mock.assert_async().await;

	assert_eq!(token.expose(), "access-boot");
	assert!(manager.status().has_refresh_token);
}

#[tokio::test]
async fn refresh_without_any_token_fails_without_network() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(500);
		})
		.await;
	let err = manager.refresh(None).await.expect_err("Refresh should fail without any token.");

	assert_eq!(err.kind(), ErrorKind::NoRefreshTokenAvailable);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn valid_access_token_reuses_unexpired_token() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-live", "RT-live", Duration::minutes(30));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(500);
		})
		.await;
	let token = manager.valid_access_token().await.expect("Live token should be returned.");

	assert_eq!(token.expose(), "access-live");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn valid_access_token_singleflight_hits_provider_once() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-expired", "RT-singleflight", Duration::seconds(-5));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(
					"{\"access_token\":\"access-singleflight\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let (first, second, third) = tokio::join!(
		manager.valid_access_token(),
		manager.valid_access_token(),
		manager.valid_access_token(),
	);

	for token in [first, second, third] {
		assert_eq!(
			token.as_ref().map(TokenSecret::expose),
			Some("access-singleflight"),
			"Every caller should observe the refreshed token."
		);
	}

	mock.assert_calls_async(1).await;

	assert_eq!(manager.refresh_metrics.attempts(), 1);
}

#[tokio::test]
async fn valid_access_token_absorbs_upstream_rejection() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-expired", "RT-revoked", Duration::seconds(-5));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Refresh token revoked\"}");
		})
		.await;

	assert!(manager.valid_access_token().await.is_none());

	mock.assert_async().await;

	let err = manager.refresh(None).await.expect_err("Rejected refresh should surface.");

	assert!(matches!(
		err,
		Error::UpstreamRejected { status: Some(400), ref description, .. }
			if description == "Refresh token revoked"
	));
	assert_eq!(manager.refresh_metrics.failures(), 2);
	assert!(manager.status().has_refresh_token, "Rejected refresh must not wipe the store.");
}

#[tokio::test]
async fn queued_callers_reuse_a_failed_refresh() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-expired", "RT-revoked", Duration::seconds(-5));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(400)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Refresh token revoked\"}");
		})
		.await;
	let (first, second, third) = tokio::join!(
		manager.valid_access_token(),
		manager.valid_access_token(),
		manager.valid_access_token(),
	);

	assert!(first.is_none() && second.is_none() && third.is_none());

	mock.assert_calls_async(1).await;

	assert_eq!(manager.refresh_metrics.failures(), 1);
	assert_eq!(manager.refresh_metrics.coalesced_failures(), 2);

	// A later caller is not tied to the earlier burst.
	assert!(manager.valid_access_token().await.is_none());

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn clear_during_refresh_keeps_the_store_empty() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-expired", "RT-inflight", Duration::seconds(-5));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token").body_includes("refresh_token=RT-inflight");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(
					"{\"access_token\":\"access-late\",\"refresh_token\":\"RT-late\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let (token, ()) = tokio::join!(manager.valid_access_token(), async {
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		manager.clear();
	});

	mock.assert_async().await;

	let status = manager.status();

	assert!(token.is_none(), "A grant discarded by clear must not be handed out.");
	assert!(!status.has_access_token && !status.has_refresh_token && status.is_expired);
	assert_eq!(status.expires_at, None);
	assert_eq!(manager.refresh_metrics.discarded(), 1);
}

#[tokio::test]
async fn explicit_refresh_returns_grant_but_respects_clear() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-expired", "RT-explicit", Duration::seconds(-5));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(
					"{\"access_token\":\"access-explicit\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let (grant, ()) = tokio::join!(manager.refresh(None), async {
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		manager.clear();
	});
	let grant = grant.expect("The exchange itself succeeded.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "access-explicit");
	assert!(manager.store().snapshot().is_empty());
}

#[tokio::test]
async fn refresh_reports_retry_after_on_throttling() {
	let server = MockServer::start_async().await;
	let manager = manager(&server, ClientConfig::new(CLIENT_ID, CLIENT_SECRET));

	seed(&manager, "access-expired", "RT-throttled", Duration::seconds(-5));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(429).header("retry-after", "30").body("Too Many Requests");
		})
		.await;
	let err = manager.refresh(None).await.expect_err("Throttled refresh should fail.");

	mock.assert_async().await;

	match err {
		Error::UpstreamRejected { status, retry_after, .. } => {
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(30)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}
