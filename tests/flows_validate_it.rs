#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use marketplace_oauth::{
	_preludet::*,
	auth::{Credential, TokenSecret},
	config::ClientConfig,
	error::ErrorKind,
	flows::{ReqwestTokenManager, Validation},
};

fn manager(server: &MockServer) -> ReqwestTokenManager {
	build_reqwest_test_manager(
		test_descriptor(&server.base_url()),
		ClientConfig::new("client-validate", "secret-validate"),
	)
}

fn seed_live(manager: &ReqwestTokenManager) {
	manager.store().replace(Credential::new(
		"access-live",
		Some(TokenSecret::new("RT-live")),
		OffsetDateTime::now_utc() + Duration::hours(1),
	));
}

#[tokio::test]
async fn validate_returns_profile_for_accepted_token() {
	let server = MockServer::start_async().await;
	let manager = manager(&server);

	seed_live(&manager);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/profile").header("authorization", "Bearer access-live");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"user_id\":\"amzn1.account.TEST\",\"name\":\"Seller\"}");
		})
		.await;
	let validation = manager.validate().await;

	mock.assert_async().await;

	assert_eq!(
		validation,
		Validation::Valid {
			profile: serde_json::json!({"user_id": "amzn1.account.TEST", "name": "Seller"})
		}
	);
}

#[tokio::test]
async fn validate_reports_missing_token_without_network() {
	let server = MockServer::start_async().await;
	let manager = manager(&server);
	let mock = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(500);
		})
		.await;

	match manager.validate().await {
		Validation::Invalid { kind, .. } => assert_eq!(kind, ErrorKind::NoValidToken),
		other => panic!("Unexpected validation outcome: {other:?}."),
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn validate_surfaces_profile_rejection_description() {
	let server = MockServer::start_async().await;
	let manager = manager(&server);

	seed_live(&manager);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/profile");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_token\",\"error_description\":\"The access token is expired\"}");
		})
		.await;
	let validation = manager.validate().await;

	mock.assert_async().await;

	assert_eq!(
		validation,
		Validation::Invalid {
			kind: ErrorKind::UpstreamRejected,
			reason: "The access token is expired".into(),
		}
	);
}

#[tokio::test]
async fn validate_refreshes_expired_token_first() {
	let server = MockServer::start_async().await;
	let manager = manager(&server);

	manager.store().replace(Credential::new(
		"access-stale",
		Some(TokenSecret::new("RT-validate")),
		OffsetDateTime::now_utc() - Duration::minutes(1),
	));

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-fresh\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/user/profile").header("authorization", "Bearer access-fresh");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	assert!(manager.validate().await.is_valid());

	token_mock.assert_async().await;
	profile_mock.assert_async().await;
}
