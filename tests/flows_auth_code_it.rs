#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use marketplace_oauth::{
	_preludet::*,
	config::ClientConfig,
	error::ErrorKind,
	flows::random_state,
	provider::GrantType,
};

const CLIENT_ID: &str = "amzn1.application-oa2-client.test";
const CLIENT_SECRET: &str = "secret-auth-code";

fn config() -> ClientConfig {
	ClientConfig::new(CLIENT_ID, CLIENT_SECRET)
}

#[test]
fn authorization_url_omits_absent_state_and_blank_scope() {
	let manager = build_reqwest_test_manager(test_descriptor("https://example.com"), config());
	let url = manager
		.authorization_url("https://x/cb", None, Some(""))
		.expect("Authorization URL should build.");
	let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

	assert_eq!(url.path(), "/ap/oa");
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("redirect_uri"), Some(&"https://x/cb".into()));
	assert!(!pairs.contains_key("state"));
	assert!(!pairs.contains_key("scope"));
}

#[test]
fn authorization_url_encodes_state_and_scope() {
	let manager = build_reqwest_test_manager(test_descriptor("https://example.com"), config());
	let url = manager
		.authorization_url("https://x/cb?tab=orders", Some("s1"), Some("profile postal_code"))
		.expect("Authorization URL should build.");
	let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("state"), Some(&"s1".into()));
	assert_eq!(pairs.get("scope"), Some(&"profile postal_code".into()));
	assert!(url.as_str().contains("redirect_uri=https%3A%2F%2Fx%2Fcb%3Ftab%3Dorders"));
	assert!(url.as_str().contains("scope=profile+postal_code"));
}

#[test]
fn authorization_url_requires_redirect_and_client_id() {
	let manager = build_reqwest_test_manager(test_descriptor("https://example.com"), config());
	let err = manager
		.authorization_url(" ", Some(&random_state()), None)
		.expect_err("Blank redirect URI should be rejected.");

	assert_eq!(err.kind(), ErrorKind::MissingRequiredField);

	let manager =
		build_reqwest_test_manager(test_descriptor("https://example.com"), ClientConfig::default());
	let err = manager
		.authorization_url("https://x/cb", None, None)
		.expect_err("Missing client id should be reported.");

	assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
}

#[tokio::test]
async fn exchange_code_stores_credential() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(test_descriptor(&server.base_url()), config());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/o2/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=authorization_code")
				.body_includes("code=ABC")
				.body_includes("redirect_uri=https%3A%2F%2Fx%2Fcb")
				.body_includes("client_id=amzn1.application-oa2-client.test");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"Atza-1\",\"refresh_token\":\"Atzr-1\",\"token_type\":\"bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let grant = manager
		.exchange_code("ABC", "https://x/cb")
		.await
		.expect("Authorization code exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "Atza-1");
	assert_eq!(grant.refresh_token.as_ref().map(|secret| secret.expose()), Some("Atzr-1"));
	assert_eq!(grant.expires_in, Duration::seconds(3600));
	assert_eq!(grant.token_type, "bearer");
	assert_eq!(grant.grant_type, GrantType::AuthorizationCode);

	let status = manager.status();

	assert!(status.has_access_token);
	assert!(status.has_refresh_token);
	assert!(!status.is_expired);
	assert_eq!(status.expires_at, Some(grant.expires_at));

	manager.clear();

	let status = manager.status();

	assert!(!status.has_access_token);
	assert!(!status.has_refresh_token);
	assert!(status.is_expired);
	assert_eq!(status.expires_at, None);
	assert_eq!(
		serde_json::to_value(&status).expect("Status should serialize.")["expiresAt"],
		serde_json::Value::Null
	);
}

#[tokio::test]
async fn exchange_code_surfaces_upstream_rejection_verbatim() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(test_descriptor(&server.base_url()), config());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(
					"{\"error\":\"invalid_grant\",\"error_description\":\"The request has an invalid grant parameter : code\"}",
				);
		})
		.await;
	let err = manager
		.exchange_code("expired-code", "https://x/cb")
		.await
		.expect_err("Rejected exchange should fail.");

	mock.assert_async().await;

	assert_eq!(err.kind(), ErrorKind::UpstreamRejected);

	match err {
		Error::UpstreamRejected { status, error, description, .. } => {
			assert_eq!(status, Some(400));
			assert_eq!(error.as_deref(), Some("invalid_grant"));
			assert_eq!(description, "The request has an invalid grant parameter : code");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(!manager.status().has_access_token, "Failed exchange must not touch the store.");
}

#[tokio::test]
async fn exchange_code_validates_input_before_network() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(test_descriptor(&server.base_url()), config());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(500);
		})
		.await;
	let err = manager
		.exchange_code("", "https://x/cb")
		.await
		.expect_err("Empty code should be rejected.");

	assert!(matches!(err, Error::MissingRequiredField { field: "code" }));

	let err = manager
		.exchange_code("ABC", "")
		.await
		.expect_err("Empty redirect URI should be rejected.");

	assert!(matches!(err, Error::MissingRequiredField { field: "redirect_uri" }));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn exchange_code_rejects_missing_expires_in() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(test_descriptor(&server.base_url()), config());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"Atza-1\",\"token_type\":\"bearer\"}");
		})
		.await;
	let err = manager
		.exchange_code("ABC", "https://x/cb")
		.await
		.expect_err("A token response without expires_in should be rejected.");

	mock.assert_async().await;

	assert_eq!(err.kind(), ErrorKind::InvalidResponse);
	assert!(manager.status().is_expired);
}
