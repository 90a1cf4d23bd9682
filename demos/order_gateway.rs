//! Walks the order gateway through an authorization callback and two order listings against a
//! mocked Login with Amazon endpoint and a mocked marketplace, showing the second listing being
//! served from the response cache.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::Value;
use url::Url;
// self
use marketplace_oauth::{
	cache::ResponseCache,
	config::ClientConfig,
	flows::TokenManager,
	gateway::{DownstreamClient, DownstreamFuture, DownstreamRequest, Gateway, OrdersQuery},
	provider::ProviderDescriptor,
	reqwest::Client,
};

/// Marketplace client that forwards every operation to a single mocked endpoint.
struct MockMarketplace {
	client: Client,
	endpoint: Url,
}
impl DownstreamClient for MockMarketplace {
	fn call<'a>(&'a self, request: DownstreamRequest<'a>) -> DownstreamFuture<'a> {
		Box::pin(async move {
			let body = self
				.client
				.post(self.endpoint.clone())
				.bearer_auth(request.access_token.expose())
				.header("x-operation", request.operation)
				.body(request.params.to_string())
				.send()
				.await?
				.error_for_status()?
				.text()
				.await?;

			Ok(serde_json::from_str::<Value>(&body)?)
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/o2/token").body_includes("grant_type=authorization_code");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"Atza|demo\",\"refresh_token\":\"Atzr|demo\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let orders_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/orders/v0")
				.header("authorization", "Bearer Atza|demo")
				.header("x-operation", "orders.getOrders");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"payload\":{\"Orders\":[{\"AmazonOrderId\":\"111-2222222-3333333\"}]}}");
		})
		.await;
	let descriptor = ProviderDescriptor::builder()
		.authorization_endpoint(Url::parse(&server.url("/ap/oa"))?)
		.token_endpoint(Url::parse(&server.url("/auth/o2/token"))?)
		.profile_endpoint(Url::parse(&server.url("/user/profile"))?)
		.build()?;
	let manager = TokenManager::new(
		descriptor,
		ClientConfig::new("amzn1.application-oa2-client.demo", "demo-secret")
			.with_default_scope("sellingpartnerapi::migration"),
	)?;
	let gateway = Gateway::new(Arc::new(manager), Arc::new(ResponseCache::new()));
	let redirect = gateway.authorize("https://seller.example.com/callback", None, None)?;

	println!("Send the seller to {}.", redirect.authorization_url);

	gateway.callback("demo-code", "https://seller.example.com/callback").await?;

	println!("Token status: {:?}.", gateway.status());

	let marketplace =
		MockMarketplace { client: Client::new(), endpoint: Url::parse(&server.url("/orders/v0"))? };
	let query = OrdersQuery::default().with_marketplace_ids_csv("ATVPDKIKX0DER");
	let first = gateway.orders(&marketplace, &query).await?;
	let second = gateway.orders(&marketplace, &query).await?;

	assert_eq!(first, second);

	println!(
		"Orders: {first}. Cache hits: {}, misses: {}.",
		gateway.metrics().hits(),
		gateway.metrics().misses()
	);

	token_mock.assert_async().await;
	orders_mock.assert_calls_async(1).await;

	Ok(())
}
