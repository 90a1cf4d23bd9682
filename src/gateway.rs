//! Route-facing boundary for the order gateway.
//!
//! [`Gateway`] is what HTTP handlers call. It combines the [`TokenManager`] with a shared
//! [`ResponseCache`] and a [`DownstreamClient`] standing in for the marketplace SDK, so handlers
//! never see raw tokens or cache bookkeeping. Downstream responses are returned verbatim.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret, TokenStatus},
	cache::{CacheKey, CacheKeyError, CacheStats, ResponseCache},
	error::ErrorKind,
	flows::{self, TokenManager, Validation},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, CacheLookup},
};

/// `MaxResults` sent with order listings when the caller does not choose one.
pub const DEFAULT_MAX_RESULTS: u32 = 50;

/// Operation names understood by [`DownstreamClient`] implementations.
pub mod operation {
	/// Filtered order listing.
	pub const GET_ORDERS: &str = "orders.getOrders";
	/// Next page of an order listing.
	pub const GET_ORDERS_BY_NEXT_TOKEN: &str = "orders.getOrdersByNextToken";
	/// One order by id.
	pub const GET_ORDER: &str = "orders.getOrder";
	/// Line items of one order.
	pub const GET_ORDER_ITEMS: &str = "orders.getOrderItems";
}

/// Failure reported by a [`DownstreamClient`].
pub type DownstreamError = Box<dyn StdError + Send + Sync>;

/// Boxed future returned by [`DownstreamClient::call`].
pub type DownstreamFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Value, DownstreamError>> + 'a + Send>>;

/// One signed marketplace call.
#[derive(Clone, Copy)]
pub struct DownstreamRequest<'a> {
	/// Operation name, e.g. [`operation::GET_ORDERS`].
	pub operation: &'a str,
	/// Operation parameters.
	pub params: &'a Value,
	/// Bearer token the call must carry.
	pub access_token: &'a TokenSecret,
}
impl Debug for DownstreamRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DownstreamRequest")
			.field("operation", &self.operation)
			.field("params", &self.params)
			.field("access_token", &"<redacted>")
			.finish()
	}
}

/// Marketplace client that signs and sends a call with the supplied bearer token.
pub trait DownstreamClient
where
	Self: Send + Sync,
{
	/// Executes `request` and returns the marketplace response body.
	fn call<'a>(&'a self, request: DownstreamRequest<'a>) -> DownstreamFuture<'a>;
}

/// Errors surfaced by [`Gateway`] data calls.
#[derive(Debug, ThisError)]
pub enum GatewayError {
	/// No valid access token could be produced; the downstream was not called.
	#[error("No valid access token is available. Authorize or refresh first.")]
	Unauthorized,
	/// Token manager failure.
	#[error(transparent)]
	Token(#[from] Error),
	/// Parameters could not be turned into a cache key.
	#[error(transparent)]
	CacheKey(#[from] CacheKeyError),
	/// The marketplace call failed.
	#[error("Downstream call `{operation}` failed.")]
	Downstream {
		/// Operation that failed.
		operation: String,
		/// Failure reported by the client.
		#[source]
		source: DownstreamError,
	},
}
impl GatewayError {
	/// Token failure category, when the error originates from the token lifecycle.
	pub fn kind(&self) -> Option<ErrorKind> {
		match self {
			GatewayError::Unauthorized => Some(ErrorKind::NoValidToken),
			GatewayError::Token(err) => Some(err.kind()),
			GatewayError::CacheKey(_) | GatewayError::Downstream { .. } => None,
		}
	}
}

/// Filters for an order listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersQuery {
	/// Lower bound on order creation, ISO 8601.
	pub created_after: Option<String>,
	/// Upper bound on order creation, ISO 8601.
	pub created_before: Option<String>,
	/// Order statuses to include.
	pub order_statuses: Vec<String>,
	/// Marketplaces to include.
	pub marketplace_ids: Vec<String>,
	/// Page size; [`DEFAULT_MAX_RESULTS`] when unset.
	pub max_results: Option<u32>,
	/// Continuation token from a previous page. When set, every other filter is ignored.
	pub next_token: Option<String>,
}
impl OrdersQuery {
	/// Sets the continuation token.
	pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
		self.next_token = Some(token.into());

		self
	}

	/// Splits comma-separated statuses, as they arrive on a query string.
	pub fn with_order_statuses_csv(mut self, csv: &str) -> Self {
		self.order_statuses = split_csv(csv);

		self
	}

	/// Splits comma-separated marketplace ids, as they arrive on a query string.
	pub fn with_marketplace_ids_csv(mut self, csv: &str) -> Self {
		self.marketplace_ids = split_csv(csv);

		self
	}

	/// Operation name and marketplace parameters for this query.
	pub fn to_call(&self) -> (&'static str, Value) {
		let mut params = Map::new();

		if let Some(token) = self.next_token.as_deref().filter(|token| !token.trim().is_empty()) {
			params.insert("NextToken".into(), token.into());

			return (operation::GET_ORDERS_BY_NEXT_TOKEN, Value::Object(params));
		}

		params.insert("MaxResults".into(), self.max_results.unwrap_or(DEFAULT_MAX_RESULTS).into());

		if let Some(after) = self.created_after.as_deref() {
			params.insert("CreatedAfter".into(), after.into());
		}
		if let Some(before) = self.created_before.as_deref() {
			params.insert("CreatedBefore".into(), before.into());
		}
		if !self.order_statuses.is_empty() {
			params.insert("OrderStatuses".into(), self.order_statuses.clone().into());
		}
		if !self.marketplace_ids.is_empty() {
			params.insert("MarketplaceIds".into(), self.marketplace_ids.clone().into());
		}

		(operation::GET_ORDERS, Value::Object(params))
	}
}

/// Authorization redirect produced by [`Gateway::authorize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthorizationRedirect {
	/// URL the end user must be sent to.
	pub authorization_url: Url,
	/// Client identifier embedded in the URL.
	pub client_id: String,
	/// Redirect URI embedded in the URL.
	pub redirect_uri: String,
	/// State value the callback must echo back.
	pub state: String,
	/// Scope embedded in the URL, if any.
	pub scope: Option<String>,
}

/// Cache lookup counters for [`Gateway`] data calls.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
	hits: AtomicU64,
	misses: AtomicU64,
	bypasses: AtomicU64,
}
impl GatewayMetrics {
	/// Calls answered from the cache.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Calls forwarded to the downstream client.
	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}

	/// Continuation pages forwarded without consulting the cache.
	pub fn bypasses(&self) -> u64 {
		self.bypasses.load(Ordering::Relaxed)
	}

	fn record(&self, operation: &str, lookup: CacheLookup) {
		let counter = match lookup {
			CacheLookup::Hit => &self.hits,
			CacheLookup::Miss => &self.misses,
			CacheLookup::Bypass => &self.bypasses,
		};

		counter.fetch_add(1, Ordering::Relaxed);
		obs::record_cache_lookup(operation, lookup);
	}
}

/// Boundary consumed by the order gateway's HTTP routes.
pub struct Gateway<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	manager: Arc<TokenManager<C, M>>,
	cache: Arc<ResponseCache>,
	cache_ttl: Duration,
	metrics: GatewayMetrics,
}
impl<C, M> Gateway<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a gateway over shared manager and cache handles.
	pub fn new(manager: Arc<TokenManager<C, M>>, cache: Arc<ResponseCache>) -> Self {
		let cache_ttl = cache.default_ttl();

		Self { manager, cache, cache_ttl, metrics: GatewayMetrics::default() }
	}

	/// Overrides how long downstream responses stay cached.
	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Token manager behind this gateway.
	pub fn manager(&self) -> &Arc<TokenManager<C, M>> {
		&self.manager
	}

	/// Response cache behind this gateway.
	pub fn cache(&self) -> &Arc<ResponseCache> {
		&self.cache
	}

	/// Cache hit/miss counters.
	pub fn metrics(&self) -> &GatewayMetrics {
		&self.metrics
	}

	/// Builds the authorization redirect.
	///
	/// Falls back to the configured default scope when `scope` is absent or blank and generates
	/// a state value when `state` is absent or empty.
	pub fn authorize(
		&self,
		redirect_uri: &str,
		state: Option<&str>,
		scope: Option<&str>,
	) -> Result<AuthorizationRedirect> {
		let scope = scope
			.filter(|value| !value.trim().is_empty())
			.or_else(|| self.manager.config().default_scope())
			.map(str::to_owned);
		let state = state
			.filter(|value| !value.is_empty())
			.map_or_else(flows::random_state, str::to_owned);
		let authorization_url =
			self.manager.authorization_url(redirect_uri, Some(&state), scope.as_deref())?;
		let client_id = self.manager.config().client_id()?.to_owned();

		Ok(AuthorizationRedirect {
			authorization_url,
			client_id,
			redirect_uri: redirect_uri.trim().to_owned(),
			state,
			scope,
		})
	}

	/// Completes the redirect by exchanging `code`.
	pub async fn callback(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
		self.manager.exchange_code(code, redirect_uri).await
	}

	/// Forces a refresh, optionally with a caller-supplied refresh token.
	pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenGrant> {
		self.manager.refresh(refresh_token).await
	}

	/// Returns a currently valid access token.
	pub async fn current_token(&self) -> Result<TokenSecret, GatewayError> {
		self.manager.valid_access_token().await.ok_or(GatewayError::Unauthorized)
	}

	/// Issues a request-scoped client-credentials token.
	pub async fn client_token(&self) -> Result<TokenGrant> {
		self.manager.client_credentials().await
	}

	/// Validates the current token against the profile endpoint.
	pub async fn validate(&self) -> Validation {
		self.manager.validate().await
	}

	/// Reports token status.
	pub fn status(&self) -> TokenStatus {
		self.manager.status()
	}

	/// Wipes the stored credential.
	pub fn clear(&self) {
		self.manager.clear();
	}

	/// Summarizes live cache entries.
	pub fn cache_stats(&self) -> CacheStats {
		self.cache.stats()
	}

	/// Empties the response cache.
	pub fn clear_cache(&self) {
		self.cache.clear();
	}

	/// Runs `operation` through the cache, calling `downstream` only on a miss.
	pub async fn call<D>(
		&self,
		downstream: &D,
		operation: &str,
		params: &Value,
	) -> Result<Value, GatewayError>
	where
		D: ?Sized + DownstreamClient,
	{
		let token = self.current_token().await?;
		let key = CacheKey::new(operation, params)?;

		if let Some(hit) = self.cache.get(&key) {
			self.metrics.record(operation, CacheLookup::Hit);

			return Ok(hit);
		}

		self.metrics.record(operation, CacheLookup::Miss);

		let response = forward(downstream, operation, params, &token).await?;

		self.cache.set_with_ttl(key, response.clone(), self.cache_ttl);

		Ok(response)
	}

	/// Lists orders. Continuation pages bypass the cache.
	pub async fn orders<D>(
		&self,
		downstream: &D,
		query: &OrdersQuery,
	) -> Result<Value, GatewayError>
	where
		D: ?Sized + DownstreamClient,
	{
		let (name, params) = query.to_call();

		if name == operation::GET_ORDERS_BY_NEXT_TOKEN {
			let token = self.current_token().await?;

			self.metrics.record(name, CacheLookup::Bypass);

			return forward(downstream, name, &params, &token).await;
		}

		self.call(downstream, name, &params).await
	}

	/// Fetches one order.
	pub async fn order<D>(&self, downstream: &D, order_id: &str) -> Result<Value, GatewayError>
	where
		D: ?Sized + DownstreamClient,
	{
		self.call(downstream, operation::GET_ORDER, &order_params(order_id)?).await
	}

	/// Fetches the line items of one order.
	pub async fn order_items<D>(
		&self,
		downstream: &D,
		order_id: &str,
	) -> Result<Value, GatewayError>
	where
		D: ?Sized + DownstreamClient,
	{
		self.call(downstream, operation::GET_ORDER_ITEMS, &order_params(order_id)?).await
	}
}
impl<C, M> Debug for Gateway<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("manager", &self.manager)
			.field("cache_ttl", &self.cache_ttl)
			.field("metrics", &self.metrics)
			.finish()
	}
}

async fn forward<D>(
	downstream: &D,
	operation: &str,
	params: &Value,
	access_token: &TokenSecret,
) -> Result<Value, GatewayError>
where
	D: ?Sized + DownstreamClient,
{
	downstream
		.call(DownstreamRequest { operation, params, access_token })
		.await
		.map_err(|source| GatewayError::Downstream { operation: operation.to_owned(), source })
}

fn order_params(order_id: &str) -> Result<Value> {
	let order_id = flows::require_field("order_id", order_id)?;

	Ok(serde_json::json!({ "orderId": order_id }))
}

fn split_csv(csv: &str) -> Vec<String> {
	csv.split(',').map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned).collect()
}
