//! Token lifecycle orchestration powered by the token-endpoint facade.

pub mod authorization;
pub mod refresh;
pub mod validate;

mod client_credentials;

pub use authorization::*;
pub use refresh::*;
pub use validate::*;

// std
use std::sync::atomic::AtomicU64;
// self
use crate::{
	_prelude::*,
	auth::TokenStatus,
	config::{ClientConfig, ConfigReport},
	http::TokenHttpClient,
	oauth::{TokenFacade, TransportErrorMapper},
	provider::ProviderDescriptor,
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Single authority for obtaining, refreshing, and invalidating marketplace access tokens.
///
/// The manager owns the HTTP transport, the provider descriptor, the client settings, and the
/// shared [`TokenStore`]. Downstream collaborators ask it for a currently valid access token
/// through [`TokenManager::valid_access_token`]; refreshes behind that call are serialized so a
/// burst of requests hitting an expired token produces one upstream refresh.
pub struct TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Provider descriptor that defines the OAuth endpoints.
	pub descriptor: ProviderDescriptor,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	config: ClientConfig,
	store: TokenStore,
	refresh_guard: AsyncMutex<()>,
	refresh_epoch: AtomicU64,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	///
	/// Incomplete settings are accepted here; see [`TokenManager::config_report`].
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		config: ClientConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			refresh_metrics: Default::default(),
			config,
			store: TokenStore::default(),
			refresh_guard: AsyncMutex::new(()),
			refresh_epoch: AtomicU64::new(0),
		}
	}

	/// Replaces the credential store, e.g. to share one store between components.
	pub fn with_store(mut self, store: TokenStore) -> Self {
		self.store = store;

		self
	}

	/// Shared credential store backing this manager.
	pub fn store(&self) -> &TokenStore {
		&self.store
	}

	/// Client settings the manager was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Describes missing client settings and soft warnings.
	pub fn config_report(&self) -> ConfigReport {
		self.config.report()
	}

	/// Reports token status without touching the network.
	pub fn status(&self) -> TokenStatus {
		self.store.status()
	}

	/// Wipes the stored credential.
	///
	/// A refresh already in flight completes but its grant is not stored.
	pub fn clear(&self) {
		self.store.clear();
	}

	fn facade(&self) -> Result<TokenFacade<C, M>> {
		TokenFacade::from_descriptor(
			&self.descriptor,
			self.config.client_id()?,
			self.config.client_secret()?,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager with its own reqwest-backed transport.
	pub fn new(descriptor: ProviderDescriptor, config: ClientConfig) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			descriptor,
			config,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("descriptor", &self.descriptor)
			.field("config", &self.config)
			.field("store", &self.store)
			.finish()
	}
}

/// Rejects empty or whitespace-only caller input.
pub(crate) fn require_field<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::MissingRequiredField { field });
	}

	Ok(trimmed)
}
