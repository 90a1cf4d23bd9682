//! Refresh token orchestration with a singleflight guard and retained refresh tokens.
//!
//! [`TokenManager::valid_access_token`] is the entry point downstream code uses. It returns the
//! stored access token while it is still valid and otherwise runs a `grant_type=refresh_token`
//! exchange under the manager's refresh guard. The store is re-read after the guard is acquired,
//! so callers that queued behind an in-flight refresh reuse its result instead of issuing their
//! own. A refresh that failed while others queued is not repeated by them; they see `None`.
//!
//! A refresh that lands after [`TokenManager::clear`] (or any other replacement of the credential)
//! is not written back to the store.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshMetricsSnapshot};

// std
use std::sync::atomic::Ordering;
// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
	flows::TokenManager,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Where a refresh token can come from, in the order they are consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshTokenSource {
	/// Token passed by the caller.
	Argument,
	/// Token held by the credential store.
	Store,
	/// Durable fallback token from [`ClientConfig`](crate::config::ClientConfig).
	Config,
}
impl RefreshTokenSource {
	/// Consultation order used by [`TokenManager::refresh`].
	pub const PRECEDENCE: [RefreshTokenSource; 3] =
		[RefreshTokenSource::Argument, RefreshTokenSource::Store, RefreshTokenSource::Config];

	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshTokenSource::Argument => "argument",
			RefreshTokenSource::Store => "store",
			RefreshTokenSource::Config => "config",
		}
	}

	pub(crate) const fn index(self) -> usize {
		match self {
			RefreshTokenSource::Argument => 0,
			RefreshTokenSource::Store => 1,
			RefreshTokenSource::Config => 2,
		}
	}
}

struct Refreshed {
	grant: TokenGrant,
	recorded: bool,
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a currently valid access token, refreshing it first when needed.
	///
	/// Failures are logged and collapse to `None`; this call never raises. Callers that waited
	/// behind a refresh which failed return `None` without contacting the provider again.
	pub async fn valid_access_token(&self) -> Option<TokenSecret> {
		let observed = self.refresh_epoch.load(Ordering::Acquire);

		if let Some(token) = self.store.valid_access_token_at(OffsetDateTime::now_utc()) {
			return Some(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Another caller may have refreshed while this one waited.
		if let Some(token) = self.store.valid_access_token_at(OffsetDateTime::now_utc()) {
			return Some(token);
		}
		if self.refresh_epoch.load(Ordering::Acquire) != observed {
			self.refresh_metrics.record_coalesced_failure();

			return None;
		}

		match self.refresh_unguarded(None).await {
			Ok(Refreshed { grant, recorded: true }) => Some(grant.access_token),
			Ok(Refreshed { recorded: false, .. }) => None,
			Err(err) => {
				obs::warn_absorbed(FlowKind::Refresh, "valid_access_token", &err);

				None
			},
		}
	}

	/// Exchanges a refresh token for a new access token and stores the result.
	///
	/// The refresh token is resolved from `refresh_token`, then the store, then the configured
	/// fallback. When the provider does not rotate it, the resolved token is kept in the store and
	/// reported in the returned grant. If the credential is cleared while the exchange is in
	/// flight, the grant is still returned but not stored.
	pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenGrant> {
		let _singleflight = self.refresh_guard.lock().await;

		self.refresh_unguarded(refresh_token).await.map(|refreshed| refreshed.grant)
	}

	/// Resolves the refresh token by walking [`RefreshTokenSource::PRECEDENCE`].
	pub fn resolve_refresh_token(
		&self,
		explicit: Option<&str>,
	) -> Option<(RefreshTokenSource, TokenSecret)> {
		RefreshTokenSource::PRECEDENCE.into_iter().find_map(|source| {
			let token = match source {
				RefreshTokenSource::Argument => explicit
					.filter(|value| !value.trim().is_empty())
					.map(TokenSecret::new),
				RefreshTokenSource::Store => self.store.refresh_token(),
				RefreshTokenSource::Config => self.config.fallback_refresh_token().cloned(),
			};

			token.map(|token| (source, token))
		})
	}

	async fn refresh_unguarded(&self, explicit: Option<&str>) -> Result<Refreshed> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let facade = self.facade()?;
				let generation = self.store.generation();
				let (source, refresh_token) =
					self.resolve_refresh_token(explicit).ok_or(Error::NoRefreshTokenAvailable)?;

				self.refresh_metrics.record_resolved(source);
				obs::record_refresh_source(source);

				let grant = facade.refresh(&refresh_token).await?;
				let recorded = self.store.record_refresh(&grant, generation);

				if !recorded {
					self.refresh_metrics.record_discarded();
				}

				Ok(Refreshed { grant, recorded })
			})
			.await;

		self.refresh_epoch.fetch_add(1, Ordering::Release);
		self.refresh_metrics.record_result(&result);
		obs::record_result(KIND, &result);

		result
	}
}
