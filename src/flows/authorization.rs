//! Authorization Code helpers: browser redirect URL construction and the code exchange.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::TokenGrant,
	flows::{TokenManager, require_field},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const STATE_LEN: usize = 32;

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the authorization endpoint URL the end user is redirected to.
	///
	/// `state` is appended only when non-empty and `scope` only when it holds something other
	/// than whitespace. The call performs no I/O.
	pub fn authorization_url(
		&self,
		redirect_uri: &str,
		state: Option<&str>,
		scope: Option<&str>,
	) -> Result<Url> {
		let redirect_uri = require_field("redirect_uri", redirect_uri)?;
		let client_id = self.config.client_id()?;
		let mut url = self.descriptor.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("client_id", client_id);
		pairs.append_pair("response_type", "code");
		pairs.append_pair("redirect_uri", redirect_uri);

		if let Some(state) = state.filter(|value| !value.is_empty()) {
			pairs.append_pair("state", state);
		}
		if let Some(scope) = scope.filter(|value| !value.trim().is_empty()) {
			pairs.append_pair("scope", scope);
		}

		drop(pairs);

		Ok(url)
	}

	/// Exchanges an authorization code and stores the resulting credential.
	pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let code = require_field("code", code)?;
				let redirect_uri = require_field("redirect_uri", redirect_uri)?;
				let grant = self.facade()?.exchange_code(code, redirect_uri).await?;

				self.store.record_grant(&grant);

				Ok(grant)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

/// Generates an opaque 32-character alphanumeric `state` value.
pub fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
