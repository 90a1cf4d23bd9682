//! Client Credentials flow for request-scoped, app-only tokens.
//!
//! The grant is independent of the interactive session: its result is handed back to the caller
//! and never written to the credential store, so it cannot displace a user-authorized token.

// self
use crate::{
	_prelude::*,
	auth::TokenGrant,
	flows::TokenManager,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Performs the `client_credentials` grant with the configured scope, if any.
	pub async fn client_credentials(&self) -> Result<TokenGrant> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, "client_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.facade()?.client_credentials(self.config.client_credentials_scope()).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
