//! Token validation against the provider's profile endpoint.

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, ErrorKind},
	flows::TokenManager,
	http::{ResponseMetadataSlot, TokenHttpClient},
	oauth::{self, Endpoint, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Outcome of [`TokenManager::validate`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Validation {
	/// The provider accepted the token and returned the account profile.
	Valid {
		/// Profile document returned by the provider.
		profile: serde_json::Value,
	},
	/// No usable token exists or the provider refused it.
	Invalid {
		/// Failure category.
		kind: ErrorKind,
		/// Upstream `error_description` when present, otherwise a summary.
		reason: String,
	},
}
impl Validation {
	/// Returns `true` for [`Validation::Valid`].
	pub fn is_valid(&self) -> bool {
		matches!(self, Validation::Valid { .. })
	}

	fn from_error(err: &Error) -> Self {
		Validation::Invalid { kind: err.kind(), reason: err.to_string() }
	}
}

#[derive(Deserialize)]
struct ProfileErrorBody {
	error_description: Option<String>,
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Checks that a valid access token exists and that the provider still accepts it.
	///
	/// The token is obtained through [`TokenManager::valid_access_token`], so an expired token is
	/// refreshed first. Every failure is reported as [`Validation::Invalid`].
	pub async fn validate(&self) -> Validation {
		const KIND: FlowKind = FlowKind::Validate;

		let span = FlowSpan::new(KIND, "validate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let outcome = span
			.instrument(async move {
				let Some(token) = self.valid_access_token().await else {
					return Validation::Invalid {
						kind: ErrorKind::NoValidToken,
						reason: "No valid access token is available.".into(),
					};
				};

				match self.fetch_profile(&token).await {
					Ok(outcome) => outcome,
					Err(err) => {
						obs::warn_absorbed(KIND, "fetch_profile", &err);

						Validation::from_error(&err)
					},
				}
			})
			.await;
		let recorded = if outcome.is_valid() { FlowOutcome::Success } else { FlowOutcome::Failure };

		obs::record_flow_outcome(KIND, recorded);

		outcome
	}

	async fn fetch_profile(&self, token: &TokenSecret) -> Result<Validation> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(self.descriptor.endpoints.profile.as_str())
			.header(AUTHORIZATION, token.bearer())
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle.call(request).await.map_err(|err| {
			self.transport_mapper.map_transport_error(Endpoint::Profile, meta.take().as_ref(), err)
		})?;
		let status = response.status();
		let body = response.body();

		if !status.is_success() {
			let reason = serde_json::from_slice::<ProfileErrorBody>(body)
				.ok()
				.and_then(|parsed| parsed.error_description)
				.unwrap_or_else(|| match oauth::preview_body(body) {
					preview if preview.is_empty() =>
						format!("Profile endpoint returned HTTP {}.", status.as_u16()),
					preview => preview,
				});

			return Ok(Validation::Invalid { kind: ErrorKind::UpstreamRejected, reason });
		}

		let profile = if body.is_empty() {
			serde_json::Value::Null
		} else {
			match serde_json::from_slice(body) {
				Ok(profile) => profile,
				Err(err) =>
					return Ok(Validation::Invalid {
						kind: ErrorKind::InvalidResponse,
						reason: format!("Profile endpoint returned malformed JSON: {err}."),
					}),
			}
		};

		Ok(Validation::Valid { profile })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validation_serializes_with_outcome_tag() {
		let invalid = Validation::Invalid {
			kind: ErrorKind::NoValidToken,
			reason: "No valid access token is available.".into(),
		};
		let payload = serde_json::to_value(&invalid).expect("Validation should serialize.");

		assert_eq!(payload["outcome"], "invalid");
		assert_eq!(payload["kind"], "no_valid_token");
		assert!(!invalid.is_valid());
		assert!(Validation::Valid { profile: serde_json::json!({"user_id": "u1"}) }.is_valid());
	}
}
