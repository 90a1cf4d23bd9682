//! Token material returned by a successful grant.

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	provider::GrantType,
};

/// Tokens issued by the token endpoint for one grant.
///
/// `refresh_token` is absent for client-credentials grants. For refresh grants it carries the
/// rotated token when the provider sent one, or the token that was used otherwise.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Bearer access token.
	pub access_token: TokenSecret,
	/// Refresh token associated with this grant, if any.
	pub refresh_token: Option<TokenSecret>,
	/// Lifetime reported by the provider.
	#[serde(with = "expires_in_seconds")]
	pub expires_in: Duration,
	/// Absolute expiry computed from the issuance instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
	/// Token type reported by the provider (normally `bearer`).
	pub token_type: String,
	/// Grant that produced these tokens.
	pub grant_type: GrantType,
}
impl TokenGrant {
	/// Assembles a grant issued at `issued_at` with a positive `expires_in`.
	pub fn issued(
		grant_type: GrantType,
		access_token: impl Into<TokenSecret>,
		refresh_token: Option<TokenSecret>,
		token_type: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token,
			expires_in,
			expires_at: issued_at + expires_in,
			token_type: token_type.into(),
			grant_type,
		}
	}

	/// Converts the grant into the credential the store keeps.
	pub fn to_credential(&self) -> Credential {
		Credential {
			access_token: Some(self.access_token.clone()),
			refresh_token: self.refresh_token.clone(),
			expires_at: Some(self.expires_at),
		}
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("expires_at", &self.expires_at)
			.field("token_type", &self.token_type)
			.field("grant_type", &self.grant_type)
			.finish()
	}
}

mod expires_in_seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
