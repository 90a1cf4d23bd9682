//! The interactive-session credential triple and its status projection.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access token, refresh token, and absolute expiry held for the interactive session.
///
/// The access token counts as valid only while `expires_at` is set and strictly later than the
/// observed instant; an unset expiry is always expired.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Current access token; callers outside the manager must not read it directly.
	pub access_token: Option<TokenSecret>,
	/// Long-lived refresh token, retained across refreshes that do not rotate it.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry computed from the grant's `expires_in`.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Creates a populated credential.
	pub fn new(
		access_token: impl Into<TokenSecret>,
		refresh_token: Option<TokenSecret>,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { access_token: Some(access_token.into()), refresh_token, expires_at: Some(expires_at) }
	}

	/// Returns `true` when no field is populated.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none() && self.expires_at.is_none()
	}

	/// Returns `true` if the access token is unusable at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|expires_at| expires_at <= instant)
	}

	/// Returns `true` if the access token is unusable now.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns the access token only while it is still valid at `instant`.
	pub fn valid_access_token_at(&self, instant: OffsetDateTime) -> Option<&TokenSecret> {
		if self.is_expired_at(instant) {
			return None;
		}

		self.access_token.as_ref()
	}

	/// Projects the credential into a [`TokenStatus`] at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		TokenStatus {
			has_access_token: self.access_token.is_some(),
			has_refresh_token: self.refresh_token.is_some(),
			is_expired: self.is_expired_at(instant),
			expires_at: self.expires_at,
		}
	}

	/// Projects the credential into a [`TokenStatus`] using the current clock.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Read-only snapshot of the credential suitable for status endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
	/// Whether an access token is stored, regardless of expiry.
	pub has_access_token: bool,
	/// Whether a refresh token is stored.
	pub has_refresh_token: bool,
	/// Whether the access token is unusable (unset or past expiry).
	pub is_expired: bool,
	/// Absolute expiry, if one is recorded.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn unset_expiry_is_always_expired() {
		let credential = Credential {
			access_token: Some(TokenSecret::new("access")),
			refresh_token: None,
			expires_at: None,
		};

		assert!(credential.is_expired_at(macros::datetime!(1970-01-01 00:00 UTC)));
		assert!(credential.valid_access_token_at(macros::datetime!(1970-01-01 00:00 UTC)).is_none());
	}

	#[test]
	fn expiry_boundary_is_exclusive() {
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let credential = Credential::new("access", None, expires);

		assert!(!credential.is_expired_at(macros::datetime!(2025-01-01 00:59:59 UTC)));
		assert!(credential.is_expired_at(expires));
		assert_eq!(
			credential
				.valid_access_token_at(macros::datetime!(2025-01-01 00:30 UTC))
				.map(TokenSecret::expose),
			Some("access")
		);
	}

	#[test]
	fn empty_status_serializes_null_expiry() {
		let status = Credential::default().status();

		assert_eq!(
			status,
			TokenStatus {
				has_access_token: false,
				has_refresh_token: false,
				is_expired: true,
				expires_at: None,
			}
		);

		let payload = serde_json::to_value(&status).expect("Status should serialize to JSON.");

		assert_eq!(
			payload,
			serde_json::json!({
				"hasAccessToken": false,
				"hasRefreshToken": false,
				"isExpired": true,
				"expiresAt": null,
			})
		);
	}

	#[test]
	fn debug_redacts_secrets() {
		let credential = Credential::new(
			"access-secret",
			Some(TokenSecret::new("refresh-secret")),
			macros::datetime!(2025-01-01 01:00 UTC),
		);
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
	}
}
