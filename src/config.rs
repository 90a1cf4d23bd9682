//! Client settings consumed by the token manager.
//!
//! The host decides where these values come from (environment, file, secret manager); the
//! manager only needs the deserialized [`ClientConfig`]. Incomplete settings never abort
//! construction: [`ClientConfig::report`] describes what is missing and every token operation
//! fails with [`ConfigError`] until the gap is fixed.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// OAuth client settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// OAuth client identifier.
	pub client_id: Option<String>,
	/// OAuth client secret.
	pub client_secret: Option<TokenSecret>,
	/// Durable offline refresh token used when neither the caller nor the store has one.
	pub refresh_token: Option<TokenSecret>,
	/// Scope requested by the client-credentials grant.
	pub client_credentials_scope: Option<String>,
	/// Scope placed on authorization URLs when the caller does not pass one.
	pub default_scope: Option<String>,
}
impl ClientConfig {
	/// Creates settings for a confidential client.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<TokenSecret>) -> Self {
		Self {
			client_id: Some(client_id.into()),
			client_secret: Some(client_secret.into()),
			..Default::default()
		}
	}

	/// Sets the fallback refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Sets the scope sent with client-credentials requests.
	pub fn with_client_credentials_scope(mut self, scope: impl Into<String>) -> Self {
		self.client_credentials_scope = Some(scope.into());

		self
	}

	/// Sets the scope used on authorization URLs when callers omit one.
	pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
		self.default_scope = Some(scope.into());

		self
	}

	/// Describes missing required settings and soft warnings.
	pub fn report(&self) -> ConfigReport {
		let mut missing_fields = Vec::new();
		let mut warnings = Vec::new();

		if self.configured_client_id().is_none() {
			missing_fields.push("client_id");
		}
		if self.configured_client_secret().is_none() {
			missing_fields.push("client_secret");
		}
		if self.fallback_refresh_token().is_none() {
			warnings.push(
				"No fallback refresh token is configured; the authorization flow must run after every restart."
					.to_owned(),
			);
		}

		ConfigReport { missing_fields, warnings }
	}

	pub(crate) fn client_id(&self) -> Result<&str> {
		self.configured_client_id().ok_or_else(|| ConfigError::MissingClientId.into())
	}

	pub(crate) fn client_secret(&self) -> Result<&str> {
		self.configured_client_secret().ok_or_else(|| ConfigError::MissingClientSecret.into())
	}

	pub(crate) fn fallback_refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref().filter(|token| !token.is_blank())
	}

	pub(crate) fn client_credentials_scope(&self) -> Option<&str> {
		non_blank(self.client_credentials_scope.as_deref())
	}

	pub(crate) fn default_scope(&self) -> Option<&str> {
		non_blank(self.default_scope.as_deref())
	}

	fn configured_client_id(&self) -> Option<&str> {
		non_blank(self.client_id.as_deref())
	}

	fn configured_client_secret(&self) -> Option<&str> {
		self.client_secret.as_ref().filter(|secret| !secret.is_blank()).map(TokenSecret::expose)
	}
}

/// Outcome of [`ClientConfig::report`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfigReport {
	/// Required settings that are absent or blank.
	pub missing_fields: Vec<&'static str>,
	/// Non-fatal observations about the settings.
	pub warnings: Vec<String>,
}
impl ConfigReport {
	/// Returns `true` when every required setting is present.
	pub fn is_complete(&self) -> bool {
		self.missing_fields.is_empty()
	}
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.filter(|value| !value.trim().is_empty())
}
