//! Provider descriptor data structures shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant labels used on the wire and in observability.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::_prelude::*;

const LWA_AUTHORIZATION_URL: &str = "https://www.amazon.com/ap/oa";
const LWA_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
const LWA_PROFILE_URL: &str = "https://api.amazon.com/user/profile";

/// How the client proves its identity to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Browser redirect target that starts the Authorization Code flow.
	pub authorization: Url,
	/// Token endpoint used for exchanges, refreshes, and client credentials.
	pub token: Url,
	/// Profile endpoint used to validate a bearer token.
	pub profile: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Client authentication mechanism for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new()
	}

	/// Descriptor for Login with Amazon, the marketplace's identity service.
	pub fn login_with_amazon() -> Result<Self, ProviderDescriptorError> {
		Self::builder()
			.authorization_endpoint(parse_preset(LWA_AUTHORIZATION_URL)?)
			.token_endpoint(parse_preset(LWA_TOKEN_URL)?)
			.profile_endpoint(parse_preset(LWA_PROFILE_URL)?)
			.client_auth_method(ClientAuthMethod::ClientSecretPost)
			.build()
	}
}

fn parse_preset(raw: &'static str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw).map_err(|_| ProviderDescriptorError::InvalidUrl { url: raw.to_owned() })
}
