//! Token-endpoint facade over the `oauth2` crate and upstream error mapping.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
	error::{ConfigError, ResponseError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{ClientAuthMethod, GrantType, ProviderDescriptor},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Upstream endpoint a request was addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// OAuth token endpoint.
	Token,
	/// Profile endpoint used for validation.
	Profile,
}
impl Endpoint {
	/// Human-readable label used in error messages.
	pub const fn label(self) -> &'static str {
		match self {
			Endpoint::Token => "the token endpoint",
			Endpoint::Profile => "the profile endpoint",
		}
	}
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into an [`Error`].
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		_metadata: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() =>
				ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) =>
				TransportError::network(endpoint.label(), *inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) =>
				TransportError::Io(std::io::Error::other(message)).into(),
			_ => TransportError::Io(std::io::Error::other(format!(
				"unrecognized HTTP client failure while calling {}",
				endpoint.label()
			)))
			.into(),
		}
	}
}

/// One-shot client for the token endpoint, built per operation from the current settings.
pub(crate) struct TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: &str,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	pub(crate) async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let redirect_url = RedirectUrl::new(redirect_uri.to_owned())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect_url))
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;
		let refresh_token = response.refresh_token().map(|token| TokenSecret::new(token.secret()));

		map_token_response(GrantType::AuthorizationCode, &response, refresh_token)
	}

	/// Exchanges `refresh_token`; the returned grant carries the rotated token when the
	/// provider sent one and `refresh_token` itself otherwise.
	pub(crate) async fn refresh(&self, refresh_token: &TokenSecret) -> Result<TokenGrant> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let secret = RefreshToken::new(refresh_token.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&secret)
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;
		let retained = response
			.refresh_token()
			.map(|token| TokenSecret::new(token.secret()))
			.filter(|token| !token.is_blank())
			.unwrap_or_else(|| refresh_token.clone());

		map_token_response(GrantType::RefreshToken, &response, Some(retained))
	}

	pub(crate) async fn client_credentials(&self, scope: Option<&str>) -> Result<TokenGrant> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();

		for value in scope.into_iter().flat_map(str::split_whitespace) {
			request = request.add_scope(Scope::new(value.to_owned()));
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_token_response(GrantType::ClientCredentials, &response, None)
	}
}

fn map_token_response(
	grant_type: GrantType,
	response: &BasicTokenResponse,
	refresh_token: Option<TokenSecret>,
) -> Result<TokenGrant> {
	let expires_in = response.expires_in().ok_or(ResponseError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ResponseError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ResponseError::NonPositiveExpiresIn.into());
	}

	Ok(TokenGrant::issued(
		grant_type,
		response.access_token().secret().as_str(),
		refresh_token,
		response.token_type().as_ref(),
		OffsetDateTime::now_utc(),
		Duration::seconds(expires_in),
	))
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();
	let rejected = meta_ref.is_some_and(ResponseMetadata::is_failure_status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(Endpoint::Token, meta_ref, error),
		RequestTokenError::Parse(_, body) if rejected => Error::UpstreamRejected {
			status: meta_status(meta_ref),
			error: None,
			description: preview_body(&body),
			retry_after: meta_retry_after(meta_ref),
		},
		RequestTokenError::Parse(source, _) =>
			ResponseError::Parse { source, status: meta_status(meta_ref) }.into(),
		RequestTokenError::Other(message) if rejected => Error::UpstreamRejected {
			status: meta_status(meta_ref),
			error: None,
			description: message,
			retry_after: meta_retry_after(meta_ref),
		},
		RequestTokenError::Other(message) =>
			ResponseError::Unexpected { message, status: meta_status(meta_ref) }.into(),
	}
}

fn map_server_response(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	let code = response.error().as_ref().to_owned();
	let description = response.error_description().cloned().unwrap_or_else(|| code.clone());

	Error::UpstreamRejected {
		status: meta_status(meta),
		error: Some(code),
		description,
		retry_after: meta_retry_after(meta),
	}
}

/// Lossy, length-capped rendering of a response body for diagnostics.
pub(crate) fn preview_body(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
		return trimmed.to_owned();
	}

	let mut buf = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::http::ReqwestHttpClient;

	fn descriptor(method: ClientAuthMethod) -> ProviderDescriptor {
		ProviderDescriptor::builder()
			.authorization_endpoint(
				Url::parse("https://example.com/ap/oa")
					.expect("Failed to parse authorization endpoint URL."),
			)
			.token_endpoint(
				Url::parse("https://example.com/auth/o2/token")
					.expect("Failed to parse token endpoint URL."),
			)
			.profile_endpoint(
				Url::parse("https://example.com/user/profile")
					.expect("Failed to parse profile endpoint URL."),
			)
			.client_auth_method(method)
			.build()
			.expect("Failed to build provider descriptor.")
	}

	#[test]
	fn builds_for_both_auth_methods() {
		for method in [ClientAuthMethod::ClientSecretBasic, ClientAuthMethod::ClientSecretPost] {
			let result =
				<TokenFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
					&descriptor(method),
					"client-id",
					"secret",
					Arc::new(ReqwestHttpClient::default()),
					Arc::new(ReqwestTransportErrorMapper),
				);

			assert!(result.is_ok());
		}
	}

	#[test]
	fn server_response_keeps_description_and_status() {
		let response: BasicErrorResponse = serde_json::from_str(
			r#"{"error":"invalid_grant","error_description":"The request has an invalid grant parameter : code"}"#,
		)
		.expect("Error response fixture should deserialize.");
		let meta = ResponseMetadata { status: Some(400), retry_after: None };

		match map_server_response(response, Some(&meta)) {
			Error::UpstreamRejected { status, error, description, .. } => {
				assert_eq!(status, Some(400));
				assert_eq!(error.as_deref(), Some("invalid_grant"));
				assert_eq!(description, "The request has an invalid grant parameter : code");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn body_preview_is_capped() {
		let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = preview_body(body.as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(preview_body(b"  short  "), "short");
	}
}
