//! Internal OAuth client facade abstractions.
//!
//! [`OidcFacade`] wraps the `oauth2` crate with a token response type that also
//! carries the provider's `id_token`, performs the `grant_type=refresh_token`
//! exchange, and issues RFC 7009 revocation calls through the same instrumented
//! transport. Provider failures are classified into the crate error taxonomy
//! (invalid grant, invalid client, transient, transport).

pub use oauth2;

// crates.io
use base64::Engine;
use oauth2::{
	AsyncHttpClient, AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ExtraTokenFields, HttpClientError, RefreshToken, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{ClientAuthMethod, ClientCredentials, ProviderConfig},
};

/// Extra token response fields carrying the provider's OpenID Connect `id_token`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct IdentityTokenFields {
	/// Identity token minted alongside the access/refresh pair, when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdentityTokenFields {}
impl Debug for IdentityTokenFields {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityTokenFields")
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

type OidcTokenResponse = StandardTokenResponse<IdentityTokenFields, BasicTokenType>;
type OidcClient<
	HasAuthUrl = EndpointNotSet,
	HasDeviceAuthUrl = EndpointNotSet,
	HasIntrospectionUrl = EndpointNotSet,
	HasRevocationUrl = EndpointNotSet,
	HasTokenUrl = EndpointNotSet,
> = Client<
	BasicErrorResponse,
	OidcTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	HasAuthUrl,
	HasDeviceAuthUrl,
	HasIntrospectionUrl,
	HasRevocationUrl,
	HasTokenUrl,
>;
type ConfiguredOidcClient =
	OidcClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Maps HTTP transport failures into interceptor [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

/// Token material minted by one refresh exchange.
///
/// `refresh_token` and `identity_token` are optional because providers are free
/// to omit rotation; the interceptor carries the stored values forward in that
/// case so the session's set stays complete.
pub(crate) struct MintedTokens {
	pub access_token: String,
	pub refresh_token: Option<String>,
	pub identity_token: Option<String>,
	pub expires_in: Duration,
}

/// Token types revocable through the RFC 7009 endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenTypeHint {
	AccessToken,
	RefreshToken,
}
impl TokenTypeHint {
	fn as_str(self) -> &'static str {
		match self {
			TokenTypeHint::AccessToken => "access_token",
			TokenTypeHint::RefreshToken => "refresh_token",
		}
	}
}

pub(crate) struct OidcFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredOidcClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	config: ProviderConfig,
	credentials: ClientCredentials,
}
impl<C, M> OidcFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_config(
		config: &ProviderConfig,
		credentials: &ClientCredentials,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(config.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut oauth_client = OidcClient::new(ClientId::new(credentials.client_id().to_owned()))
			.set_client_secret(ClientSecret::new(credentials.client_secret().to_owned()))
			.set_token_uri(token_url);

		if matches!(config.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			config: config.clone(),
			credentials: credentials.clone(),
		})
	}

	/// Performs one `grant_type=refresh_token` exchange against the token endpoint.
	pub(crate) async fn refresh_token(&self, refresh_token: &str) -> Result<MintedTokens> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&refresh_secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_refresh_token_response(response)
	}

	/// Issues one RFC 7009 revocation call for the provided token.
	pub(crate) async fn revoke_token(&self, token: &str, hint: TokenTypeHint) -> Result<()> {
		let endpoint = self
			.config
			.endpoints
			.revocation
			.as_ref()
			.ok_or(ConfigError::MissingRevocationEndpoint)?;
		let request = self.build_revocation_request(endpoint, token, hint)?;
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = instrumented
			.call(request)
			.await
			.map_err(|err| self.error_mapper.map_transport_error(meta.take().as_ref(), err))?;
		let status = response.status();

		if status.is_success() {
			return Ok(());
		}

		let reply: ProviderErrorReply = serde_json::from_slice(response.body()).unwrap_or_default();

		Err(classify_provider_error(
			Some(status.as_u16()),
			reply.error.as_deref(),
			reply.error_description.as_deref(),
			"Revocation endpoint rejected the request",
		))
	}

	fn build_revocation_request(
		&self,
		endpoint: &Url,
		token: &str,
		hint: TokenTypeHint,
	) -> Result<oauth2::HttpRequest> {
		let mut form = vec![("token", token), ("token_type_hint", hint.as_str())];
		let client_id = self.credentials.client_id();
		let client_secret = self.credentials.client_secret();
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(endpoint.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json");

		match self.config.client_auth_method {
			ClientAuthMethod::ClientSecretBasic => {
				let raw = format!("{client_id}:{client_secret}");
				let encoded = base64::engine::general_purpose::STANDARD.encode(raw);

				builder = builder.header(AUTHORIZATION, format!("Basic {encoded}"));
			},
			ClientAuthMethod::ClientSecretPost => {
				form.push(("client_id", client_id));
				form.push(("client_secret", client_secret));
			},
		}

		let body = url::form_urlencoded::Serializer::new(String::new())
			.extend_pairs(form)
			.finish()
			.into_bytes();

		builder.body(body).map_err(|e| ConfigError::from(e).into())
	}
}
impl<C, M> Debug for OidcFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcFacade")
			.field("config", &self.config)
			.field("credentials", &self.credentials)
			.finish()
	}
}

fn map_refresh_token_response(response: OidcTokenResponse) -> Result<MintedTokens> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(MintedTokens {
		access_token: response.access_token().secret().to_owned(),
		refresh_token: response.refresh_token().map(|token| token.secret().to_owned()),
		identity_token: response.extra_fields().id_token.clone(),
		expires_in: Duration::seconds(expires_in),
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => classify_provider_error(
			meta_status(meta_ref),
			Some(response.error().as_ref()),
			response.error_description().map(String::as_str),
			"Token endpoint returned an OAuth error",
		),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message: format!("Token endpoint returned an unexpected response: {message}"),
			status: meta_status(meta_ref),
		}
		.into(),
	}
}

/// Minimal OAuth error payload shape used when a provider replies outside the
/// `oauth2` crate's typed paths (revocation endpoint responses).
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorReply {
	error: Option<String>,
	error_description: Option<String>,
}

/// Classifies a provider rejection into the crate taxonomy, preferring the
/// structured OAuth `error` field, then `error_description`, then the HTTP status.
fn classify_provider_error(
	status: Option<u16>,
	oauth_error: Option<&str>,
	error_description: Option<&str>,
	context: &str,
) -> Error {
	let message = match (oauth_error, error_description) {
		(_, Some(description)) => format!("{context}: {description}"),
		(Some(error), None) => format!("{context}: {error}"),
		(None, None) => context.to_owned(),
	};

	if let Some(kind) = oauth_error
		.and_then(match_exact_value)
		.or_else(|| error_description.and_then(match_exact_value))
	{
		return build_classified(kind, message, status);
	}

	build_classified(classify_status(status), message, status)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProviderErrorKind {
	InvalidGrant,
	InvalidClient,
	Transient,
}

fn build_classified(kind: ProviderErrorKind, message: String, status: Option<u16>) -> Error {
	match kind {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason: message },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason: message },
		ProviderErrorKind::Transient =>
			TransientError::TokenEndpoint { message, status }.into(),
	}
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant") || value.eq_ignore_ascii_case("access_denied") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(ProviderErrorKind::InvalidClient)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(429) => ProviderErrorKind::Transient,
		Some(code) if code >= 500 => ProviderErrorKind::Transient,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	TransientError::TokenEndpoint {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
		status: meta_status(meta),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message: "HTTP client error occurred while calling the token endpoint".into(),
		status: meta_status(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
