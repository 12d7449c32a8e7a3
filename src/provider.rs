//! Identity provider configuration consumed by the refresh and revocation exchanges.
//!
//! The interceptor talks to exactly one authorization server, described by a
//! validated [`ProviderConfig`] (HTTPS-only endpoints, client authentication
//! preference). Client credentials are injected via [`ClientCredentials`] rather
//! than hardcoded at the call site.

// self
use crate::_prelude::*;

/// Preferred client authentication modes for token and revocation endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Token endpoint used for refresh exchanges.
	pub token: Url,
	/// Optional RFC 7009 revocation endpoint, required only for sign-out.
	pub revocation: Option<Url>,
}

/// Immutable provider configuration consumed by the interceptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Preferred client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderConfig {
	/// Creates a new builder.
	pub fn builder() -> ProviderConfigBuilder {
		ProviderConfigBuilder::new()
	}
}

/// Errors raised while constructing or validating provider configurations.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderConfigError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug, Default)]
pub struct ProviderConfigBuilder {
	/// Token endpoint used for refresh exchanges.
	pub token_endpoint: Option<Url>,
	/// Optional revocation endpoint.
	pub revocation_endpoint: Option<Url>,
	/// Preferred client authentication method.
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderConfigBuilder {
	fn new() -> Self {
		Self::default()
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the optional revocation endpoint.
	pub fn revocation_endpoint(mut self, url: Url) -> Self {
		self.revocation_endpoint = Some(url);

		self
	}

	/// Overrides the preferred client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ProviderConfigError> {
		let token = self.token_endpoint.ok_or(ProviderConfigError::MissingTokenEndpoint)?;

		validate_endpoint("token", &token)?;

		if let Some(revocation) = self.revocation_endpoint.as_ref() {
			validate_endpoint("revocation", revocation)?;
		}

		Ok(ProviderConfig {
			endpoints: ProviderEndpoints { token, revocation: self.revocation_endpoint },
			client_auth_method: self.client_auth_method,
		})
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderConfigError> {
	if url.scheme() != "https" {
		Err(ProviderConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

/// Static OAuth 2.0 client credentials, configured out-of-band and injected.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
	client_id: String,
	client_secret: String,
}
impl ClientCredentials {
	/// Creates a credential pair for a confidential client.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: client_secret.into() }
	}

	/// Returns the OAuth 2.0 client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns the client secret. Callers must avoid logging this string.
	pub fn client_secret(&self) -> &str {
		&self.client_secret
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse provider test URL.")
	}

	#[test]
	fn builder_requires_token_endpoint() {
		let err = ProviderConfig::builder()
			.build()
			.expect_err("Builder should reject a configuration without a token endpoint.");

		assert!(matches!(err, ProviderConfigError::MissingTokenEndpoint));
	}

	#[test]
	fn builder_rejects_insecure_endpoints() {
		let err = ProviderConfig::builder()
			.token_endpoint(url("http://idp.example.com/connect/token"))
			.build()
			.expect_err("Builder should reject insecure token endpoints.");

		assert!(matches!(err, ProviderConfigError::InsecureEndpoint { endpoint: "token", .. }));

		let err = ProviderConfig::builder()
			.token_endpoint(url("https://idp.example.com/connect/token"))
			.revocation_endpoint(url("http://idp.example.com/connect/revocation"))
			.build()
			.expect_err("Builder should reject insecure revocation endpoints.");

		assert!(matches!(
			err,
			ProviderConfigError::InsecureEndpoint { endpoint: "revocation", .. }
		));
	}

	#[test]
	fn builder_accepts_https_endpoints() {
		let config = ProviderConfig::builder()
			.token_endpoint(url("https://idp.example.com/connect/token"))
			.revocation_endpoint(url("https://idp.example.com/connect/revocation"))
			.client_auth_method(ClientAuthMethod::ClientSecretPost)
			.build()
			.expect("Builder should succeed for secure endpoints.");

		assert_eq!(config.endpoints.token.as_str(), "https://idp.example.com/connect/token");
		assert_eq!(
			config
				.endpoints
				.revocation
				.as_ref()
				.expect("Revocation endpoint should be populated when configured.")
				.as_str(),
			"https://idp.example.com/connect/revocation",
		);
		assert_eq!(config.client_auth_method, ClientAuthMethod::ClientSecretPost);
	}

	#[test]
	fn credentials_debug_redacts_the_secret() {
		let credentials = ClientCredentials::new("gallery-client", "top-secret");
		let rendered = format!("{credentials:?}");

		assert!(rendered.contains("gallery-client"));
		assert!(!rendered.contains("top-secret"), "Debug output must not leak the client secret.");
	}
}
