//! Token set model, freshness helpers, and builder.

// self
use crate::{_prelude::*, session::secret::TokenSecret};

/// Errors produced by [`TokenSetBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenSetBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no identity token value was provided.
	#[error("Identity token is required.")]
	MissingIdentityToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Complete set of credentials owned by one authenticated session.
///
/// A session either holds all four fields or no set at all; partially populated
/// state is unrepresentable. The identity token rides along even though it plays
/// no part in authorization, because the provider mints a fresh one per exchange
/// and other session consumers read it.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
	/// Short-lived credential attached as `Authorization: Bearer <token>`.
	pub access_token: TokenSecret,
	/// Longer-lived credential used to mint a new access token.
	pub refresh_token: TokenSecret,
	/// Credential asserting end-user identity claims.
	pub identity_token: TokenSecret,
	/// Expiry instant of the access token, always UTC.
	pub expires_at: OffsetDateTime,
}
impl TokenSet {
	/// Returns a builder for constructing complete token sets.
	pub fn builder() -> TokenSetBuilder {
		TokenSetBuilder::new()
	}

	/// Returns `true` when the access token outlives `instant` by more than `margin`.
	///
	/// The margin guards against the token expiring in flight between the check
	/// and its use downstream. A negative margin is treated as zero.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		let margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self.expires_at - margin > instant
	}

	/// Convenience helper that checks freshness against the current UTC instant.
	pub fn is_fresh(&self, margin: Duration) -> bool {
		self.is_fresh_at(OffsetDateTime::now_utc(), margin)
	}
}
impl Debug for TokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSet")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("identity_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenSet`].
#[derive(Clone, Debug, Default)]
pub struct TokenSetBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	identity_token: Option<TokenSecret>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenSetBuilder {
	fn new() -> Self {
		Self::default()
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the identity token value.
	pub fn identity_token(mut self, token: impl Into<String>) -> Self {
		self.identity_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the current UTC instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`TokenSet`].
	pub fn build(self) -> Result<TokenSet, TokenSetBuilderError> {
		let access_token = self.access_token.ok_or(TokenSetBuilderError::MissingAccessToken)?;
		let refresh_token = self.refresh_token.ok_or(TokenSetBuilderError::MissingRefreshToken)?;
		let identity_token =
			self.identity_token.ok_or(TokenSetBuilderError::MissingIdentityToken)?;
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => OffsetDateTime::now_utc() + delta,
			(None, None) => return Err(TokenSetBuilderError::MissingExpiry),
		};

		Ok(TokenSet { access_token, refresh_token, identity_token, expires_at })
	}
}
