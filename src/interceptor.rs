//! Outbound-request bearer decoration with transparent refresh.
//!
//! [`Interceptor::bearer_token`] implements the qualifying flow: read the
//! session's token set, attach the stored access token verbatim while it
//! outlives the refresh margin (fast path, no network call), otherwise perform
//! exactly one `grant_type=refresh_token` exchange under a per-session
//! singleflight guard, persist the complete refreshed set, and hand back the new
//! access token. Refresh failures never escape; they degrade to "no token
//! attached" and surface downstream as the API's 401/403.
//! [`Interceptor::execute`] forwards the decorated request exactly once and
//! never retries after an observed 401.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{OidcFacade, TokenTypeHint, TransportErrorMapper},
	obs::{self, ExchangeKind, ExchangeOutcome, ExchangeSpan},
	provider::{ClientCredentials, ProviderConfig},
	session::{SessionId, TokenSecret, TokenSet},
	store::TokenStateStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
#[cfg(feature = "reqwest")]
use reqwest::header::{AUTHORIZATION, HeaderValue};

#[cfg(feature = "reqwest")]
/// Interceptor specialized for the crate's default reqwest transport stack.
pub type ReqwestInterceptor = Interceptor<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Decorates outbound requests for one protected API against one identity provider.
///
/// The interceptor owns no token state itself; it is a stateless transformation
/// over the session's [`TokenSet`] for the lifetime of one request. The injected
/// [`TokenStateStore`] is the only shared mutable resource, and the interceptor
/// mutates it only inside the exchange-then-persist sequence guarded per session.
///
/// Dropping a returned future cancels the in-flight exchange and store
/// operation; the store is written only after the complete token response has
/// been received, so cancellation never leaves a partial update behind.
#[derive(Clone)]
pub struct Interceptor<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for provider exchanges and request forwarding.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before classification.
	pub transport_mapper: Arc<M>,
	/// Per-session token state persistence.
	pub store: Arc<dyn TokenStateStore>,
	/// Identity provider endpoints and client authentication preference.
	pub provider: ProviderConfig,
	/// Injected OAuth 2.0 client credentials.
	pub credentials: ClientCredentials,
	/// Safety window subtracted from `expires_at` before the freshness compare.
	pub refresh_margin: Duration,
	/// Shared counters for refresh exchange outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	session_guards: Arc<Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> Interceptor<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Default safety margin between the freshness check and the token's use in flight.
	pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(60);

	/// Creates an interceptor that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn TokenStateStore>,
		provider: ProviderConfig,
		credentials: ClientCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			provider,
			credentials,
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			refresh_metrics: Default::default(),
			session_guards: Default::default(),
		}
	}

	/// Overrides the refresh margin (defaults to 60 seconds).
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Produces the bearer token to attach to one outbound request, refreshing if stale.
	///
	/// Returns `None` when no usable token can be obtained; the caller forwards
	/// the request unauthenticated and the downstream API answers 401/403. That
	/// signal is deliberately not swallowed here.
	pub async fn bearer_token(&self, session: &SessionId) -> Option<TokenSecret> {
		let current = self.read_tokens(session).await?;

		if current.is_fresh_at(OffsetDateTime::now_utc(), self.refresh_margin) {
			return Some(current.access_token);
		}

		let guard = self.session_guard(session);
		let _singleflight = guard.lock().await;
		// A concurrent request may have refreshed while this one awaited the guard.
		let current = self.read_tokens(session).await?;

		if current.is_fresh_at(OffsetDateTime::now_utc(), self.refresh_margin) {
			return Some(current.access_token);
		}

		match self.refresh_token_set(session, &current).await {
			Ok(refreshed) => Some(refreshed.access_token),
			Err(err) => {
				obs::warn_degraded(session, &err);

				None
			},
		}
	}

	/// Revokes the session's tokens (one call per token type) and clears the store.
	pub async fn sign_out(&self, session: &SessionId) -> Result<()> {
		const KIND: ExchangeKind = ExchangeKind::Revocation;

		let span = ExchangeSpan::new(KIND, "sign_out");

		obs::record_exchange_outcome(KIND, ExchangeOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Some(tokens) = self.store.read(session).await? else {
					// Nothing to revoke for an unauthenticated session.
					return Ok(());
				};
				let facade = self.facade()?;

				facade
					.revoke_token(tokens.access_token.expose(), TokenTypeHint::AccessToken)
					.await?;
				facade
					.revoke_token(tokens.refresh_token.expose(), TokenTypeHint::RefreshToken)
					.await?;
				self.store.clear(session).await?;

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_exchange_outcome(KIND, ExchangeOutcome::Success),
			Err(_) => obs::record_exchange_outcome(KIND, ExchangeOutcome::Failure),
		}

		result
	}

	async fn refresh_token_set(&self, session: &SessionId, current: &TokenSet) -> Result<TokenSet> {
		const KIND: ExchangeKind = ExchangeKind::Refresh;

		let span = ExchangeSpan::new(KIND, "refresh_token_set");

		obs::record_exchange_outcome(KIND, ExchangeOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let facade = self.facade()?;
				let minted = match facade.refresh_token(current.refresh_token.expose()).await {
					Ok(minted) => minted,
					Err(err) => {
						if matches!(err, Error::InvalidGrant { .. }) {
							// The refresh token is dead; drop the set so later
							// requests stop replaying a failing exchange.
							let _ = self.store.clear(session).await;
						}

						return Err(err);
					},
				};
				// Providers are free to omit rotation; the stored values carry
				// forward so the session keeps a complete set.
				let mut builder = TokenSet::builder()
					.access_token(minted.access_token)
					.expires_in(minted.expires_in);

				builder = match minted.refresh_token {
					Some(rotated) => builder.refresh_token(rotated),
					None => builder.refresh_token(current.refresh_token.expose()),
				};
				builder = match minted.identity_token {
					Some(rotated) => builder.identity_token(rotated),
					None => builder.identity_token(current.identity_token.expose()),
				};

				let refreshed = builder.build().map_err(ConfigError::from)?;

				// Persist only once the full set is in hand; the write replaces
				// the previous set in a single store operation.
				self.store.write(session, refreshed.clone()).await?;

				Ok(refreshed)
			})
			.await;

		match &result {
			Ok(_) => {
				self.refresh_metrics.record_success();
				obs::record_exchange_outcome(KIND, ExchangeOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_exchange_outcome(KIND, ExchangeOutcome::Failure);
			},
		}

		result
	}

	fn facade(&self) -> Result<OidcFacade<C, M>> {
		<OidcFacade<C, M>>::from_config(
			&self.provider,
			&self.credentials,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}

	async fn read_tokens(&self, session: &SessionId) -> Option<TokenSet> {
		match self.store.read(session).await {
			Ok(tokens) => tokens,
			Err(err) => {
				// An unreadable record is "no valid token", not a failure.
				obs::warn_degraded(session, &err.into());

				None
			},
		}
	}

	/// Returns (and creates on demand) the singleflight guard for a session.
	fn session_guard(&self, session: &SessionId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.session_guards.lock();

		guards.entry(session.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
#[cfg(feature = "reqwest")]
impl ReqwestInterceptor {
	/// Creates a new interceptor for the provided store, provider, and credentials.
	///
	/// The interceptor provisions its own reqwest-backed transport so callers do
	/// not need to pass HTTP handles explicitly.
	pub fn new(
		store: Arc<dyn TokenStateStore>,
		provider: ProviderConfig,
		credentials: ClientCredentials,
	) -> Self {
		Self::with_http_client(
			store,
			provider,
			credentials,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}

	/// Attaches the session's bearer token (refreshing if stale) and forwards the
	/// request to the underlying transport exactly once.
	///
	/// When no usable token exists the request proceeds without an
	/// `Authorization` header; that absence is a valid, deliberate state meaning
	/// "unauthenticated". The interceptor never retries after a refresh.
	pub async fn execute(
		&self,
		session: &SessionId,
		mut request: reqwest::Request,
	) -> reqwest::Result<reqwest::Response> {
		if let Some(token) = self.bearer_token(session).await
			&& let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
		{
			value.set_sensitive(true);
			request.headers_mut().insert(AUTHORIZATION, value);
		}

		self.http_client.0.execute(request).await
	}
}
impl<C, M> Debug for Interceptor<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Interceptor")
			.field("provider", &self.provider)
			.field("credentials", &self.credentials)
			.field("refresh_margin", &self.refresh_margin)
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn build_interceptor() -> ReqwestInterceptor {
		let provider = ProviderConfig::builder()
			.token_endpoint(
				Url::parse("https://idp.example.com/connect/token")
					.expect("Failed to parse token endpoint URL."),
			)
			.build()
			.expect("Failed to build provider configuration fixture.");

		ReqwestInterceptor::new(
			Arc::new(MemoryStore::default()),
			provider,
			ClientCredentials::new("gallery-client", "secret"),
		)
	}

	#[test]
	fn session_guards_are_shared_per_session() {
		let interceptor = build_interceptor();
		let session_a = SessionId::new("session-a").expect("Session fixture should be valid.");
		let session_b = SessionId::new("session-b").expect("Session fixture should be valid.");
		let first = interceptor.session_guard(&session_a);
		let second = interceptor.session_guard(&session_a);
		let other = interceptor.session_guard(&session_b);

		assert!(Arc::ptr_eq(&first, &second));
		assert!(!Arc::ptr_eq(&first, &other));
	}

	#[test]
	fn refresh_margin_clamps_negative_values() {
		let interceptor = build_interceptor().with_refresh_margin(Duration::seconds(-30));

		assert_eq!(interceptor.refresh_margin, Duration::ZERO);

		let interceptor = build_interceptor().with_refresh_margin(Duration::seconds(120));

		assert_eq!(interceptor.refresh_margin, Duration::seconds(120));
	}
}
