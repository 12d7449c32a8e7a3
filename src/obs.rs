//! Optional observability helpers for provider exchanges.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `bearer_interceptor.exchange` with the
//!   `exchange` (kind) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `bearer_interceptor_exchange_total` counter for every
//!   attempt/success/failure, labeled by `exchange` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Provider exchange kinds observed by the interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
	/// Refresh token exchange.
	Refresh,
	/// RFC 7009 revocation call.
	Revocation,
}
impl ExchangeKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExchangeKind::Refresh => "refresh",
			ExchangeKind::Revocation => "revocation",
		}
	}
}
impl Display for ExchangeKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Emits a structured warning when an exchange degrades instead of escalating.
pub(crate) fn warn_degraded(session: &str, err: &Error) {
	#[cfg(feature = "tracing")]
	{
		::tracing::warn!(session, error = %err, "Token refresh degraded; forwarding unauthenticated.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (session, err);
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeOutcome {
	/// Entry to an interceptor exchange helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the degradation path.
	Failure,
}
impl ExchangeOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExchangeOutcome::Attempt => "attempt",
			ExchangeOutcome::Success => "success",
			ExchangeOutcome::Failure => "failure",
		}
	}
}
impl Display for ExchangeOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
