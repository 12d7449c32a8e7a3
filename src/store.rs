//! Storage contracts and built-in token state store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	session::{SessionId, TokenSet},
};

/// Persistence contract future for session token sets.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable per-session record of the current token set.
///
/// Implementations must make `write` atomic from the perspective of subsequent
/// `read`s on the same session: a concurrent reader observes either the previous
/// complete set or the replacement, never a partial overwrite.
pub trait TokenStateStore
where
	Self: Send + Sync,
{
	/// Fetches the token set owned by the session, if present.
	fn read<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<TokenSet>>;

	/// Persists or replaces the session's token set in one operation.
	fn write<'a>(&'a self, session: &'a SessionId, tokens: TokenSet) -> StoreFuture<'a, ()>;

	/// Removes the session's token set, returning the removed set if one existed.
	fn clear<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<TokenSet>>;
}

/// Error type produced by [`TokenStateStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
