//! Thread-safe in-memory [`TokenStateStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	session::{SessionId, TokenSet},
	store::{StoreError, StoreFuture, TokenStateStore},
};

type StoreMap = Arc<RwLock<HashMap<SessionId, TokenSet>>>;

/// Thread-safe storage backend that keeps token sets in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn read_now(map: StoreMap, session: SessionId) -> Option<TokenSet> {
		map.read().get(&session).cloned()
	}

	fn write_now(map: StoreMap, session: SessionId, tokens: TokenSet) -> Result<(), StoreError> {
		map.write().insert(session, tokens);

		Ok(())
	}

	fn clear_now(map: StoreMap, session: SessionId) -> Option<TokenSet> {
		map.write().remove(&session)
	}
}
impl TokenStateStore for MemoryStore {
	fn read<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<TokenSet>> {
		let map = self.0.clone();
		let session = session.to_owned();

		Box::pin(async move { Ok(Self::read_now(map, session)) })
	}

	fn write<'a>(&'a self, session: &'a SessionId, tokens: TokenSet) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let session = session.to_owned();

		Box::pin(async move { Self::write_now(map, session, tokens) })
	}

	fn clear<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<TokenSet>> {
		let map = self.0.clone();
		let session = session.to_owned();

		Box::pin(async move { Ok(Self::clear_now(map, session)) })
	}
}
