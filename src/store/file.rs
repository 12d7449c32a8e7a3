//! Simple file-backed [`TokenStateStore`] for lightweight deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	session::{SessionId, TokenSet},
	store::{StoreError, StoreFuture, TokenStateStore},
};

/// Persists session token sets to a JSON snapshot after each mutation.
///
/// The snapshot is replaced via write-to-temp-then-rename, so readers of the
/// file never observe a partially written set.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<SessionId, TokenSet>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<SessionId, TokenSet>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		let entries: Vec<(SessionId, TokenSet)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<SessionId, TokenSet>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStateStore for FileStore {
	fn read<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<TokenSet>> {
		Box::pin(async move { Ok(self.inner.read().get(session).cloned()) })
	}

	fn write<'a>(&'a self, session: &'a SessionId, tokens: TokenSet) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(session.clone(), tokens);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn clear<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<TokenSet>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let removed = guard.remove(session);

			if removed.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(removed)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"bearer_interceptor_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_set(access: &str) -> TokenSet {
		TokenSet::builder()
			.access_token(access)
			.refresh_token("refresh-token")
			.identity_token("identity-token")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test token set.")
	}

	#[test]
	fn write_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let session = SessionId::new("session-demo").expect("Failed to build session fixture.");
		let tokens = build_set("access-token");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.write(&session, tokens.clone()))
			.expect("Failed to write fixture token set to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.read(&session))
			.expect("Failed to read fixture token set from file store.")
			.expect("File store lost token set after reopen.");

		assert_eq!(fetched.access_token.expose(), tokens.access_token.expose());
		assert_eq!(fetched.expires_at, tokens.expires_at);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_removes_the_session_entry() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let session = SessionId::new("session-clear").expect("Failed to build session fixture.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.write(&session, build_set("access-clear")))
			.expect("Failed to write fixture token set to file store.");

		let removed = rt
			.block_on(store.clear(&session))
			.expect("Failed to clear fixture token set from file store.");

		assert!(removed.is_some());

		let empty =
			rt.block_on(store.read(&session)).expect("Read after clear should still succeed.");

		assert!(empty.is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
