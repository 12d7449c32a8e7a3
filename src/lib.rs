//! Session-scoped bearer interceptor—attach a valid `Authorization: Bearer` header to every
//! outbound API call, transparently refreshing OAuth 2.0 token sets under per-session
//! singleflight guards and re-persisting them through a pluggable token state store.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod error;
pub mod http;
pub mod interceptor;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod session;
pub mod store;
#[cfg(feature = "reqwest")]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		interceptor::ReqwestInterceptor,
		provider::{ClientCredentials, ProviderConfig},
		store::{MemoryStore, TokenStateStore},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`ReqwestInterceptor`] backed by an in-memory store and the insecure
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_interceptor(
		provider: ProviderConfig,
		client_id: &str,
		client_secret: &str,
	) -> (ReqwestInterceptor, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStateStore> = store_backend.clone();
		let interceptor = ReqwestInterceptor::with_http_client(
			store,
			provider,
			ClientCredentials::new(client_id, client_secret),
			test_reqwest_http_client(),
			Arc::new(crate::oauth::ReqwestTransportErrorMapper),
		);

		(interceptor, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
