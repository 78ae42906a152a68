//! Authenticated-request core for the ProjectX trading gateway: token renewal, on-disk sessions,
//! call pacing, and classified retries behind a single `execute` primitive.
//!
//! Every remote call flows through [`executor::RequestExecutor::execute`], which paces the call
//! with [`rate_limit::RateLimiter`], obtains a valid token from [`token::TokenManager`], and
//! retries transient failures according to [`retry::RetryPolicy`]. Domain endpoints on
//! [`client::Client`] are thin pass-throughs over that primitive.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "reqwest")] pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http;
pub mod obs;
pub mod rate_limit;
pub mod retry;
pub mod store;
pub mod token;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by the integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Credentials, Username},
		client::Client,
		config::ClientConfig,
		retry::RetryPolicy,
		store::{MemoryStore, SessionStore},
	};

	/// Principal used by integration-test fixtures.
	pub const TEST_USERNAME: &str = "trader-it";
	/// API key used by integration-test fixtures.
	pub const TEST_API_KEY: &str = "key-it";

	/// Builds credentials for [`TEST_USERNAME`].
	pub fn test_credentials() -> Credentials {
		let username =
			Username::new(TEST_USERNAME).expect("Test username fixture should be valid.");

		Credentials::new(username, TEST_API_KEY)
	}

	/// Builds a configuration pointed at a mock server with fast pacing and short backoff.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::new(test_credentials())
			.expect("Default client configuration should build.")
			.with_base_url(base_url)
			.expect("Mock server URL should parse.")
			.with_min_interval(StdDuration::ZERO)
			.with_validate_interval(None)
			.with_retry(RetryPolicy::new(3, StdDuration::from_millis(5)))
			.with_auth_retry(RetryPolicy::new(2, StdDuration::from_millis(5)))
			.with_request_timeout(StdDuration::from_secs(2))
	}

	/// Builds a [`Client`] backed by an isolated in-memory session store.
	pub fn build_test_client(config: ClientConfig) -> (Client, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let client = Client::with_store(config, store).expect("Test client should build.");

		(client, store_backend)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
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
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};
