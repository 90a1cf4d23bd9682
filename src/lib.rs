//! OAuth 2.0 token lifecycle manager for a marketplace order gateway: code exchange,
//! refresh-before-expiry with a singleflight guard, client-credentials tokens, and a TTL response
//! cache behind one route-facing boundary.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod flows;
pub mod gateway;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::ClientConfig,
		flows::{ReqwestTokenManager, TokenManager},
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::ProviderDescriptor,
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

	/// Builds a descriptor whose endpoints all live under `base_url` (e.g. an `httpmock` server).
	pub fn test_descriptor(base_url: &str) -> ProviderDescriptor {
		let endpoint = |path: &str| {
			Url::parse(&format!("{base_url}{path}")).expect("Failed to parse mock endpoint URL.")
		};

		ProviderDescriptor::builder()
			.authorization_endpoint(endpoint("/ap/oa"))
			.token_endpoint(endpoint("/auth/o2/token"))
			.profile_endpoint(endpoint("/user/profile"))
			.build()
			.expect("Failed to build mock provider descriptor.")
	}

	/// Constructs a [`TokenManager`] backed by the reqwest transport used across integration
	/// tests.
	pub fn build_reqwest_test_manager(
		descriptor: ProviderDescriptor,
		config: ClientConfig,
	) -> ReqwestTokenManager {
		TokenManager::with_http_client(
			descriptor,
			config,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
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
pub use serde_json;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
