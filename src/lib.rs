//! Trust-boundary primitives for request gateways: HMAC message signing with replay windows,
//! stateless bearer tokens, and per-key token-bucket admission behind one dispatcher.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod obs;
#[cfg(feature = "reqwest")] pub mod proxy;
pub mod signature;
pub mod token;

mod validate;

#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{auth::Credential, config::GatewayConfig, gateway::Gateway};

	/// Fixed wall-clock instant used by deterministic signing and token tests.
	pub const T0: OffsetDateTime = time::macros::datetime!(2025-03-01 08:00 UTC);

	/// Shared secret used across fixtures.
	pub fn test_credential() -> Credential {
		Credential::from("gateway-test-secret")
	}

	/// Builds a gateway with a small admission cache.
	pub fn test_gateway() -> Gateway {
		Gateway::new(GatewayConfig::default().with_cache_capacity(64))
			.expect("Test gateway config should be valid.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken::Algorithm as TokenAlgorithm;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
