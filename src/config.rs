//! Gateway configuration with serde-friendly durations.

// std
use std::num::NonZeroUsize;
// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::DEFAULT_ISSUER,
	error::ValidationError,
	limiter::DEFAULT_CACHE_CAPACITY,
	signature::DEFAULT_REPLAY_WINDOW,
	token::{self, DEFAULT_TOKEN_ALGORITHM},
	validate,
};

/// Process-level settings consumed by [`Gateway`](crate::gateway::Gateway).
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
	/// Maximum number of admission buckets retained before LRU eviction.
	pub cache_capacity: usize,
	/// Issuer recorded in tokens whose request omits one.
	pub default_issuer: String,
	/// Token signing scheme used when the request omits one.
	pub default_token_algorithm: Algorithm,
	/// Replay window applied to message verification when the request omits one.
	#[serde(with = "humantime_serde")]
	pub replay_window: std::time::Duration,
}
impl GatewayConfig {
	/// Decodes a JSON configuration document, reporting the path of the first bad field.
	pub fn from_json_str(json: &str) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_str(json);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			ValidationError::Decode { path: e.path().to_string(), reason: e.inner().to_string() }
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Sets the admission cache capacity.
	pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
		self.cache_capacity = capacity;

		self
	}

	/// Sets the default token issuer.
	pub fn with_default_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.default_issuer = issuer.into();

		self
	}

	/// Sets the default token signing scheme.
	pub fn with_default_token_algorithm(mut self, algorithm: Algorithm) -> Self {
		self.default_token_algorithm = algorithm;

		self
	}

	/// Sets the default replay window.
	pub fn with_replay_window(mut self, window: std::time::Duration) -> Self {
		self.replay_window = window;

		self
	}

	/// Checks the settings for values the gateway cannot run with.
	pub fn validate(&self) -> Result<()> {
		if self.cache_capacity == 0 {
			return Err(ValidationError::NotPositive { field: "cache_capacity" }.into());
		}
		if self.default_issuer.is_empty() {
			return Err(ValidationError::Missing { field: "default_issuer" }.into());
		}
		if !token::supports_secret(self.default_token_algorithm) {
			return Err(Error::UnsupportedAlgorithm {
				algorithm: format!("{:?}", self.default_token_algorithm),
			});
		}

		self.replay_window()?;

		Ok(())
	}

	/// Capacity as the non-zero value the cache requires.
	pub fn cache_capacity(&self) -> Result<NonZeroUsize, ValidationError> {
		NonZeroUsize::new(self.cache_capacity)
			.ok_or(ValidationError::NotPositive { field: "cache_capacity" })
	}

	/// Replay window as a signed wall-clock duration.
	pub fn replay_window(&self) -> Result<Duration, ValidationError> {
		let window = validate::to_signed("replay_window", self.replay_window)?;

		validate::ensure_positive("replay_window", window)?;

		Ok(window)
	}
}
impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			cache_capacity: DEFAULT_CACHE_CAPACITY,
			default_issuer: DEFAULT_ISSUER.into(),
			default_token_algorithm: DEFAULT_TOKEN_ALGORITHM,
			replay_window: DEFAULT_REPLAY_WINDOW.unsigned_abs(),
		}
	}
}
