//! Per-key admission control backed by lazily created token buckets.
//!
//! [`AdmissionLimiter`] owns one [`AdmissionCache`] for the life of the process. The first call
//! for a key atomically installs a bucket built from that call's `rate`/`burst`; later calls reuse
//! it unchanged until the entry expires or is evicted. Negative `rate` or `burst` disables
//! limiting for the call without touching the cache.

pub mod bucket;
pub mod cache;

mod metrics;

pub use bucket::*;
pub use cache::*;
pub use metrics::*;

// std
use std::num::NonZeroUsize;
// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::LimiterKey,
	context::{CallContext, CancelReason},
	error::ValidationError,
	validate::{self, require},
};

/// How a call behaves when the bucket is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitMode {
	/// Reject immediately with [`Error::TooManyRequests`].
	#[default]
	Immediate,
	/// Suspend until a token is available or the call's context is done.
	Wait,
}
impl From<bool> for WaitMode {
	fn from(wait: bool) -> Self {
		if wait { Self::Wait } else { Self::Immediate }
	}
}

/// Admission-check record (`key`, `expiration` required).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AdmissionRequest {
	/// Name of the throttled resource.
	#[serde(default, alias = "name")]
	pub key: Option<String>,
	/// Refill rate in tokens per second; negative disables limiting.
	#[serde(default, alias = "limit")]
	pub rate: f64,
	/// Bucket capacity; negative disables limiting.
	#[serde(default)]
	pub burst: i64,
	/// How long a bucket survives in the cache, as a duration string.
	#[serde(default)]
	pub expiration: Option<String>,
	/// Wait for a token instead of rejecting.
	#[serde(default, alias = "wait")]
	pub wait_mode: bool,
}
impl AdmissionRequest {
	/// Creates an immediate-mode request for `key`.
	pub fn new(key: impl Into<String>, rate: f64, burst: i64, expiration: impl Into<String>) -> Self {
		Self {
			key: Some(key.into()),
			rate,
			burst,
			expiration: Some(expiration.into()),
			wait_mode: false,
		}
	}

	/// Switches the request to waiting mode.
	pub fn waiting(mut self) -> Self {
		self.wait_mode = true;

		self
	}

	/// Validates the record into typed admission parameters.
	pub fn into_params(self) -> Result<AdmissionParams, ValidationError> {
		let key = LimiterKey::new(require("key", self.key.as_deref())?)?;
		let expiration = require("expiration", self.expiration.as_deref())?;
		let expiration = validate::parse_positive_duration("expiration", expiration)?;

		if self.rate.is_nan() {
			return Err(ValidationError::Malformed { field: "rate", reason: "NaN".into() });
		}

		Ok(AdmissionParams {
			key,
			rate: self.rate,
			burst: self.burst,
			expiration,
			wait: self.wait_mode.into(),
		})
	}
}

/// Validated admission parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct AdmissionParams {
	/// Name of the throttled resource.
	pub key: LimiterKey,
	/// Refill rate in tokens per second.
	pub rate: f64,
	/// Bucket capacity.
	pub burst: i64,
	/// Idle lifetime of the cache entry.
	pub expiration: std::time::Duration,
	/// Behavior on an empty bucket.
	pub wait: WaitMode,
}
impl AdmissionParams {
	/// Returns `true` when the parameters switch limiting off for this call.
	pub fn is_disabled(&self) -> bool {
		self.rate < 0.0 || self.burst < 0
	}
}

/// Admit-or-reject decisions against a shared [`AdmissionCache`].
#[derive(Debug, Default)]
pub struct AdmissionLimiter {
	cache: AdmissionCache,
	metrics: AdmissionMetrics,
}
impl AdmissionLimiter {
	/// Creates a limiter whose cache retains at most `capacity` buckets.
	pub fn new(capacity: NonZeroUsize) -> Self {
		Self { cache: AdmissionCache::new(capacity), metrics: Default::default() }
	}

	/// Underlying cache, for inspection and janitor tasks.
	pub fn cache(&self) -> &AdmissionCache {
		&self.cache
	}

	/// Decision counters.
	pub fn metrics(&self) -> &AdmissionMetrics {
		&self.metrics
	}

	/// Validates `request` and decides admission for it.
	pub async fn check(&self, ctx: &CallContext, request: AdmissionRequest) -> Result<()> {
		let params = request.into_params()?;

		self.allow(ctx, &params).await
	}

	/// Admits the call or fails with [`Error::TooManyRequests`] / [`Error::Canceled`].
	///
	/// A failed call never consumes a token. In [`WaitMode::Wait`] the caller is suspended until
	/// a token refills, the context is canceled, or the context deadline would pass first.
	pub async fn allow(&self, ctx: &CallContext, params: &AdmissionParams) -> Result<()> {
		if params.is_disabled() {
			self.metrics.record_bypassed();

			return Ok(());
		}

		let bucket = self.bucket_for(params)?;
		let result = match params.wait {
			WaitMode::Immediate => self.acquire_now(&params.key, &bucket),
			WaitMode::Wait => self.acquire_waiting(ctx, &params.key, &bucket).await,
		};

		match &result {
			Ok(()) => self.metrics.record_admitted(),
			Err(_) => self.metrics.record_rejected(),
		}

		result
	}

	fn bucket_for(&self, params: &AdmissionParams) -> Result<SharedBucket> {
		let now = Instant::now();
		let burst = u32::try_from(params.burst).unwrap_or(u32::MAX);
		let lookup = self.cache.get_or_insert_with(&params.key, params.expiration, now, || {
			TokenBucket::new(params.rate, burst, now)
		})?;

		if lookup.created {
			self.metrics.record_created();

			#[cfg(feature = "tracing")]
			tracing::debug!(
				key = %params.key,
				rate = params.rate,
				burst,
				expiration = ?params.expiration,
				"admission bucket created"
			);
		}

		Ok(lookup.bucket)
	}

	fn acquire_now(&self, key: &LimiterKey, bucket: &SharedBucket) -> Result<()> {
		match bucket.lock().try_acquire(Instant::now()) {
			Acquire::Granted => Ok(()),
			Acquire::Retry(delay) => Err(too_many(key, Some(delay))),
			Acquire::Exhausted => Err(too_many(key, None)),
		}
	}

	async fn acquire_waiting(
		&self,
		ctx: &CallContext,
		key: &LimiterKey,
		bucket: &SharedBucket,
	) -> Result<()> {
		loop {
			ctx.ensure_active()?;

			let now = Instant::now();
			// The guard is a temporary, so the lock is released before any await point.
			let delay = match bucket.lock().try_acquire(now) {
				Acquire::Granted => return Ok(()),
				Acquire::Retry(delay) => delay,
				Acquire::Exhausted => return Err(too_many(key, None)),
			};

			let misses_deadline = ctx.deadline().is_some_and(|deadline| {
				now.checked_add(delay).is_none_or(|ready| ready > deadline)
			});

			if misses_deadline {
				return Err(Error::Canceled { reason: CancelReason::DeadlineExceeded });
			}

			tokio::select! {
				biased;
				reason = ctx.done() => return Err(Error::Canceled { reason }),
				_ = tokio::time::sleep(delay) => {},
			}
		}
	}
}

fn too_many(key: &LimiterKey, retry_after: Option<std::time::Duration>) -> Error {
	#[cfg(feature = "tracing")]
	tracing::debug!(key = %key, ?retry_after, "admission rejected");

	Error::TooManyRequests { key: key.to_string(), retry_after }
}
