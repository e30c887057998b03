//! Bounded, LRU-evicted, per-entry expiring map from limiter keys to token buckets.

// std
use std::num::NonZeroUsize;
// crates.io
use lru::LruCache;
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::LimiterKey,
	error::CacheError,
	limiter::bucket::TokenBucket,
};

/// Shared handle to one key's bucket; mutation is serialized by the bucket's own lock.
pub type SharedBucket = Arc<Mutex<TokenBucket>>;

/// Capacity used when the caller does not configure one.
pub const DEFAULT_CACHE_CAPACITY: usize = 1_000_000;

/// Result of [`AdmissionCache::get_or_insert_with`].
#[derive(Debug)]
pub struct Lookup {
	/// Bucket installed for the key.
	pub bucket: SharedBucket,
	/// `true` when this call created the bucket.
	pub created: bool,
}

#[derive(Debug)]
struct CacheEntry {
	bucket: SharedBucket,
	expires_at: Instant,
}

/// Process-wide admission state.
///
/// Structural operations (lookup, insert-if-absent, eviction, expire-on-read) run under one
/// short critical section, so a key's get-or-create is atomic and at most one bucket exists per
/// key. Bucket refills happen outside that section under each bucket's own lock, so different
/// keys never wait on each other's token math.
#[derive(Debug)]
pub struct AdmissionCache {
	entries: Mutex<LruCache<LimiterKey, CacheEntry>>,
}
impl AdmissionCache {
	/// Creates an empty cache holding at most `capacity` buckets.
	pub fn new(capacity: NonZeroUsize) -> Self {
		Self { entries: Mutex::new(LruCache::new(capacity)) }
	}

	/// Maximum number of buckets retained before least-recently-used eviction.
	pub fn capacity(&self) -> usize {
		self.entries.lock().cap().get()
	}

	/// Number of entries currently held, including expired entries not yet observed.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when the cache holds no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Returns `true` when a live (unexpired) entry exists for `key` at `now`.
	///
	/// Does not affect recency.
	pub fn contains_live(&self, key: &LimiterKey, now: Instant) -> bool {
		self.entries.lock().peek(key).is_some_and(|entry| entry.expires_at > now)
	}

	/// Returns the live bucket for `key`, or installs the one built by `init`.
	///
	/// A hit promotes the entry's recency without extending its deadline. An expired entry is
	/// dropped and replaced in the same critical section. Inserting into a full cache evicts the
	/// least-recently-used entry.
	pub fn get_or_insert_with(
		&self,
		key: &LimiterKey,
		expiration: std::time::Duration,
		now: Instant,
		init: impl FnOnce() -> TokenBucket,
	) -> Result<Lookup, CacheError> {
		let mut entries = self.entries.lock();

		if let Some(entry) = entries.get(key) {
			if entry.expires_at > now {
				return Ok(Lookup { bucket: entry.bucket.clone(), created: false });
			}

			entries.pop(key);
		}

		let expires_at = now
			.checked_add(expiration)
			.ok_or_else(|| CacheError::DeadlineOverflow { key: key.to_string() })?;
		let bucket = Arc::new(Mutex::new(init()));

		entries.push(key.clone(), CacheEntry { bucket: bucket.clone(), expires_at });

		Ok(Lookup { bucket, created: true })
	}

	/// Removes every entry whose deadline has passed at `now`; returns how many were removed.
	pub fn purge_expired(&self, now: Instant) -> usize {
		let mut entries = self.entries.lock();
		let expired = entries
			.iter()
			.filter(|(_, entry)| entry.expires_at <= now)
			.map(|(key, _)| key.clone())
			.collect::<Vec<_>>();

		for key in &expired {
			entries.pop(key);
		}

		expired.len()
	}
}
impl Default for AdmissionCache {
	fn default() -> Self {
		Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
	}
}
