// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for admission decisions.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
	admitted: AtomicU64,
	rejected: AtomicU64,
	bypassed: AtomicU64,
	created: AtomicU64,
}
impl AdmissionMetrics {
	/// Returns the number of calls admitted by a bucket.
	pub fn admitted(&self) -> u64 {
		self.admitted.load(Ordering::Relaxed)
	}

	/// Returns the number of calls rejected or canceled.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Returns the number of calls admitted because limiting was disabled.
	pub fn bypassed(&self) -> u64 {
		self.bypassed.load(Ordering::Relaxed)
	}

	/// Returns how many buckets have been installed in the cache, replacements included.
	pub fn buckets_created(&self) -> u64 {
		self.created.load(Ordering::Relaxed)
	}

	pub(crate) fn record_admitted(&self) {
		self.admitted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejected(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_bypassed(&self) {
		self.bypassed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_created(&self) {
		self.created.fetch_add(1, Ordering::Relaxed);
	}
}
