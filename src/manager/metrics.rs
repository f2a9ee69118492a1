//! In-process counters describing cache and acquisition activity.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters kept by every manager, independent of the `metrics` feature.
#[derive(Debug, Default)]
pub struct ManagerMetrics {
	cache_hits: AtomicU64,
	acquisitions: AtomicU64,
	coalesced: AtomicU64,
	failures: AtomicU64,
}
impl ManagerMetrics {
	/// Calls answered from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Token endpoint calls made.
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Calls that joined an acquisition started by another caller.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Calls that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_acquisition(&self) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
