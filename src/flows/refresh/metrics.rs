// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use super::RefreshTokenSource;
use crate::_prelude::*;

/// Refresh bookkeeping kept per [`TokenManager`](crate::flows::TokenManager).
///
/// Besides the attempt/success/failure totals it tracks which [`RefreshTokenSource`] supplied
/// each token (a run of `config` resolutions means the store keeps losing its credential) and how
/// many grants were thrown away because the credential was cleared while they were in flight.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	resolved: [AtomicU64; RefreshTokenSource::PRECEDENCE.len()],
	discarded: AtomicU64,
	coalesced_failures: AtomicU64,
}
impl RefreshMetrics {
	/// Refresh exchanges started, including ones that found no token.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Exchanges that produced a new access token.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Exchanges that failed, including unresolvable tokens.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Exchanges whose refresh token came from `source`.
	pub fn resolved_from(&self, source: RefreshTokenSource) -> u64 {
		self.resolved[source.index()].load(Ordering::Relaxed)
	}

	/// Successful grants dropped because the credential was cleared or replaced mid-flight.
	pub fn discarded(&self) -> u64 {
		self.discarded.load(Ordering::Relaxed)
	}

	/// Callers that reused a failure from the refresh they queued behind instead of retrying.
	pub fn coalesced_failures(&self) -> u64 {
		self.coalesced_failures.load(Ordering::Relaxed)
	}

	/// Point-in-time copy suitable for a status endpoint.
	pub fn snapshot(&self) -> RefreshMetricsSnapshot {
		RefreshMetricsSnapshot {
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
			from_argument: self.resolved_from(RefreshTokenSource::Argument),
			from_store: self.resolved_from(RefreshTokenSource::Store),
			from_config: self.resolved_from(RefreshTokenSource::Config),
			discarded: self.discarded(),
			coalesced_failures: self.coalesced_failures(),
		}
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_resolved(&self, source: RefreshTokenSource) {
		self.resolved[source.index()].fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_result<T>(&self, result: &Result<T>) {
		let counter = if result.is_ok() { &self.successes } else { &self.failures };

		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_discarded(&self) {
		self.discarded.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced_failure(&self) {
		self.coalesced_failures.fetch_add(1, Ordering::Relaxed);
	}
}

/// Serializable view of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshMetricsSnapshot {
	/// See [`RefreshMetrics::attempts`].
	pub attempts: u64,
	/// See [`RefreshMetrics::successes`].
	pub successes: u64,
	/// See [`RefreshMetrics::failures`].
	pub failures: u64,
	/// Tokens supplied by the caller.
	pub from_argument: u64,
	/// Tokens read from the credential store.
	pub from_store: u64,
	/// Tokens taken from the configured fallback.
	pub from_config: u64,
	/// See [`RefreshMetrics::discarded`].
	pub discarded: u64,
	/// See [`RefreshMetrics::coalesced_failures`].
	pub coalesced_failures: u64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_splits_resolutions_by_source() {
		let metrics = RefreshMetrics::default();

		metrics.record_resolved(RefreshTokenSource::Store);
		metrics.record_resolved(RefreshTokenSource::Store);
		metrics.record_resolved(RefreshTokenSource::Config);
		metrics.record_result(&Ok(()));
		metrics.record_result::<()>(&Err(Error::NoRefreshTokenAvailable));
		metrics.record_discarded();

		let snapshot = metrics.snapshot();

		assert_eq!(snapshot.from_store, 2);
		assert_eq!(snapshot.from_config, 1);
		assert_eq!(snapshot.from_argument, 0);
		assert_eq!((snapshot.successes, snapshot.failures, snapshot.discarded), (1, 1, 1));
		assert_eq!(
			serde_json::to_value(snapshot).expect("Snapshot should serialize.")["fromConfig"],
			1
		);
	}
}
