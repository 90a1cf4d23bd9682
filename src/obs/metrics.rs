//! Counters published through the `metrics` facade.
//!
//! - `marketplace_oauth_flow_total{flow,outcome}` for every manager operation.
//! - `marketplace_oauth_refresh_source_total{source}` for where each refresh token came from.
//! - `marketplace_oauth_cache_lookup_total{operation,result}` for gateway cache lookups.
//!
//! Without the `metrics` feature every recorder compiles to nothing.

// self
use crate::{
	flows::RefreshTokenSource,
	obs::{FlowKind, FlowOutcome},
};

/// Result of a gateway cache lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLookup {
	/// Answered from the cache.
	Hit,
	/// Forwarded downstream and cached.
	Miss,
	/// Forwarded downstream without consulting the cache (continuation pages).
	Bypass,
}
impl CacheLookup {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheLookup::Hit => "hit",
			CacheLookup::Miss => "miss",
			CacheLookup::Bypass => "bypass",
		}
	}
}

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"marketplace_oauth_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records which [`RefreshTokenSource`] supplied the token for a refresh exchange.
pub fn record_refresh_source(source: RefreshTokenSource) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("marketplace_oauth_refresh_source_total", "source" => source.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = source;
	}
}

/// Records a gateway cache lookup for `operation`.
pub fn record_cache_lookup(operation: &str, lookup: CacheLookup) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"marketplace_oauth_cache_lookup_total",
			"operation" => operation.to_owned(),
			"result" => lookup.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, lookup);
	}
}
