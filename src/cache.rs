//! TTL-keyed memo table for downstream responses.
//!
//! Entries expire lazily: an expired entry is treated as absent by every read and is removed when
//! [`ResponseCache::get`] encounters it. [`ResponseCache::purge_expired`] sweeps the whole table
//! for hosts that want to bound memory between reads.

pub mod key;

pub use key::*;

// self
use crate::_prelude::*;

/// Lifetime applied by [`ResponseCache::set`] unless overridden.
pub const DEFAULT_TTL: Duration = Duration::seconds(300);

/// Cached value and its absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
	/// Memoized value.
	pub value: V,
	/// Instant after which the entry is absent.
	pub expires_at: OffsetDateTime,
}
impl<V> CacheEntry<V> {
	/// Returns `true` while the entry is still live at `instant`.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at > instant
	}
}

/// Live-entry summary returned by [`ResponseCache::stats`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
	/// Number of live entries.
	pub size: usize,
	/// Keys of the live entries, sorted.
	pub keys: Vec<String>,
	/// Expiry of each live entry, in key order.
	pub expiries: Vec<CacheExpiry>,
}

/// Expiry of one live entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheExpiry {
	/// Entry key.
	pub key: String,
	/// Absolute expiry.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}

/// Thread-safe response cache keyed by [`CacheKey`].
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
	entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
	default_ttl: Duration,
}
impl<V> ResponseCache<V>
where
	V: Clone,
{
	/// Creates an empty cache using [`DEFAULT_TTL`].
	pub fn new() -> Self {
		Self::with_default_ttl(DEFAULT_TTL)
	}

	/// Creates an empty cache whose [`ResponseCache::set`] uses `ttl`.
	pub fn with_default_ttl(ttl: Duration) -> Self {
		Self { entries: RwLock::new(HashMap::new()), default_ttl: ttl }
	}

	/// Lifetime applied by [`ResponseCache::set`].
	pub fn default_ttl(&self) -> Duration {
		self.default_ttl
	}

	/// Derives the key for `operation` called with `params`.
	pub fn key<P>(operation: &str, params: &P) -> Result<CacheKey, CacheKeyError>
	where
		P: ?Sized + Serialize,
	{
		CacheKey::new(operation, params)
	}

	/// Returns a clone of the live value under `key`, evicting it if it has expired.
	pub fn get(&self, key: &CacheKey) -> Option<V> {
		self.get_at(key, OffsetDateTime::now_utc())
	}

	/// Same as [`ResponseCache::get`] with an explicit clock reading.
	pub fn get_at(&self, key: &CacheKey, instant: OffsetDateTime) -> Option<V> {
		{
			let entries = self.entries.read();

			match entries.get(key) {
				None => return None,
				Some(entry) if entry.is_live_at(instant) => return Some(entry.value.clone()),
				Some(_) => {},
			}
		}

		let mut entries = self.entries.write();

		// A concurrent `set` may have replaced the entry between the two locks.
		match entries.get(key) {
			Some(entry) if entry.is_live_at(instant) => Some(entry.value.clone()),
			Some(_) => {
				entries.remove(key);

				None
			},
			None => None,
		}
	}

	/// Stores `value` under `key` for the default TTL.
	pub fn set(&self, key: CacheKey, value: V) {
		self.set_with_ttl(key, value, self.default_ttl);
	}

	/// Stores `value` under `key` for `ttl`; a zero or negative `ttl` is never readable.
	pub fn set_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
		self.set_at(key, value, ttl, OffsetDateTime::now_utc());
	}

	/// Same as [`ResponseCache::set_with_ttl`] with an explicit clock reading.
	pub fn set_at(&self, key: CacheKey, value: V, ttl: Duration, instant: OffsetDateTime) {
		let expires_at = instant.saturating_add(ttl);

		self.entries.write().insert(key, CacheEntry { value, expires_at });
	}

	/// Summarizes live entries. Expired entries are skipped but not removed.
	pub fn stats(&self) -> CacheStats {
		self.stats_at(OffsetDateTime::now_utc())
	}

	/// Same as [`ResponseCache::stats`] with an explicit clock reading.
	pub fn stats_at(&self, instant: OffsetDateTime) -> CacheStats {
		let entries = self.entries.read();
		let mut live = entries
			.iter()
			.filter(|(_, entry)| entry.is_live_at(instant))
			.map(|(key, entry)| CacheExpiry { key: key.to_string(), expires_at: entry.expires_at })
			.collect::<Vec<_>>();

		live.sort_by(|a, b| a.key.cmp(&b.key));

		CacheStats {
			size: live.len(),
			keys: live.iter().map(|expiry| expiry.key.clone()).collect(),
			expiries: live,
		}
	}

	/// Removes every expired entry and returns how many were dropped.
	pub fn purge_expired(&self) -> usize {
		self.purge_expired_at(OffsetDateTime::now_utc())
	}

	/// Same as [`ResponseCache::purge_expired`] with an explicit clock reading.
	pub fn purge_expired_at(&self, instant: OffsetDateTime) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();

		entries.retain(|_, entry| entry.is_live_at(instant));

		before - entries.len()
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Number of physically stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}
impl<V> Default for ResponseCache<V>
where
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}
