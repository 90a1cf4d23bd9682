//! Deterministic cache keys derived from an operation name and its parameters.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors raised while deriving a [`CacheKey`].
#[derive(Debug, ThisError)]
pub enum CacheKeyError {
	/// Parameters could not be represented as JSON.
	#[error("Parameters for `{operation}` cannot be serialized into a cache key.")]
	Serialize {
		/// Operation the key was requested for.
		operation: String,
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Key identifying one memoized call: `"{operation}:{digest}"`.
///
/// The digest is the URL-safe, unpadded base64 SHA-256 of the parameters after every JSON object
/// has had its keys sorted, so parameter order never changes the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	/// Derives the key for `operation` called with `params`.
	pub fn new<P>(operation: &str, params: &P) -> Result<Self, CacheKeyError>
	where
		P: ?Sized + Serialize,
	{
		let value = serde_json::to_value(params).map_err(|source| CacheKeyError::Serialize {
			operation: operation.to_owned(),
			source,
		})?;
		let canonical = canonicalize(value).to_string();

		Ok(Self(format!("{operation}:{}", digest(&canonical))))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the operation component of the key.
	pub fn operation(&self) -> &str {
		self.0.rsplit_once(':').map_or(self.0.as_str(), |(operation, _)| operation)
	}
}
impl AsRef<str> for CacheKey {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Rebuilds `value` with every object's keys in ascending order.
fn canonicalize(value: Value) -> Value {
	match value {
		Value::Object(map) => {
			let sorted = map.into_iter().collect::<BTreeMap<_, _>>();

			Value::Object(
				sorted.into_iter().map(|(k, v)| (k, canonicalize(v))).collect::<Map<_, _>>(),
			)
		},
		Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
		other => other,
	}
}

fn digest(input: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(input.as_bytes()))
}
