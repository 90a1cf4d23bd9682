//! Process-wide holder for the interactive-session [`Credential`].
//!
//! The store is a cheap-to-clone handle around shared state. It performs no I/O and makes no
//! network calls; the token manager is the only writer during normal operation.

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenGrant, TokenSecret, TokenStatus},
};

/// Monotonic counter bumped whenever the credential is replaced from outside a refresh.
///
/// A refresh captures it before calling the provider and only writes its grant back when the
/// counter is unchanged, so a [`TokenStore::clear`] issued mid-refresh stays cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct Slot {
	credential: Credential,
	generation: Generation,
}
impl Slot {
	fn bump(&mut self) {
		self.generation = Generation(self.generation.0.wrapping_add(1));
	}

	fn apply(&mut self, grant: &TokenGrant) {
		self.credential.access_token = Some(grant.access_token.clone());
		self.credential.expires_at = Some(grant.expires_at);

		if let Some(refresh) = grant.refresh_token.as_ref() {
			self.credential.refresh_token = Some(refresh.clone());
		}
	}
}

/// Shared, thread-safe credential holder.
#[derive(Clone, Debug, Default)]
pub struct TokenStore(Arc<RwLock<Slot>>);
impl TokenStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store seeded with `credential`.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Slot { credential, generation: Generation::default() })))
	}

	/// Returns a copy of the current credential.
	pub fn snapshot(&self) -> Credential {
		self.0.read().credential.clone()
	}

	/// Current replacement generation.
	pub fn generation(&self) -> Generation {
		self.0.read().generation
	}

	/// Reports token status at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		self.0.read().credential.status_at(instant)
	}

	/// Reports token status using the current clock.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns the access token only if it is still valid at `instant`.
	pub fn valid_access_token_at(&self, instant: OffsetDateTime) -> Option<TokenSecret> {
		self.0.read().credential.valid_access_token_at(instant).cloned()
	}

	/// Returns the stored refresh token, ignoring blank values.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.0.read().credential.refresh_token.clone().filter(|token| !token.is_blank())
	}

	/// Replaces the whole credential and starts a new generation.
	pub fn replace(&self, credential: Credential) {
		let mut slot = self.0.write();

		slot.credential = credential;
		slot.bump();
	}

	/// Records a grant from the code exchange and starts a new generation.
	///
	/// The access token and expiry are always overwritten. The refresh token is overwritten
	/// only when the grant carries one.
	pub fn record_grant(&self, grant: &TokenGrant) {
		let mut slot = self.0.write();

		slot.apply(grant);
		slot.bump();
	}

	/// Records a refreshed grant if the store is still at `generation`.
	///
	/// Returns `false` and leaves the store untouched when the credential was cleared or replaced
	/// after `generation` was captured. A provider that does not rotate refresh tokens leaves the
	/// previous refresh token in place.
	pub fn record_refresh(&self, grant: &TokenGrant, generation: Generation) -> bool {
		let mut slot = self.0.write();

		if slot.generation != generation {
			return false;
		}

		slot.apply(grant);

		true
	}

	/// Resets the credential to the empty state and starts a new generation.
	pub fn clear(&self) {
		let mut slot = self.0.write();

		slot.credential = Credential::default();
		slot.bump();
	}
}
