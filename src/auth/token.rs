//! Token values produced by the identity endpoint and held by the cache.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Lifecycle state of the cached token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenState {
	/// Nothing cached.
	Absent,
	/// Cached and usable.
	Valid,
	/// Cached but past its (margin-adjusted) expiry.
	Expired,
}

/// Token candidate returned by a successful exchange, before the cache applies its margin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
	/// Bearer token value.
	pub access_token: TokenSecret,
	/// Lifetime reported by the identity endpoint.
	pub expires_in: Duration,
}
impl TokenGrant {
	/// Creates a grant from a token value and its reported lifetime.
	pub fn new(access_token: impl Into<TokenSecret>, expires_in: Duration) -> Self {
		Self { access_token: access_token.into(), expires_in }
	}
}

/// Bearer token plus the absolute instant after which it must not be served.
///
/// Instances are immutable; the cache replaces or clears them but never edits one in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
	/// Bearer token value.
	pub value: TokenSecret,
	/// Margin-adjusted expiry, stored as unix seconds when persisted.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Creates a cached token expiring at `expires_at`.
	pub fn new(value: impl Into<TokenSecret>, expires_at: OffsetDateTime) -> Self {
		Self { value: value.into(), expires_at }
	}

	/// Returns `true` while `now` is strictly before the expiry instant.
	pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}

	/// Computes the token state at `now`.
	pub fn state_at(&self, now: OffsetDateTime) -> TokenState {
		if self.is_usable_at(now) { TokenState::Valid } else { TokenState::Expired }
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
