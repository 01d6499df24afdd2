//! In-memory token cache with margin-adjusted expiry and write-through persistence.

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, TokenSecret, TokenState},
	clock::Clock,
	obs,
	store::{Store, StoreError},
};

/// Safety margin applied when none is configured.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);

/// Holds at most one bearer token plus its absolute expiry.
///
/// Reads never suspend and never mutate. Writes replace the in-memory entry first and then
/// persist it through the configured [`Store`], so a persistence failure never leaves callers
/// without a usable token.
pub struct TokenStore {
	entry: RwLock<Option<CachedToken>>,
	backend: Arc<dyn Store>,
	clock: Arc<dyn Clock>,
	margin: Duration,
}
impl TokenStore {
	/// Creates an empty cache.
	pub fn new(backend: Arc<dyn Store>, clock: Arc<dyn Clock>, margin: Duration) -> Self {
		Self { entry: RwLock::new(None), backend, clock, margin }
	}

	/// Safety margin subtracted from every reported lifetime.
	pub fn margin(&self) -> Duration {
		self.margin
	}

	/// Current instant according to the injected clock.
	pub fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}

	/// Returns the cached token only while it is still usable.
	pub fn get(&self) -> Option<CachedToken> {
		let now = self.clock.now();

		self.entry.read().as_ref().filter(|token| token.is_usable_at(now)).cloned()
	}

	/// Reports whether the cache is absent, valid, or expired right now.
	pub fn state(&self) -> TokenState {
		match self.entry.read().as_ref() {
			Some(token) => token.state_at(self.clock.now()),
			None => TokenState::Absent,
		}
	}

	/// Expiry of the current entry, usable or not.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.entry.read().as_ref().map(|token| token.expires_at)
	}

	/// Caches `value` for `lifetime` minus the safety margin and persists it.
	///
	/// A lifetime no longer than the margin stores an already expired entry, so every call
	/// refreshes; this is logged as a warning. A lifetime past the representable date range is
	/// treated the same way.
	///
	/// The in-memory entry is replaced even when persistence fails; the error is returned so the
	/// caller can report it.
	pub async fn put(
		&self,
		value: impl Into<TokenSecret>,
		lifetime: Duration,
	) -> Result<CachedToken, StoreError> {
		let now = self.clock.now();
		let expires_at = now.checked_add(lifetime.saturating_sub(self.margin)).unwrap_or(now);

		if expires_at <= now {
			obs::log_lifetime_within_margin(lifetime, self.margin);
		}

		let token = CachedToken::new(value, expires_at);

		*self.entry.write() = Some(token.clone());

		self.backend.save(token.clone()).await?;

		Ok(token)
	}

	/// Drops the cached entry and its persisted copy.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.entry.write().take();

		self.backend.clear().await
	}

	/// Loads a persisted token into memory if it is still usable.
	///
	/// Returns `true` when a token was restored. An expired persisted token is left untouched
	/// on disk; the next successful exchange overwrites it.
	pub async fn restore(&self) -> Result<bool, StoreError> {
		let Some(token) = self.backend.load().await? else {
			return Ok(false);
		};

		if !token.is_usable_at(self.clock.now()) {
			return Ok(false);
		}

		*self.entry.write() = Some(token);

		Ok(true)
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("entry", &*self.entry.read())
			.field("margin", &self.margin)
			.finish()
	}
}
