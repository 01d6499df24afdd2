//! In-process [`Store`] for tests and short-lived tools.

// self
use crate::{
	_prelude::*,
	auth::CachedToken,
	store::{Store, StoreFuture},
};

/// Keeps the persisted token in memory; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<CachedToken>>>);
impl MemoryStore {
	/// Creates a store pre-seeded with `token`, as if it survived a previous run.
	pub fn with_token(token: CachedToken) -> Self {
		Self(Arc::new(RwLock::new(Some(token))))
	}

	/// Returns a copy of the persisted token without going through the async contract.
	pub fn snapshot(&self) -> Option<CachedToken> {
		self.0.read().clone()
	}
}
impl Store for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<CachedToken>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, token: CachedToken) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(token);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}
