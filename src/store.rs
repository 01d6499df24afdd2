//! Persistence contract and built-in backends for the cached bearer token.
//!
//! A backend holds at most one entry: the token string plus its absolute expiry. The
//! [`TokenStore`](crate::cache::TokenStore) writes through to the backend on every change and
//! reads it once at startup, so a restarted process can reuse an unexpired token.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CachedToken};

/// Boxed future returned by [`Store`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable storage backend for the cached token.
pub trait Store
where
	Self: Send + Sync,
{
	/// Reads the persisted token, if both entries are present.
	fn load(&self) -> StoreFuture<'_, Option<CachedToken>>;

	/// Persists or replaces the token and its expiry.
	fn save(&self, token: CachedToken) -> StoreFuture<'_, ()>;

	/// Removes any persisted token.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`Store`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Persisted data could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
