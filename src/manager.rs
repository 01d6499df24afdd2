//! Process-wide token manager: one cache, one coordinator, one acquirer.
//!
//! Build a single [`TokenManager`] at startup and share clones of it with every gateway client.
//! Clones share the same cache and the same single-flight coordinator, so all four gateways
//! authenticate with one token and refresh it together.

// self
use crate::{
	_prelude::*,
	acquire::{ClientCredentialsAcquirer, TokenAcquirer},
	auth::{CachedToken, TokenSecret, TokenState},
	cache::TokenStore,
	clock::{Clock, SystemClock},
	config::{AuthConfig, Settings},
	coordinator::{RefreshCoordinator, RefreshMetrics},
	error::{AuthFetchError, ConfigError},
	obs,
	store::{FileStore, MemoryStore, Store, StoreError},
	transport::HttpTransport,
};

/// Shared handle to the credential lifecycle.
#[derive(Clone)]
pub struct TokenManager {
	coordinator: RefreshCoordinator,
	transport: Arc<dyn HttpTransport>,
}
impl TokenManager {
	/// Starts building a manager for `config`.
	pub fn builder(config: AuthConfig) -> TokenManagerBuilder {
		TokenManagerBuilder {
			config,
			store: None,
			clock: None,
			transport: None,
			acquirer: None,
		}
	}

	/// Builds a manager from startup settings, persisting to the configured token file when one
	/// is set and keeping the token in memory otherwise.
	pub async fn from_settings(
		settings: &Settings,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self> {
		let mut builder = Self::builder(settings.auth.clone()).with_transport(transport);

		if let Some(path) = &settings.token_cache {
			builder = builder.with_store(Arc::new(FileStore::open(path)?));
		}

		builder.build().await
	}

	/// Returns a usable bearer token, refreshing it when needed.
	///
	/// Concurrent callers share one exchange and observe the same outcome.
	pub async fn ensure_token(&self) -> Result<TokenSecret, AuthFetchError> {
		self.coordinator.ensure_token().await
	}

	/// Drops the cached token so the next call fetches a new one.
	pub async fn invalidate(&self) -> Result<(), StoreError> {
		self.coordinator.invalidate().await
	}

	/// Currently cached token, only while it is still usable.
	pub fn cached(&self) -> Option<CachedToken> {
		self.cache().get()
	}

	/// Cache state at the current instant.
	pub fn state(&self) -> TokenState {
		self.cache().state()
	}

	/// Margin-adjusted expiry of the current entry.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.cache().expires_at()
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Coordinator shared by every clone of this manager.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Transport used for the identity exchange, reusable for gateway calls.
	pub fn transport(&self) -> Arc<dyn HttpTransport> {
		self.transport.clone()
	}

	fn cache(&self) -> &TokenStore {
		self.coordinator.cache()
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager").field("coordinator", &self.coordinator).finish()
	}
}

/// Assembles a [`TokenManager`], defaulting to an in-memory store, the system clock, and the
/// client-credentials acquirer.
pub struct TokenManagerBuilder {
	config: AuthConfig,
	store: Option<Arc<dyn Store>>,
	clock: Option<Arc<dyn Clock>>,
	transport: Option<Arc<dyn HttpTransport>>,
	acquirer: Option<Arc<dyn TokenAcquirer>>,
}
impl TokenManagerBuilder {
	/// Persists tokens through `store`.
	pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
		self.store = Some(store);

		self
	}

	/// Reads time from `clock`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Sends the identity exchange through `transport`.
	pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Replaces the client-credentials exchange with a custom acquirer.
	pub fn with_acquirer(mut self, acquirer: Arc<dyn TokenAcquirer>) -> Self {
		self.acquirer = Some(acquirer);

		self
	}

	/// Builds the manager and restores any still-valid persisted token.
	///
	/// A store that cannot be read is logged and treated as empty.
	pub async fn build(self) -> Result<TokenManager> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let acquirer = match self.acquirer {
			Some(acquirer) => acquirer,
			None => Arc::new(ClientCredentialsAcquirer::new(&self.config, transport.clone())?),
		};
		let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::default()));
		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
		let cache = Arc::new(TokenStore::new(store, clock, self.config.safety_margin));

		match cache.restore().await {
			Ok(true) => obs::log_token_restored(cache.expires_at()),
			Ok(false) => {},
			Err(e) => obs::log_store_failed("load", &e),
		}

		Ok(TokenManager { coordinator: RefreshCoordinator::new(cache, acquirer), transport })
	}
}
impl Debug for TokenManagerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManagerBuilder")
			.field("config", &self.config)
			.field("store_set", &self.store.is_some())
			.field("clock_set", &self.clock.is_some())
			.field("transport_set", &self.transport.is_some())
			.field("acquirer_set", &self.acquirer.is_some())
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Ok(Arc::new(crate::transport::ReqwestTransport::default()))
}
#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingSetting("transport"))
}
