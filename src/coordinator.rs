//! Single-flight token refresh.
//!
//! [`RefreshCoordinator::ensure_token`] serves the cached token when it is still usable and
//! otherwise makes sure exactly one client-credentials exchange is in flight. Every caller
//! that arrives while the exchange runs subscribes to the same pending outcome, so N
//! concurrent callers against an empty cache cost one network round trip and all observe the
//! identical token or the identical [`AuthFetchError`].
//!
//! The exchange runs on a spawned tokio task. A caller that abandons its future does not
//! cancel the shared refresh; the task still completes and updates the cache for later
//! callers. Outside a tokio runtime the first caller drives the exchange inline.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::{runtime::Handle, sync::watch};
// self
use crate::{
	_prelude::*,
	acquire::TokenAcquirer,
	auth::TokenSecret,
	cache::TokenStore,
	error::AuthFetchError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::StoreError,
};

type Outcome = Option<Result<TokenSecret, AuthFetchError>>;

struct Shared {
	cache: Arc<TokenStore>,
	acquirer: Arc<dyn TokenAcquirer>,
	pending: Mutex<Option<watch::Receiver<Outcome>>>,
	metrics: RefreshMetrics,
}

enum Ticket {
	Ready(TokenSecret),
	Join(watch::Receiver<Outcome>),
	Lead(watch::Sender<Outcome>, watch::Receiver<Outcome>),
}

/// Guarantees at most one outstanding token acquisition at a time.
#[derive(Clone)]
pub struct RefreshCoordinator(Arc<Shared>);
impl RefreshCoordinator {
	/// Creates a coordinator that refreshes `cache` through `acquirer`.
	pub fn new(cache: Arc<TokenStore>, acquirer: Arc<dyn TokenAcquirer>) -> Self {
		Self(Arc::new(Shared {
			cache,
			acquirer,
			pending: Mutex::new(None),
			metrics: RefreshMetrics::default(),
		}))
	}

	/// Cache guarded by this coordinator.
	pub fn cache(&self) -> &TokenStore {
		&self.0.cache
	}

	/// Counters for cache hits, joins, and exchanges.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.0.metrics
	}

	/// Returns `true` while an exchange is outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.0.pending.lock().as_ref().is_some_and(|rx| rx.has_changed().is_ok())
	}

	/// Returns a usable bearer token, refreshing it through the single-flight exchange when
	/// the cache is empty or expired.
	pub async fn ensure_token(&self) -> Result<TokenSecret, AuthFetchError> {
		if let Some(token) = self.0.cache.get() {
			self.0.metrics.record_cache_hit();
			obs::log_cache_hit();

			return Ok(token.value);
		}

		match self.ticket() {
			Ticket::Ready(token) => Ok(token),
			Ticket::Join(rx) => {
				self.0.metrics.record_join();
				obs::log_refresh_joined();

				wait(rx).await
			},
			Ticket::Lead(tx, rx) => {
				let exchange = exchange(self.0.clone(), tx);

				match Handle::try_current() {
					Ok(handle) => {
						handle.spawn(exchange);
					},
					Err(_) => exchange.await,
				}

				wait(rx).await
			},
		}
	}

	/// Drops the cached token so the next call performs a fresh exchange.
	///
	/// An exchange that is already in flight is not cancelled and will repopulate the cache.
	pub async fn invalidate(&self) -> Result<(), StoreError> {
		self.0.cache.clear().await
	}

	fn ticket(&self) -> Ticket {
		let mut pending = self.0.pending.lock();

		// The previous leader may have stored a token between the first check and the lock.
		if let Some(token) = self.0.cache.get() {
			self.0.metrics.record_cache_hit();
			obs::log_cache_hit();

			return Ticket::Ready(token.value);
		}
		// A closed channel means its leader died before publishing; start over.
		if let Some(rx) = pending.as_ref().filter(|rx| rx.has_changed().is_ok()) {
			return Ticket::Join(rx.clone());
		}

		let (tx, rx) = watch::channel(None);

		*pending = Some(rx.clone());

		Ticket::Lead(tx, rx)
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("cache", &self.0.cache)
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}

async fn exchange(shared: Arc<Shared>, tx: watch::Sender<Outcome>) {
	const KIND: FlowKind = FlowKind::TokenExchange;

	shared.metrics.record_exchange();
	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	let outcome = FlowSpan::exchange()
		.instrument(async {
			match shared.acquirer.fetch().await {
				Ok(grant) => {
					match shared.cache.put(grant.access_token.clone(), grant.expires_in).await {
						Ok(token) => obs::log_exchange_succeeded(token.expires_at),
						Err(e) => obs::log_store_failed("save", &e),
					}

					Ok(grant.access_token)
				},
				Err(e) => {
					if let Err(store_error) = shared.cache.clear().await {
						obs::log_store_failed("clear", &store_error);
					}

					obs::log_exchange_failed(&e);

					Err(e)
				},
			}
		})
		.await;

	if outcome.is_ok() {
		shared.metrics.record_success();
	} else {
		shared.metrics.record_failure();
	}

	obs::record_flow_outcome(KIND, FlowOutcome::of(&outcome));

	let mut pending = shared.pending.lock();

	pending.take();
	tx.send_replace(Some(outcome));
}

async fn wait(mut rx: watch::Receiver<Outcome>) -> Result<TokenSecret, AuthFetchError> {
	// The sender only disappears without publishing when its task panicked.
	let outcome = match rx.wait_for(Option::is_some).await {
		Ok(published) => published.clone(),
		Err(_) => None,
	};

	outcome.unwrap_or(Err(AuthFetchError::Interrupted))
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use super::*;
	use crate::{
		acquire::AcquireFuture,
		auth::TokenGrant,
		cache::DEFAULT_SAFETY_MARGIN,
		clock::ManualClock,
		store::MemoryStore,
	};

	struct ScriptedAcquirer {
		calls: AtomicUsize,
		gate: Semaphore,
		script: Mutex<VecDeque<Result<TokenGrant, AuthFetchError>>>,
	}
	impl ScriptedAcquirer {
		fn new(script: impl IntoIterator<Item = Result<TokenGrant, AuthFetchError>>) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				gate: Semaphore::new(Semaphore::MAX_PERMITS),
				script: Mutex::new(script.into_iter().collect()),
			}
		}

		fn gated(script: impl IntoIterator<Item = Result<TokenGrant, AuthFetchError>>) -> Self {
			Self { gate: Semaphore::new(0), ..Self::new(script) }
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenAcquirer for ScriptedAcquirer {
		fn fetch(&self) -> AcquireFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let _permit = self.gate.acquire().await.map_err(|_| AuthFetchError::Interrupted)?;
				let next = self.script.lock().pop_front();

				next.expect("Acquirer script exhausted.")
			})
		}
	}

	fn grant(value: &str, secs: i64) -> Result<TokenGrant, AuthFetchError> {
		Ok(TokenGrant::new(value, Duration::seconds(secs)))
	}

	fn build(acquirer: Arc<ScriptedAcquirer>) -> (RefreshCoordinator, ManualClock, MemoryStore) {
		let clock = ManualClock::at_epoch();
		let backend = MemoryStore::default();
		let cache = Arc::new(TokenStore::new(
			Arc::new(backend.clone()),
			Arc::new(clock.clone()),
			DEFAULT_SAFETY_MARGIN,
		));

		(RefreshCoordinator::new(cache, acquirer), clock, backend)
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_exchange() {
		let acquirer = Arc::new(ScriptedAcquirer::gated([grant("shared", 3_600)]));
		let (coordinator, _clock, _backend) = build(acquirer.clone());
		let handles = (0..10)
			.map(|_| {
				let coordinator = coordinator.clone();

				tokio::spawn(async move { coordinator.ensure_token().await })
			})
			.collect::<Vec<_>>();

		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		acquirer.gate.add_permits(1);

		for handle in handles {
			let token = handle.await.expect("Caller task should not panic.");

			assert_eq!(token.expect("Every caller should get the token.").expose(), "shared");
		}

		assert_eq!(acquirer.calls(), 1);
		assert_eq!(coordinator.metrics().exchanges(), 1);
		assert!(!coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_failure() {
		let rejected = AuthFetchError::Rejected { status: 401, body: "denied".into() };
		let acquirer = Arc::new(ScriptedAcquirer::gated([Err(rejected.clone()), grant("later", 60)]));
		let (coordinator, _clock, backend) = build(acquirer.clone());
		let handles = (0..10)
			.map(|_| {
				let coordinator = coordinator.clone();

				tokio::spawn(async move { coordinator.ensure_token().await })
			})
			.collect::<Vec<_>>();

		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		acquirer.gate.add_permits(1);

		for handle in handles {
			let outcome = handle.await.expect("Caller task should not panic.");

			assert_eq!(outcome, Err(rejected.clone()));
		}

		assert_eq!(acquirer.calls(), 1);
		assert!(coordinator.cache().get().is_none());
		assert!(backend.snapshot().is_none());

		acquirer.gate.add_permits(1);

		let retried = coordinator.ensure_token().await.expect("A later call should retry.");

		assert_eq!(retried.expose(), "later");
		assert_eq!(acquirer.calls(), 2);
	}

	#[tokio::test]
	async fn failure_clears_a_previously_valid_token() {
		let acquirer = Arc::new(ScriptedAcquirer::new([
			grant("first", 3_600),
			Err(AuthFetchError::TimedOut),
		]));
		let (coordinator, clock, backend) = build(acquirer.clone());

		coordinator.ensure_token().await.expect("Initial exchange should succeed.");
		clock.advance(Duration::seconds(3_600));

		let err = coordinator.ensure_token().await.expect_err("Timed-out exchange should fail.");

		assert_eq!(err, AuthFetchError::TimedOut);
		assert!(coordinator.cache().get().is_none());
		assert!(backend.snapshot().is_none());
	}

	#[tokio::test]
	async fn refresh_happens_only_after_margin_adjusted_expiry() {
		let acquirer =
			Arc::new(ScriptedAcquirer::new([grant("first", 3_600), grant("second", 3_600)]));
		let (coordinator, clock, _backend) = build(acquirer.clone());

		let first = coordinator.ensure_token().await.expect("Exchange should succeed.");

		assert_eq!(first.expose(), "first");
		assert_eq!(
			coordinator.cache().expires_at().map(OffsetDateTime::unix_timestamp),
			Some(3_540)
		);

		clock.set(OffsetDateTime::UNIX_EPOCH + Duration::seconds(3_539));

		assert_eq!(coordinator.ensure_token().await.expect("Cache hit.").expose(), "first");
		assert_eq!(acquirer.calls(), 1);

		clock.set(OffsetDateTime::UNIX_EPOCH + Duration::seconds(3_541));

		assert_eq!(coordinator.ensure_token().await.expect("Refresh.").expose(), "second");
		assert_eq!(acquirer.calls(), 2);
		assert_eq!(coordinator.metrics().cache_hits(), 1);
	}

	#[tokio::test]
	async fn abandoned_caller_does_not_cancel_refresh() {
		let acquirer = Arc::new(ScriptedAcquirer::gated([grant("survivor", 600)]));
		let (coordinator, _clock, backend) = build(acquirer.clone());
		let abandoned =
			tokio::time::timeout(std::time::Duration::from_millis(20), coordinator.ensure_token())
				.await;

		assert!(abandoned.is_err());
		assert!(coordinator.is_refreshing());

		acquirer.gate.add_permits(1);

		let token = coordinator.ensure_token().await.expect("Joined refresh should succeed.");

		assert_eq!(token.expose(), "survivor");
		assert_eq!(acquirer.calls(), 1);
		assert_eq!(backend.snapshot().map(|t| t.value), Some(TokenSecret::new("survivor")));
	}

	#[tokio::test]
	async fn dead_leader_is_replaced_on_next_call() {
		// An empty script makes the first exchange panic inside its task.
		let acquirer = Arc::new(ScriptedAcquirer::new([]));
		let (coordinator, _clock, _backend) = build(acquirer.clone());
		let err = coordinator.ensure_token().await.expect_err("Panicked exchange has no outcome.");

		assert_eq!(err, AuthFetchError::Interrupted);
		assert!(!coordinator.is_refreshing());

		acquirer.script.lock().push_back(grant("recovered", 600));

		let token = coordinator.ensure_token().await.expect("Next call should lead a new exchange.");

		assert_eq!(token.expose(), "recovered");
		assert_eq!(acquirer.calls(), 2);
	}

	#[tokio::test]
	async fn token_stored_before_the_lock_counts_as_cache_hit() {
		let acquirer = Arc::new(ScriptedAcquirer::new(Vec::new()));
		let (coordinator, _clock, _backend) = build(acquirer.clone());

		coordinator.cache().put("landed", Duration::seconds(600)).await.expect("Put.");

		let ticket = coordinator.ticket();

		assert!(matches!(ticket, Ticket::Ready(ref token) if token.expose() == "landed"));
		assert_eq!(coordinator.metrics().cache_hits(), 1);
		assert_eq!(coordinator.metrics().exchanges(), 0);
		assert_eq!(acquirer.calls(), 0);
	}

	#[tokio::test]
	async fn invalidate_forces_new_exchange() {
		let acquirer = Arc::new(ScriptedAcquirer::new([grant("old", 600), grant("new", 600)]));
		let (coordinator, _clock, _backend) = build(acquirer.clone());

		coordinator.ensure_token().await.expect("Exchange should succeed.");
		coordinator.invalidate().await.expect("Invalidate should succeed.");

		assert_eq!(coordinator.ensure_token().await.expect("Refresh.").expose(), "new");
		assert_eq!(acquirer.calls(), 2);
	}
}
