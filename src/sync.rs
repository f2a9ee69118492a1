//! Keyed request coalescing so a burst of cache misses produces one upstream call per key.
//!
//! Each key maps to at most one pending flight. The registry only holds weak handles: the
//! flight lives as long as some caller is awaiting it, and its slot is released as soon as it
//! completes or its last waiter goes away. Results, including failures, are handed to every
//! waiter of that flight and never outlive it.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
// self
use crate::_prelude::*;

type Flight<T> = Shared<BoxFuture<'static, Result<T>>>;
type Registry<K, T> = Arc<Mutex<HashMap<K, Slot<T>>>>;

struct Slot<T> {
	id: u64,
	flight: WeakShared<BoxFuture<'static, Result<T>>>,
}

/// How a caller took part in a synchronized acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlightRole {
	/// The future built by the caller's closure became the flight.
	Leader,
	/// The caller joined a flight started by someone else.
	Follower,
}

/// Guarantees at most one in-flight acquisition per key.
pub struct RequestSynchronizer<K, T> {
	inflight: Registry<K, T>,
	next_id: AtomicU64,
}
impl<K, T> RequestSynchronizer<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	/// Creates an empty synchronizer.
	pub fn new() -> Self {
		Self { inflight: Default::default(), next_id: AtomicU64::new(0) }
	}

	/// Runs `acquire` for `key` unless a flight for it is already pending, in which case the
	/// caller waits for that flight's result instead.
	///
	/// `acquire` is called outside the registry lock and may use the synchronizer itself. The
	/// future it returns must not act before it is first polled: it is discarded unpolled when
	/// another caller starts a flight for the same key first.
	pub async fn synchronize<F, Fut>(&self, key: K, acquire: F) -> Result<T>
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Future<Output = Result<T>> + Send,
	{
		self.synchronize_with_role(key, acquire).await.1
	}

	/// Same as [`synchronize`](Self::synchronize), also reporting whether this caller led the
	/// flight.
	pub async fn synchronize_with_role<F, Fut>(&self, key: K, acquire: F) -> (FlightRole, Result<T>)
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Future<Output = Result<T>> + Send,
	{
		let (role, flight) = self.join_or_start(key, acquire);

		(role, flight.await)
	}

	/// Number of keys with a pending flight.
	pub fn in_flight(&self) -> usize {
		self.inflight.lock().len()
	}

	fn join_or_start<F, Fut>(&self, key: K, acquire: F) -> (FlightRole, Flight<T>)
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Future<Output = Result<T>> + Send,
	{
		if let Some(flight) = Self::pending(&self.inflight.lock(), &key) {
			return (FlightRole::Follower, flight);
		}

		// Built without the registry lock; an unpolled future is dropped if another caller
		// registered a flight for the key in the meantime.
		let work = acquire();
		let mut guard = self.inflight.lock();

		if let Some(flight) = Self::pending(&guard, &key) {
			return (FlightRole::Follower, flight);
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let release = SlotRelease { registry: self.inflight.clone(), key: key.clone(), id };
		let flight = async move {
			let _release = release;

			work.await
		}
		.boxed()
		.shared();

		// A freshly built `Shared` has never been polled, so it can always be downgraded.
		if let Some(weak) = flight.downgrade() {
			guard.insert(key, Slot { id, flight: weak });
		}

		(FlightRole::Leader, flight)
	}

	fn pending(slots: &HashMap<K, Slot<T>>, key: &K) -> Option<Flight<T>> {
		slots.get(key).and_then(|slot| slot.flight.upgrade())
	}
}
impl<K, T> Default for RequestSynchronizer<K, T>
where
	K: 'static + Clone + Eq + Hash + Send + Sync,
	T: 'static + Clone + Send + Sync,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, T> Debug for RequestSynchronizer<K, T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestSynchronizer")
			.field("in_flight", &self.inflight.lock().len())
			.finish()
	}
}

// Dropped together with the flight's future: on completion, or when the last waiter is gone.
struct SlotRelease<K, T>
where
	K: Eq + Hash,
{
	registry: Registry<K, T>,
	key: K,
	id: u64,
}
impl<K, T> Drop for SlotRelease<K, T>
where
	K: Eq + Hash,
{
	fn drop(&mut self) {
		let mut guard = self.registry.lock();

		// A newer flight may already occupy the key.
		if guard.get(&self.key).is_some_and(|slot| slot.id == self.id) {
			guard.remove(&self.key);
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// crates.io
	use tokio::sync::Notify;
	// self
	use super::*;
	use crate::error::{EndpointError, FailureKind};

	fn counter() -> Arc<AtomicUsize> {
		Arc::new(AtomicUsize::new(0))
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_flight() {
		let sync = RequestSynchronizer::<&'static str, u32>::new();
		let calls = counter();
		let gate = Arc::new(Notify::new());
		let acquire = || {
			let calls = calls.clone();
			let gate = gate.clone();

			move || async move {
				calls.fetch_add(1, Ordering::SeqCst);
				gate.notified().await;

				Ok(7)
			}
		};
		let release = async {
			tokio::task::yield_now().await;
			gate.notify_one();
		};
		let (a, b, ()) = tokio::join!(
			sync.synchronize_with_role("svc", acquire()),
			sync.synchronize_with_role("svc", acquire()),
			release,
		);

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(a.0, FlightRole::Leader);
		assert_eq!(b.0, FlightRole::Follower);
		assert_eq!(a.1.expect("Leader should succeed."), 7);
		assert_eq!(b.1.expect("Follower should succeed."), 7);
		assert_eq!(sync.in_flight(), 0, "Completed flights release their slot.");
	}

	#[tokio::test]
	async fn failures_reach_every_waiter_and_are_not_cached() {
		let sync = RequestSynchronizer::<&'static str, u32>::new();
		let calls = counter();
		let fail = || {
			let calls = calls.clone();

			move || async move {
				calls.fetch_add(1, Ordering::SeqCst);
				tokio::task::yield_now().await;

				Err(Error::TokenAcquisitionFailed(EndpointError::new(
					FailureKind::Transient,
					"upstream unavailable",
				)))
			}
		};
		let (a, b) = tokio::join!(sync.synchronize("svc", fail()), sync.synchronize("svc", fail()));
		let a = a.expect_err("Leader should observe the failure.");
		let b = b.expect_err("Follower should observe the failure.");

		assert_eq!(a.to_string(), b.to_string());
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		let retried = sync.synchronize("svc", || async { Ok(1) }).await;

		assert_eq!(retried.expect("A new flight should start after a failure."), 1);
	}

	#[tokio::test]
	async fn acquire_runs_outside_the_registry_lock() {
		let sync = Arc::new(RequestSynchronizer::<&'static str, usize>::new());
		let inner = sync.clone();
		let (role, value) = sync
			.synchronize_with_role("svc", move || {
				let seen = inner.in_flight();
				let nested = inner.clone();

				async move {
					nested.synchronize("other", || async { Ok(1) }).await.map(|value| seen + value)
				}
			})
			.await;

		assert_eq!(role, FlightRole::Leader);
		assert_eq!(value.expect("Re-entrant acquisition should succeed."), 1);
		assert_eq!(sync.in_flight(), 0);
	}

	#[tokio::test]
	async fn different_keys_do_not_coalesce() {
		let sync = RequestSynchronizer::<&'static str, &'static str>::new();
		let calls = counter();
		let acquire = |value: &'static str| {
			let calls = calls.clone();

			move || async move {
				calls.fetch_add(1, Ordering::SeqCst);
				tokio::task::yield_now().await;

				Ok(value)
			}
		};
		let (a, b) = tokio::join!(
			sync.synchronize("orders", acquire("orders-token")),
			sync.synchronize("billing", acquire("billing-token")),
		);

		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(a.expect("Orders flight should succeed."), "orders-token");
		assert_eq!(b.expect("Billing flight should succeed."), "billing-token");
	}

	#[tokio::test]
	async fn last_waiter_cancelling_abandons_the_flight() {
		let sync = RequestSynchronizer::<&'static str, u32>::new();
		let mut pending = Box::pin(
			sync.synchronize("svc", || async { std::future::pending::<Result<u32>>().await }),
		);

		assert!(futures::poll!(pending.as_mut()).is_pending());
		assert_eq!(sync.in_flight(), 1);

		drop(pending);

		assert_eq!(sync.in_flight(), 0, "Abandoned flights release their slot.");

		let next = sync.synchronize("svc", || async { Ok(2) }).await;

		assert_eq!(next.expect("A fresh flight should start."), 2);
	}

	#[tokio::test]
	async fn cancelled_follower_does_not_cancel_the_leader() {
		let sync = RequestSynchronizer::<&'static str, u32>::new();
		let gate = Arc::new(Notify::new());
		let leader_gate = gate.clone();
		let mut leader = Box::pin(sync.synchronize("svc", move || async move {
			leader_gate.notified().await;

			Ok(3)
		}));

		assert!(futures::poll!(leader.as_mut()).is_pending());

		let mut follower = Box::pin(sync.synchronize("svc", || async { Ok(99) }));

		assert!(futures::poll!(follower.as_mut()).is_pending());

		drop(follower);
		gate.notify_one();

		assert_eq!(leader.await.expect("Leader should still complete."), 3);
	}
}
