//! # Rendezvous Point
//!
//! Lets every shard ask for one agreed value, computed lazily on a single
//! owner shard once all shards have asked.
//!
//! Each `resolve()` hops to the owner and registers an arrival there.
//! The owner's own call waits until all arrivals are in, runs the
//! generator once, publishes the outcome to the one-shot cell, then wakes
//! the forwarded callers, which read the cell and carry a clone back to
//! their shard.
//!
//! Owner-side bookkeeping (phase, barrier, generator) lives in the owner's
//! shard-local storage and is dropped once the round settles. Only the
//! published outcome outlives the round.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;
use shard_runtime::{current_dispatcher, local, run_on, ShardDispatcher, ShardId};
use tracing::{debug, info, warn};

use super::barrier::{Arrival, ArrivalBarrier};
use super::result_cell::ResultCell;
use crate::domain::{invariant_all_arrived, Outcome, Phase, RendezvousError, RendezvousId};

static NEXT_RENDEZVOUS_ID: AtomicU64 = AtomicU64::new(1);

type Generator<T> = Box<dyn FnOnce() -> LocalBoxFuture<'static, anyhow::Result<T>>>;

fn boxed_generator<T, F, Fut, E>(generator: F) -> Generator<T>
where
    T: 'static,
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Into<anyhow::Error> + 'static,
{
    Box::new(move || async move { generator().await.map_err(Into::into) }.boxed_local())
}

/// Owner-confined state of one round.
struct OwnerState<T> {
    phase: Cell<Phase>,
    barrier: RefCell<ArrivalBarrier>,
    generator: RefCell<Option<Generator<T>>>,
}

impl<T> OwnerState<T> {
    fn new(owner: ShardId, total: usize, generator: Generator<T>) -> Self {
        Self {
            phase: Cell::new(Phase::Pending),
            barrier: RefCell::new(ArrivalBarrier::new(owner, total)),
            generator: RefCell::new(Some(generator)),
        }
    }

    fn transition(&self, next: Phase) -> Result<(), RendezvousError> {
        let current = self.phase.get();
        if !current.can_transition_to(next) {
            return Err(RendezvousError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        self.phase.set(next);
        Ok(())
    }
}

struct Shared<T> {
    id: RendezvousId,
    owner: ShardId,
    total: usize,
    cell: ResultCell<T>,
    dispatcher: Arc<dyn ShardDispatcher>,
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs on the owner shard, once per `resolve()` that reaches it.
    async fn arrive(self: Arc<Self>, caller: ShardId) -> Outcome<T> {
        let Some(state) = local::get::<OwnerState<T>>(self.id.0) else {
            // Settled and cleaned up while this call was in flight.
            return self.published();
        };

        let arrival = state.barrier.borrow_mut().arrive(caller);
        let arrival = match arrival {
            Ok(arrival) => arrival,
            Err(err) => {
                warn!(rendezvous = %self.id, shard = caller, error = %err, "[rendezvous] Arrival rejected");
                return Err(err);
            }
        };

        match arrival {
            Arrival::Complete => self.compute(&state).await,
            Arrival::AwaitPeers(all_arrived) => {
                debug!(
                    rendezvous = %self.id,
                    arrivals = state.barrier.borrow().arrivals(),
                    total = self.total,
                    "[rendezvous] Owner arrived, waiting for peers"
                );
                all_arrived.await.map_err(|_| {
                    RendezvousError::StateInconsistency(format!(
                        "{}: arrival signal dropped",
                        self.id
                    ))
                })?;
                self.compute(&state).await
            }
            Arrival::AwaitResult(published) => {
                debug!(
                    rendezvous = %self.id,
                    shard = caller,
                    arrivals = state.barrier.borrow().arrivals(),
                    total = self.total,
                    "[rendezvous] Shard arrived"
                );
                drop(state);
                published
                    .await
                    .map_err(|_| RendezvousError::ShardUnavailable(self.owner))?;
                self.published()
            }
        }
    }

    /// Owner only, exactly once: run the generator and broadcast.
    async fn compute(&self, state: &OwnerState<T>) -> Outcome<T> {
        state.transition(Phase::Computing)?;
        invariant_all_arrived(state.barrier.borrow().arrivals(), self.total)?;
        let generator = state.generator.borrow_mut().take().ok_or_else(|| {
            RendezvousError::StateInconsistency(format!("{}: generator already consumed", self.id))
        })?;

        debug!(rendezvous = %self.id, "[rendezvous] All shards arrived, running generator");
        let outcome = match AssertUnwindSafe(generator()).catch_unwind().await {
            Ok(result) => result.map_err(RendezvousError::generator),
            Err(panic) => Err(RendezvousError::generator(anyhow::anyhow!(
                "generator panicked: {}",
                panic_message(&*panic)
            ))),
        };
        state.transition(Phase::settled(&outcome))?;

        // Publish before waking: waiters read the cell as soon as they wake.
        self.cell.fill(outcome.clone())?;
        let woken = state.barrier.borrow_mut().release();
        local::remove::<OwnerState<T>>(self.id.0);

        match &outcome {
            Ok(_) => info!(rendezvous = %self.id, woken, "[rendezvous] Resolved"),
            Err(err) => warn!(rendezvous = %self.id, woken, error = %err, "[rendezvous] Failed"),
        }
        outcome
    }

    fn published(&self) -> Outcome<T> {
        self.cell.get().cloned().unwrap_or_else(|| {
            Err(RendezvousError::StateInconsistency(format!(
                "{}: woken before the result was published",
                self.id
            )))
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Shared handle to a single-use, cross-shard rendezvous.
///
/// Cloning is cheap and every clone refers to the same instance; hand one
/// to each shard. Every shard in the topology must call
/// [`resolve`](Self::resolve) once. The generator runs once, on the owner,
/// after the last arrival, and all callers receive the same outcome.
///
/// A shard that never calls `resolve()` stalls the round forever. There
/// is no timeout; wrap the call externally if one is needed.
pub struct RendezvousPoint<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RendezvousPoint<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> RendezvousPoint<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a rendezvous owned by the calling shard.
    ///
    /// Fails with [`RendezvousError::NotOnShard`] off-shard.
    pub fn create<F, E>(
        dispatcher: Arc<dyn ShardDispatcher>,
        generator: F,
    ) -> Result<Self, RendezvousError>
    where
        F: FnOnce() -> Result<T, E> + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        Self::create_async(dispatcher, move || std::future::ready(generator()))
    }

    /// Like [`create`](Self::create), with a generator returning a future.
    /// The future is polled on the owner and need not be `Send`.
    pub fn create_async<F, Fut, E>(
        dispatcher: Arc<dyn ShardDispatcher>,
        generator: F,
    ) -> Result<Self, RendezvousError>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        let owner = dispatcher
            .current_shard()
            .ok_or(RendezvousError::NotOnShard)?;
        let point = Self::unregistered(dispatcher, owner);
        point.register(boxed_generator(generator));
        Ok(point)
    }

    /// Create a rendezvous owned by `owner`, from any thread.
    pub async fn create_on<F, E>(
        dispatcher: Arc<dyn ShardDispatcher>,
        owner: ShardId,
        generator: F,
    ) -> Result<Self, RendezvousError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        if owner >= dispatcher.shard_count() {
            return Err(RendezvousError::UnknownShard(owner));
        }

        let point = Self::unregistered(dispatcher, owner);
        let on_owner = point.clone();
        run_on(point.shared.dispatcher.as_ref(), owner, move || async move {
            on_owner.register(boxed_generator(move || std::future::ready(generator())));
        })
        .await?;
        Ok(point)
    }

    fn unregistered(dispatcher: Arc<dyn ShardDispatcher>, owner: ShardId) -> Self {
        let id = RendezvousId(NEXT_RENDEZVOUS_ID.fetch_add(1, Ordering::Relaxed));
        let total = dispatcher.shard_count() as usize;
        Self {
            shared: Arc::new(Shared {
                id,
                owner,
                total,
                cell: ResultCell::new(),
                dispatcher,
            }),
        }
    }

    /// Must run on the owner shard.
    fn register(&self, generator: Generator<T>) {
        let shared = &self.shared;
        local::insert(
            shared.id.0,
            Rc::new(OwnerState::new(shared.owner, shared.total, generator)),
        );
        debug!(
            rendezvous = %shared.id,
            owner = shared.owner,
            participants = shared.total,
            "[rendezvous] Created"
        );
    }

    /// Arrive at the rendezvous and wait for the agreed outcome.
    ///
    /// Once the round has settled, returns the published outcome directly
    /// without arriving again. A second call from the same shard while the
    /// round is still pending fails with
    /// [`RendezvousError::DuplicateArrival`].
    pub async fn resolve(&self) -> Outcome<T> {
        if let Some(outcome) = self.shared.cell.get() {
            return outcome.clone();
        }

        let caller = self
            .shared
            .dispatcher
            .current_shard()
            .ok_or(RendezvousError::NotOnShard)?;
        let owner = self.shared.owner;
        let shared = Arc::clone(&self.shared);

        run_on(self.shared.dispatcher.as_ref(), owner, move || {
            shared.arrive(caller)
        })
        .await?
    }

    /// Call [`resolve`](Self::resolve) from every shard and collect the
    /// outcomes, indexed by shard.
    pub async fn resolve_everywhere(&self) -> Vec<Outcome<T>> {
        let calls = (0..self.shared.dispatcher.shard_count()).map(|shard| {
            let point = self.clone();
            async move {
                let caller = point.clone();
                run_on(point.shared.dispatcher.as_ref(), shard, move || async move {
                    caller.resolve().await
                })
                .await
                .map_err(RendezvousError::from)
                .and_then(|outcome| outcome)
            }
        });
        join_all(calls).await
    }

    /// Published outcome, if the round has settled. Any thread.
    pub fn peek(&self) -> Option<Outcome<T>> {
        self.shared.cell.get().cloned()
    }
}

impl<T> RendezvousPoint<T> {
    /// Instance identity.
    pub fn id(&self) -> RendezvousId {
        self.shared.id
    }

    /// Shard that runs the generator.
    pub fn owner(&self) -> ShardId {
        self.shared.owner
    }

    /// Number of shards that must arrive.
    pub fn total_participants(&self) -> usize {
        self.shared.total
    }

    /// Whether the outcome has been published.
    pub fn is_resolved(&self) -> bool {
        self.shared.cell.is_filled()
    }

    /// Phase as seen from outside the owner: `Pending` until published,
    /// then `Resolved` or `Failed`.
    pub fn phase(&self) -> Phase {
        self.shared.cell.phase()
    }
}

impl<T> fmt::Debug for RendezvousPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendezvousPoint")
            .field("id", &self.shared.id)
            .field("owner", &self.shared.owner)
            .field("total", &self.shared.total)
            .field("phase", &self.phase())
            .finish()
    }
}

/// Create a rendezvous owned by the calling shard, using the shard's own
/// dispatcher.
pub fn make_rendezvous<T, F, E>(generator: F) -> Result<RendezvousPoint<T>, RendezvousError>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<T, E> + 'static,
    E: Into<anyhow::Error> + 'static,
{
    let dispatcher = current_dispatcher().ok_or(RendezvousError::NotOnShard)?;
    RendezvousPoint::create(dispatcher, generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shard_runtime::{RuntimeConfig, ShardRuntime};
    use std::sync::atomic::AtomicUsize;

    fn start(shards: u16) -> ShardRuntime {
        ShardRuntime::start(RuntimeConfig::for_testing().with_shard_count(shards)).unwrap()
    }

    #[tokio::test]
    async fn test_create_off_shard_fails() {
        let runtime = start(2);
        let result = RendezvousPoint::create(runtime.dispatcher(), || Ok::<_, anyhow::Error>(1u32));
        assert!(matches!(result, Err(RendezvousError::NotOnShard)));
    }

    #[tokio::test]
    async fn test_create_on_current_shard() {
        let runtime = start(3);
        let point = runtime
            .run_on(2, || async {
                make_rendezvous(|| Ok::<_, anyhow::Error>(5u32))
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(point.owner(), 2);
        assert_eq!(point.total_participants(), 3);
        assert_eq!(point.phase(), Phase::Pending);
    }

    #[tokio::test]
    async fn test_create_on_unknown_owner() {
        let runtime = start(2);
        let result =
            RendezvousPoint::create_on(runtime.dispatcher(), 2, || Ok::<_, anyhow::Error>(1u32))
                .await;
        assert!(matches!(result, Err(RendezvousError::UnknownShard(2))));
    }

    #[tokio::test]
    async fn test_resolve_off_shard_fails() {
        let runtime = start(2);
        let point =
            RendezvousPoint::create_on(runtime.dispatcher(), 0, || Ok::<_, anyhow::Error>(1u32))
                .await
                .unwrap();
        assert!(matches!(
            point.resolve().await,
            Err(RendezvousError::NotOnShard)
        ));
    }

    #[tokio::test]
    async fn test_single_shard_resolves_without_peers() {
        let runtime = start(1);
        let outcome = runtime
            .run_on(0, || async {
                match make_rendezvous(|| Ok::<_, anyhow::Error>(99u64)) {
                    Ok(point) => point.resolve().await,
                    Err(err) => Err(err),
                }
            })
            .await
            .unwrap();
        assert_eq!(outcome.unwrap(), 99);
    }

    #[tokio::test]
    async fn test_resolve_everywhere_agrees() {
        let runtime = start(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let point = RendezvousPoint::create_on(runtime.dispatcher(), 1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(String::from("agreed"))
        })
        .await
        .unwrap();

        let outcomes = point.resolve_everywhere().await;
        assert_eq!(outcomes.len(), 4);
        for outcome in outcomes {
            assert_eq!(outcome.unwrap(), "agreed");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(point.phase(), Phase::Resolved);
    }

    #[tokio::test]
    async fn test_async_generator_runs_on_owner() {
        let runtime = start(3);
        let point = runtime
            .run_on(2, || async {
                let dispatcher = current_dispatcher().unwrap();
                RendezvousPoint::create_async(dispatcher, || async {
                    tokio::task::yield_now().await;
                    Ok::<_, anyhow::Error>(shard_runtime::current_shard())
                })
            })
            .await
            .unwrap()
            .unwrap();

        for outcome in point.resolve_everywhere().await {
            assert_eq!(outcome.unwrap(), Some(2));
        }
    }

    #[tokio::test]
    async fn test_owner_state_released_after_round() {
        let runtime = start(2);
        let point =
            RendezvousPoint::create_on(runtime.dispatcher(), 0, || Ok::<_, anyhow::Error>(1u8))
                .await
                .unwrap();

        let before = runtime.run_on(0, || async { local::len() }).await.unwrap();
        assert_eq!(before, 1);

        point.resolve_everywhere().await;

        let after = runtime.run_on(0, || async { local::len() }).await.unwrap();
        assert_eq!(after, 0);
    }

    #[tokio::test]
    async fn test_generator_panic_is_broadcast_as_failure() {
        let runtime = start(2);
        let point = RendezvousPoint::create_on(runtime.dispatcher(), 0, || {
            if true {
                panic!("kaboom");
            }
            Ok::<u32, anyhow::Error>(0)
        })
        .await
        .unwrap();

        let outcomes = point.resolve_everywhere().await;
        for outcome in &outcomes {
            let err = outcome.as_ref().unwrap_err();
            assert!(err.to_string().contains("kaboom"));
        }
        assert_eq!(point.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn test_debug_format() {
        let runtime = start(1);
        let point =
            RendezvousPoint::create_on(runtime.dispatcher(), 0, || Ok::<_, anyhow::Error>(1u8))
                .await
                .unwrap();
        let debug = format!("{:?}", point);
        assert!(debug.contains("RendezvousPoint"));
        assert!(debug.contains("Pending"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(&*payload), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
