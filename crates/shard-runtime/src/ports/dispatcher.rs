//! # Shard Dispatcher Port
//!
//! Runs a callable inside a target shard's execution context and ferries
//! its result back to the caller.

use std::future::Future;

use futures::future::LocalBoxFuture;
use tokio::sync::oneshot;

use crate::domain::{DispatchError, ShardId};

/// A unit of work shipped to a shard.
///
/// The closure crosses threads; the future it builds stays on the target
/// shard and therefore need not be `Send`.
pub type ShardJob = Box<dyn FnOnce() -> LocalBoxFuture<'static, ()> + Send + 'static>;

/// Shard dispatcher - outbound port.
///
/// Implementations own a fixed topology of `shard_count()` shards, each a
/// single-threaded cooperative execution context.
pub trait ShardDispatcher: Send + Sync {
    /// Total number of shards. Fixed for the dispatcher's lifetime.
    fn shard_count(&self) -> u16;

    /// Shard the calling thread belongs to, if it is one of ours.
    fn current_shard(&self) -> Option<ShardId>;

    /// Enqueue `job` on `shard`.
    ///
    /// The job runs entirely on the target shard. Jobs submitted from one
    /// thread to one shard start in submission order.
    fn submit(&self, shard: ShardId, job: ShardJob) -> Result<(), DispatchError>;
}

/// Run `f` on `shard` and return its output to the calling context.
///
/// Fails with [`DispatchError::ShardUnavailable`] if the shard is gone, or
/// goes away before `f`'s future completes.
pub async fn run_on<F, Fut, R>(
    dispatcher: &dyn ShardDispatcher,
    shard: ShardId,
    f: F,
) -> Result<R, DispatchError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = R> + 'static,
    R: Send + 'static,
{
    let (reply_tx, reply_rx) = oneshot::channel();

    let job: ShardJob = Box::new(move || {
        Box::pin(async move {
            // Receiver dropped means the caller stopped waiting.
            let _ = reply_tx.send(f().await);
        })
    });

    dispatcher.submit(shard, job)?;

    reply_rx
        .await
        .map_err(|_| DispatchError::ShardUnavailable(shard))
}
