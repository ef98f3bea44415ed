//! # Shard Context
//!
//! Per-thread record of which shard (of which runtime) the thread runs.
//! Answers the topology queries "which shard am I on" and "how do I reach
//! the other shards".

use std::cell::RefCell;
use std::sync::Arc;

use crate::domain::ShardId;
use crate::ports::ShardDispatcher;

struct ShardContext {
    runtime_id: u64,
    shard_id: ShardId,
    dispatcher: Arc<dyn ShardDispatcher>,
}

thread_local! {
    static CONTEXT: RefCell<Option<ShardContext>> = const { RefCell::new(None) };
}

/// Shard id of the calling thread, or `None` off-shard.
pub fn current_shard() -> Option<ShardId> {
    CONTEXT.with(|ctx| ctx.borrow().as_ref().map(|c| c.shard_id))
}

/// Dispatcher of the runtime the calling thread belongs to.
pub fn current_dispatcher() -> Option<Arc<dyn ShardDispatcher>> {
    CONTEXT.with(|ctx| ctx.borrow().as_ref().map(|c| Arc::clone(&c.dispatcher)))
}

/// Shard id of the calling thread if it belongs to runtime `runtime_id`.
pub(crate) fn shard_of_runtime(runtime_id: u64) -> Option<ShardId> {
    CONTEXT.with(|ctx| {
        ctx.borrow()
            .as_ref()
            .filter(|c| c.runtime_id == runtime_id)
            .map(|c| c.shard_id)
    })
}

pub(crate) fn enter(runtime_id: u64, shard_id: ShardId, dispatcher: Arc<dyn ShardDispatcher>) {
    CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = Some(ShardContext {
            runtime_id,
            shard_id,
            dispatcher,
        });
    });
}

pub(crate) fn exit() {
    // Take first so the dispatcher drops outside the borrow.
    let previous = CONTEXT.with(|ctx| ctx.borrow_mut().take());
    drop(previous);
}
