//! # Version Counter
//!
//! Per-shard, strictly increasing version numbers for locally generated
//! state. No cross-shard coordination: two shards hand out overlapping
//! sequences. Combine with a rendezvous to make every shard agree on one
//! number drawn from a single shard's sequence.

use std::convert::Infallible;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use shard_runtime::{ShardDispatcher, ShardId};

use crate::algorithms::RendezvousPoint;
use crate::domain::RendezvousError;

/// Monotonic version source. The first version handed out is 1.
#[derive(Debug)]
pub struct VersionGenerator {
    next: AtomicI32,
}

impl VersionGenerator {
    /// Fresh generator.
    pub const fn new() -> Self {
        Self {
            next: AtomicI32::new(1),
        }
    }

    /// Take the next version. Wraps after `i32::MAX`.
    pub fn next(&self) -> i32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Version the next call to [`next`](Self::next) will return.
    pub fn current(&self) -> i32 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for VersionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static SHARD_VERSIONS: VersionGenerator = const { VersionGenerator::new() };
}

/// Next version from the calling shard's own generator.
pub fn next_version() -> i32 {
    SHARD_VERSIONS.with(VersionGenerator::next)
}

/// Rendezvous on the current shard whose agreed value is one
/// [`next_version`] drawn on that shard.
pub fn version_rendezvous(
    dispatcher: Arc<dyn ShardDispatcher>,
) -> Result<RendezvousPoint<i32>, RendezvousError> {
    RendezvousPoint::create(dispatcher, || Ok::<_, Infallible>(next_version()))
}

/// Like [`version_rendezvous`], owned by `owner` and callable from any thread.
pub async fn version_rendezvous_on(
    dispatcher: Arc<dyn ShardDispatcher>,
    owner: ShardId,
) -> Result<RendezvousPoint<i32>, RendezvousError> {
    RendezvousPoint::create_on(dispatcher, owner, || Ok::<_, Infallible>(next_version())).await
}
