//! # Inbound Ports
//!
//! What a shard can do with a rendezvous it has been handed.

use async_trait::async_trait;
use shard_runtime::ShardId;

use crate::algorithms::RendezvousPoint;
use crate::domain::Outcome;

/// Rendezvous API - inbound port.
#[async_trait]
pub trait RendezvousApi<T>: Send + Sync {
    /// Arrive and wait for the agreed outcome. Call once per shard.
    async fn resolve(&self) -> Outcome<T>;

    /// Published outcome, if any.
    fn peek(&self) -> Option<Outcome<T>>;

    /// Shard that runs the generator.
    fn owner(&self) -> ShardId;

    /// Number of shards that must arrive.
    fn total_participants(&self) -> usize;
}

#[async_trait]
impl<T> RendezvousApi<T> for RendezvousPoint<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn resolve(&self) -> Outcome<T> {
        RendezvousPoint::resolve(self).await
    }

    fn peek(&self) -> Option<Outcome<T>> {
        RendezvousPoint::peek(self)
    }

    fn owner(&self) -> ShardId {
        RendezvousPoint::owner(self)
    }

    fn total_participants(&self) -> usize {
        RendezvousPoint::total_participants(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shard_runtime::{RuntimeConfig, ShardRuntime};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_resolve_through_trait_object() {
        let runtime =
            ShardRuntime::start(RuntimeConfig::for_testing().with_shard_count(2)).unwrap();
        let point =
            RendezvousPoint::create_on(runtime.dispatcher(), 1, || Ok::<_, anyhow::Error>(7i64))
                .await
                .unwrap();

        let api: Arc<dyn RendezvousApi<i64>> = Arc::new(point.clone());
        assert_eq!(api.owner(), 1);
        assert_eq!(api.total_participants(), 2);
        assert!(api.peek().is_none());

        let outcomes = runtime.run_on(1, {
            let api = Arc::clone(&api);
            move || async move { api.resolve().await }
        });
        let other = runtime.run_on(0, move || async move { api.resolve().await });
        let (a, b) = tokio::join!(outcomes, other);

        assert_eq!(a.unwrap().unwrap(), 7);
        assert_eq!(b.unwrap().unwrap(), 7);
        assert!(matches!(point.peek(), Some(Ok(7))));
    }
}
