//! # Arrival Barrier
//!
//! Owner-side arrival counting for one rendezvous round.
//!
//! The barrier lives in the owner shard's local storage and is only ever
//! touched by tasks running on that shard, so it is a plain struct: no
//! atomics, no locks. Waking happens through oneshot channels parked
//! here by each arrival.

use shard_runtime::ShardId;
use tokio::sync::oneshot;

use crate::domain::{invariant_single_arrival, RendezvousError};

/// What an arriving shard must do next.
#[derive(Debug)]
pub enum Arrival {
    /// Owner arrived last: compute now.
    Complete,
    /// Owner arrived early: wait for the other shards, then compute.
    AwaitPeers(oneshot::Receiver<()>),
    /// Non-owner: wait for the owner to publish the result.
    AwaitResult(oneshot::Receiver<()>),
}

/// Arrival-counting barrier for a fixed topology.
#[derive(Debug)]
pub struct ArrivalBarrier {
    owner: ShardId,
    arrived: Vec<bool>,
    arrivals: usize,
    /// Fired when the last shard arrives while the owner is waiting.
    owner_wake: Option<oneshot::Sender<()>>,
    /// One per suspended non-owner, fired after the result is written.
    waiters: Vec<oneshot::Sender<()>>,
}

impl ArrivalBarrier {
    /// Barrier for `total` shards, computed on `owner`.
    pub fn new(owner: ShardId, total: usize) -> Self {
        Self {
            owner,
            arrived: vec![false; total],
            arrivals: 0,
            owner_wake: None,
            waiters: Vec::with_capacity(total.saturating_sub(1)),
        }
    }

    /// Signal `shard`'s arrival.
    pub fn arrive(&mut self, shard: ShardId) -> Result<Arrival, RendezvousError> {
        let slot = self
            .arrived
            .get_mut(shard as usize)
            .ok_or(RendezvousError::UnknownShard(shard))?;
        invariant_single_arrival(shard, *slot)?;
        *slot = true;
        self.arrivals += 1;

        if shard == self.owner {
            if self.is_complete() {
                return Ok(Arrival::Complete);
            }
            let (tx, rx) = oneshot::channel();
            self.owner_wake = Some(tx);
            return Ok(Arrival::AwaitPeers(rx));
        }

        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);

        if self.is_complete() {
            if let Some(wake) = self.owner_wake.take() {
                // Dropped receiver: owner task is gone, nothing to wake.
                let _ = wake.send(());
            }
        }
        Ok(Arrival::AwaitResult(rx))
    }

    /// Whether every shard has arrived.
    pub fn is_complete(&self) -> bool {
        self.arrivals == self.arrived.len()
    }

    /// Shards arrived so far.
    pub fn arrivals(&self) -> usize {
        self.arrivals
    }

    /// Total participants.
    pub fn total(&self) -> usize {
        self.arrived.len()
    }

    /// Non-owners currently suspended on the result.
    pub fn waiters(&self) -> usize {
        self.waiters.len()
    }

    /// Wake every suspended non-owner. Returns how many were signalled.
    ///
    /// Call only after the result has been written.
    pub fn release(&mut self) -> usize {
        let waiters = std::mem::take(&mut self.waiters);
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_shard_completes_immediately() {
        let mut barrier = ArrivalBarrier::new(0, 1);
        assert!(matches!(barrier.arrive(0), Ok(Arrival::Complete)));
        assert_eq!(barrier.waiters(), 0);
        assert_eq!(barrier.release(), 0);
    }

    #[test]
    fn test_owner_first_waits_for_peers() {
        let mut barrier = ArrivalBarrier::new(0, 3);

        let Ok(Arrival::AwaitPeers(mut owner_rx)) = barrier.arrive(0) else {
            panic!("owner should wait for peers");
        };
        assert!(matches!(barrier.arrive(1), Ok(Arrival::AwaitResult(_))));
        assert!(owner_rx.try_recv().is_err());

        assert!(matches!(barrier.arrive(2), Ok(Arrival::AwaitResult(_))));
        assert!(owner_rx.try_recv().is_ok());
        assert!(barrier.is_complete());
    }

    #[test]
    fn test_owner_last_completes() {
        let mut barrier = ArrivalBarrier::new(1, 3);
        assert!(matches!(barrier.arrive(0), Ok(Arrival::AwaitResult(_))));
        assert!(matches!(barrier.arrive(2), Ok(Arrival::AwaitResult(_))));
        assert!(matches!(barrier.arrive(1), Ok(Arrival::Complete)));
        assert_eq!(barrier.arrivals(), 3);
    }

    #[test]
    fn test_release_wakes_exactly_n_minus_one() {
        let mut barrier = ArrivalBarrier::new(0, 4);
        let _owner = barrier.arrive(0).unwrap();

        let mut receivers = Vec::new();
        for shard in 1..4 {
            match barrier.arrive(shard).unwrap() {
                Arrival::AwaitResult(rx) => receivers.push(rx),
                other => panic!("unexpected arrival: {:?}", other),
            }
        }
        assert_eq!(barrier.waiters(), 3);

        assert_eq!(barrier.release(), 3);
        for mut rx in receivers {
            assert!(rx.try_recv().is_ok());
        }
        assert_eq!(barrier.waiters(), 0);
    }

    #[test]
    fn test_waiters_not_woken_before_release() {
        let mut barrier = ArrivalBarrier::new(0, 2);
        let _owner = barrier.arrive(0).unwrap();
        let Ok(Arrival::AwaitResult(mut rx)) = barrier.arrive(1) else {
            panic!("non-owner should await the result");
        };
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_duplicate_arrival_rejected_without_counting() {
        let mut barrier = ArrivalBarrier::new(0, 3);
        let _first = barrier.arrive(1).unwrap();

        let second = barrier.arrive(1);
        assert!(matches!(
            second,
            Err(RendezvousError::DuplicateArrival { shard: 1 })
        ));
        assert_eq!(barrier.arrivals(), 1);
        assert_eq!(barrier.waiters(), 1);
    }

    #[test]
    fn test_unknown_shard_rejected() {
        let mut barrier = ArrivalBarrier::new(0, 2);
        assert!(matches!(
            barrier.arrive(5),
            Err(RendezvousError::UnknownShard(5))
        ));
        assert_eq!(barrier.arrivals(), 0);
    }
}
