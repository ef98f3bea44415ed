//! Thread-per-core Runtime Adapter
//!
//! Implements the `ShardDispatcher` port with one OS thread per shard. Each
//! thread drives a single-threaded tokio executor with a `LocalSet`, so
//! everything scheduled on a shard runs cooperatively and never races with
//! other work on the same shard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;
use tracing::{debug, info, warn};

use crate::context;
use crate::domain::{DispatchError, RuntimeConfig, ShardId};
use crate::local;
use crate::ports::{run_on, ShardDispatcher, ShardJob};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Per-shard unbounded job queues.
struct QueueDispatcher {
    runtime_id: u64,
    queues: Vec<mpsc::UnboundedSender<ShardJob>>,
}

impl ShardDispatcher for QueueDispatcher {
    fn shard_count(&self) -> u16 {
        self.queues.len() as u16
    }

    fn current_shard(&self) -> Option<ShardId> {
        context::shard_of_runtime(self.runtime_id)
    }

    fn submit(&self, shard: ShardId, job: ShardJob) -> Result<(), DispatchError> {
        let queue = self
            .queues
            .get(shard as usize)
            .ok_or(DispatchError::UnknownShard(shard))?;

        // Same-shard hop: spawn locally, skip the queue.
        if self.current_shard() == Some(shard) {
            tokio::task::spawn_local(job());
            return Ok(());
        }

        queue
            .send(job)
            .map_err(|_| DispatchError::ShardUnavailable(shard))
    }
}

struct ShardThread {
    shard_id: ShardId,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// A fixed set of shard threads.
///
/// Dropping the runtime shuts it down. Work still queued or suspended on a
/// shard at that point is dropped, and its callers see
/// [`DispatchError::ShardUnavailable`].
pub struct ShardRuntime {
    runtime_id: u64,
    config: RuntimeConfig,
    dispatcher: Arc<QueueDispatcher>,
    shards: Vec<ShardThread>,
}

impl ShardRuntime {
    /// Validate `config` and start one thread per shard.
    pub fn start(config: RuntimeConfig) -> Result<Self, DispatchError> {
        config.validate()?;

        let runtime_id = NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed);
        let shard_count = config.shard_count as usize;

        let mut queues = Vec::with_capacity(shard_count);
        let mut receivers = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            let (tx, rx) = mpsc::unbounded_channel();
            queues.push(tx);
            receivers.push(rx);
        }

        let mut runtime = Self {
            runtime_id,
            config,
            dispatcher: Arc::new(QueueDispatcher { runtime_id, queues }),
            shards: Vec::with_capacity(shard_count),
        };

        // On error, dropping `runtime` stops the shards already started.
        for (index, jobs) in receivers.into_iter().enumerate() {
            let shard_id = index as ShardId;
            let executor = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| DispatchError::Spawn(e.to_string()))?;
            let (stop_tx, stop_rx) = oneshot::channel();
            let dispatcher: Arc<dyn ShardDispatcher> = runtime.dispatcher.clone();

            let handle = thread::Builder::new()
                .name(runtime.config.thread_name(shard_id))
                .spawn(move || {
                    shard_main(runtime_id, shard_id, executor, jobs, stop_rx, dispatcher)
                })
                .map_err(|e| DispatchError::Spawn(e.to_string()))?;

            runtime.shards.push(ShardThread {
                shard_id,
                stop: Some(stop_tx),
                handle: Some(handle),
            });
        }

        info!(
            runtime = runtime_id,
            shards = shard_count,
            "[shard-runtime] Runtime started"
        );
        Ok(runtime)
    }

    /// Total number of shards.
    pub fn shard_count(&self) -> u16 {
        self.config.shard_count
    }

    /// Configuration the runtime was started with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Dispatcher handle, shareable with any thread.
    pub fn dispatcher(&self) -> Arc<dyn ShardDispatcher> {
        self.dispatcher.clone()
    }

    /// Run `f` on `shard` and await its output.
    pub async fn run_on<F, Fut, R>(&self, shard: ShardId, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = R> + 'static,
        R: Send + 'static,
    {
        run_on(self.dispatcher.as_ref(), shard, f).await
    }

    /// Whether any shard thread is still running.
    pub fn is_running(&self) -> bool {
        self.shards.iter().any(|s| s.handle.is_some())
    }

    /// Stop every shard and join its thread. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.is_running() {
            return;
        }

        for shard in &mut self.shards {
            if let Some(stop) = shard.stop.take() {
                // Receiver gone means the shard already exited.
                let _ = stop.send(());
            }
        }

        let me = thread::current().id();
        for shard in &mut self.shards {
            let Some(handle) = shard.handle.take() else {
                continue;
            };
            if handle.thread().id() == me {
                // Shutting down from inside a shard; it exits on its own.
                continue;
            }
            if handle.join().is_err() {
                warn!(
                    runtime = self.runtime_id,
                    shard = shard.shard_id,
                    "[shard-runtime] Shard thread panicked"
                );
            }
        }

        info!(runtime = self.runtime_id, "[shard-runtime] Runtime stopped");
    }
}

impl Drop for ShardRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn shard_main(
    runtime_id: u64,
    shard_id: ShardId,
    executor: tokio::runtime::Runtime,
    mut jobs: mpsc::UnboundedReceiver<ShardJob>,
    mut stop: oneshot::Receiver<()>,
    dispatcher: Arc<dyn ShardDispatcher>,
) {
    context::enter(runtime_id, shard_id, dispatcher);
    debug!(runtime = runtime_id, shard = shard_id, "[shard-runtime] Shard started");

    let tasks = LocalSet::new();
    tasks.block_on(&executor, async move {
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                job = jobs.recv() => match job {
                    Some(job) => {
                        tokio::task::spawn_local(job());
                    }
                    None => break,
                },
            }
        }
    });

    // Unfinished tasks drop here, on their own shard.
    drop(tasks);
    local::clear();
    context::exit();
    drop(executor);

    debug!(runtime = runtime_id, shard = shard_id, "[shard-runtime] Shard stopped");
}
