//! Draw one version number on shard 0 and have every shard agree on it.
//!
//! Reads `SHARD_COUNT` / `SHARD_THREAD_PREFIX` for the topology and the
//! `SHARD_*` logging variables (see `shard-telemetry`).

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use shard_rendezvous::{invariant_agreement, version_rendezvous_on, VERSION};
use shard_runtime::{RuntimeConfig, ShardRuntime};
use shard_telemetry::{init_logging, TelemetryConfig};

const OWNER: u16 = 0;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("initializing logging")?;

    let config = RuntimeConfig::from_env();
    info!(
        version = VERSION,
        shards = config.shard_count,
        "[version-rendezvous] Starting"
    );

    let mut runtime = ShardRuntime::start(config).context("starting shard runtime")?;

    let point = version_rendezvous_on(runtime.dispatcher(), OWNER)
        .await
        .context("creating version rendezvous")?;
    let outcomes = point.resolve_everywhere().await;

    if let Err(err) = invariant_agreement(&outcomes) {
        error!(error = %err, "[version-rendezvous] Shards disagree");
        runtime.shutdown();
        bail!("shards disagree on the version: {}", err);
    }

    let version = match outcomes.into_iter().next() {
        Some(outcome) => outcome.context("resolving version")?,
        None => bail!("no shards participated"),
    };
    info!(
        rendezvous = %point.id(),
        owner = OWNER,
        participants = point.total_participants(),
        version,
        "[version-rendezvous] All shards agreed"
    );
    println!("{}", version);

    runtime.shutdown();
    Ok(())
}
