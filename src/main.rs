//! Demo binary: build the fleet, let it trade for a while, print the
//! accounting report.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use caresim::lifecycle::setup_tracing;
use caresim::{Config, Simulation, TracingObserver, UniformPacer};

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let config = Config::from_env()?;
    info!(?config, "configuration loaded");

    let pacer = Arc::new(UniformPacer::new(config.pause_min, config.pause_max));
    let sim = Simulation::build(&config, Arc::new(TracingObserver));

    info!(secs = config.run_for.as_secs(), "running the economy");
    let report = sim.run_for(pacer, config.run_for).await;
    report.emit();

    Ok(())
}
