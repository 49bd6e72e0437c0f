use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedvisor::{Cli, GstGraph, LivenessTracker, LogWriter, SourceSet, Subscribe, Supervisor};

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let cfg = cli.to_config();
    let sources = Arc::new(SourceSet::from_addresses(cli.addresses.iter().cloned()));
    let tracker = Arc::new(LivenessTracker::new(sources.len()));
    info!(sources = sources.len(), "starting feedvisor");

    let (graph, health) = GstGraph::build(Arc::clone(&sources), Arc::clone(&tracker), &cfg)
        .context("failed to build pipeline graph")?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let sup = Supervisor::builder(cfg)
        .with_subscribers(subs)
        .build(sources, tracker, Arc::new(graph));

    let exit = sup.run(health).await.context("run loop failed")?;
    info!(?exit, "feedvisor stopped");
    Ok(())
}
