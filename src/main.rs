use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ledger_core::app::Ledger;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod http;
mod network;

use config::{Cli, Config};
use network::Replicator;

#[tokio::main]
async fn main() {
    let config = Config::from_cli(Cli::parse());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(peers = ?config.peers, bind = %config.bind_addr, "starting wagerchain node");

    let ledger = Arc::new(Ledger::new());
    let replicator = Arc::new(Replicator::new(Arc::clone(&ledger), config.peers.clone()));

    let gossip_replicator = Arc::clone(&replicator);
    tokio::spawn(async move {
        gossip_replicator.run_gossip().await;
    });

    let pull_replicator = Arc::clone(&replicator);
    let pull_interval = Duration::from_secs(config.pull_interval_secs);
    tokio::spawn(async move {
        pull_replicator.run_periodic_pull(pull_interval).await;
    });

    let state = http::AppState { ledger };
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind HTTP listener");
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.expect("HTTP server error");
}
