//! `panorama`: a distributed health-observation server.
//!
//! Binds the peer RPC listener, wires the observation store, inference
//! engine, peer exchange and request dispatcher together, and runs until
//! interrupted. See `SPEC_FULL.md` for the full component design.

mod cli;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use panorama_config::ConfigSources;
use panorama_config::PanoramaConfig;
use panorama_dispatcher::{Dispatcher, DispatcherPeerHandler};
use panorama_exchange::{Exchange, PeerClientFactory};
use panorama_inference::Engine;
use panorama_store::Store;
use panorama_transport::{PeerRequestHandler, TcpPeerClientFactory};

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = main_main(cli) {
        eprintln!("panorama: {e:#}");
        std::process::exit(1);
    }
}

/// Resolve configuration, install logging, and hand off to the async runtime.
fn main_main(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli).context("resolving configuration")?;
    logging::init(config.log_level, cli.log_level.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("starting the tokio runtime")?;
    runtime.block_on(run(config))
}

/// Merge config files, environment variables (`PANORAMA_*`) and `-o`
/// overrides into a [`PanoramaConfig`].
fn resolve_config(cli: &Cli) -> Result<PanoramaConfig> {
    let mut sources = ConfigSources::new_empty();
    for file in &cli.config_files {
        sources.push_file(file);
    }
    sources.set_env_prefix("PANORAMA");
    for kv in &cli.options {
        sources.push_override(kv.clone());
    }
    Ok(sources.resolve()?)
}

/// Wire every subsystem together and serve until a ctrl-c arrives.
async fn run(config: PanoramaConfig) -> Result<()> {
    let persist = panorama_persist::open(config.db_file.as_deref()).context("opening persistence adapter")?;

    let store = Arc::new(Store::new(panorama_config::MAX_REPORT_PER_VIEW, persist.clone()));
    let engine = Engine::start(store.clone(), persist.clone(), panorama_config::VIEW_METRIC_HISTORY_SIZE);
    let factory: Arc<dyn PeerClientFactory> = Arc::new(TcpPeerClientFactory::new());
    let exchange = Arc::new(Exchange::new(config.id.clone(), config.peers.clone(), factory));
    let dispatcher = Dispatcher::new(store, engine, exchange, persist, config.buf, config.filter_submission);

    dispatcher.spawn_gc(config.gc);
    for subject in &config.subjects {
        dispatcher.observe(subject.clone());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .with_context(|| format!("parsing listen address {:?}", config.addr))?;
    let handler: Arc<dyn PeerRequestHandler> = Arc::new(DispatcherPeerHandler(dispatcher));

    tracing::info!(%addr, id = %config.id, "panorama listening");
    panorama_transport::serve(addr, handler, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received ctrl-c, shutting down");
    })
    .await
    .context("peer RPC listener")
}
