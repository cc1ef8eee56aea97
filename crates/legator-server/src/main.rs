//! Legator control-plane HTTP server, per SPEC_FULL.md §10. Wires the five
//! core crates into a runnable deployment, mirroring
//! `acteon-server::main`'s CLI/config/bind/graceful-shutdown shape.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use dashmap::DashMap;
use legator_bus::EventBus;
use legator_rules::AlertEngine;
use legator_server::config::LegatorConfig;
use legator_server::fleet::FleetRegistry;
use legator_server::state::AppState;
use legator_server::api;
use legator_state::{MemoryStateStore, WebhookStore};
use legator_tracker::CommandTracker;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "legator-server", about = "Fleet control-plane HTTP server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "legator.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config: LegatorConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        toml::from_str("")?
    };

    let rules: Arc<MemoryStateStore> = Arc::new(MemoryStateStore::new());
    let notifier = Arc::new(legator_notifier::WebhookNotifier::new(
        config.notifier.into_notify_config(),
    ));
    for webhook in rules.list_webhooks().await? {
        notifier.register(webhook);
    }
    let resolver = Arc::new(legator_routing::RoutingResolver::new(
        rules.clone(),
        rules.clone(),
    ));
    let fleet = Arc::new(FleetRegistry::new());
    let bus = EventBus::new();

    let engine = Arc::new(
        AlertEngine::new(
            rules.clone(),
            rules.clone(),
            fleet.clone(),
            notifier.clone(),
            Some(bus.clone()),
        )
        .await?
        .with_tick_interval(config.engine.tick_interval()),
    );
    engine.start();

    let tracker = Arc::new(CommandTracker::new(config.tracker.ttl()));
    let (reaper_stop_tx, reaper_stop_rx) = tokio::sync::watch::channel(false);
    let reaper_tracker = tracker.clone();
    tokio::spawn(async move {
        reaper_tracker.run_reaper(reaper_stop_rx).await;
    });

    let state = AppState {
        rules: rules.clone(),
        routing_policies: rules.clone(),
        escalations: rules.clone(),
        webhook_store: rules.clone(),
        notifier,
        resolver,
        engine: engine.clone(),
        tracker,
        fleet,
        outbound: Arc::new(DashMap::new()),
        bus,
    };

    let app = api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "legator-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = reaper_stop_tx.send(true);
    engine.stop().await;
    info!("legator-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
