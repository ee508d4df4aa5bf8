use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashmap::DashMap;
use tracing::info;

use callscope_core::config::{CallscopeConfig, EVENT_BUS_CAPACITY};
use callscope_dispatch::FanoutDispatcher;
use callscope_ingress::{
    AnalyticsTrigger, HttpAnalyticsTrigger, IngressAdapter, PipelineHandle, StreamSource,
    TriggerError,
};
use callscope_registry::{ConnectionRegistry, SqliteRegistry};

mod app;
mod http;
mod lifecycle;
mod transport;
mod ws;

use lifecycle::{ConnectionLifecycle, LiveConnections};
use transport::WsPushTransport;

#[derive(Debug, Parser)]
#[command(name = "callscope-gateway", about = "Call-analytics event gateway")]
struct Cli {
    /// Path to callscope.toml (default: ~/.callscope/callscope.toml).
    #[arg(long)]
    config: Option<String>,
    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callscope_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: explicit flag > CALLSCOPE_CONFIG env > ~/.callscope/callscope.toml
    let config_path = cli.config.or_else(|| std::env::var("CALLSCOPE_CONFIG").ok());
    let mut config = CallscopeConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        CallscopeConfig::default()
    });
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    info!(
        upstream_channel = config.upstream.channel.as_deref().unwrap_or("-"),
        upstream_region = config.upstream.region.as_deref().unwrap_or("-"),
        "upstream identifiers"
    );

    // connection registry — SQLite so membership survives across units of work
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    // busy_timeout bounds registry reads/writes under writer contention
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    callscope_registry::db::init_db(&db)?;

    let registry: Arc<dyn ConnectionRegistry> = Arc::new(SqliteRegistry::new(db));
    let live: LiveConnections = Arc::new(DashMap::new());

    let transport = Arc::new(WsPushTransport::new(Arc::clone(&live)));
    let dispatcher = FanoutDispatcher::new(
        Arc::clone(&registry),
        transport,
        Duration::from_millis(config.delivery.push_timeout_ms),
    );

    // Event bus: ingress adapter -> dispatch loop, drained in arrival order.
    let (bus_tx, mut bus_rx) = tokio::sync::mpsc::channel(EVENT_BUS_CAPACITY);
    let ingress = IngressAdapter::new(
        build_trigger(&config),
        bus_tx,
        Duration::from_millis(config.delivery.trigger_timeout_ms),
    );

    let lifecycle = ConnectionLifecycle::new(Arc::clone(&registry), Arc::clone(&live));
    let state = Arc::new(app::AppState::new(config.clone(), ingress, lifecycle));
    let router = app::build_router(Arc::clone(&state));

    // Dispatch loop: one pass per event, strictly in bus order, so events
    // for the same viewer are never reordered.
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe = bus_rx.recv() => match maybe {
                    Some(envelope) => {
                        if let Err(e) = dispatcher.dispatch(&envelope).await {
                            tracing::warn!(error = %e, "dispatch pass failed");
                        }
                    }
                    None => break,
                },
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!("callscope gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    // signal the dispatch loop to stop
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Build the upstream trigger from config. Without both endpoints the
/// status events still flow to viewers, they just fire nothing upstream.
fn build_trigger(config: &CallscopeConfig) -> Arc<dyn AnalyticsTrigger> {
    match (
        config.triggers.pipeline_endpoint.as_deref(),
        config.triggers.tone_endpoint.as_deref(),
    ) {
        (Some(pipeline), Some(tone)) => {
            info!(pipeline_endpoint = %pipeline, tone_endpoint = %tone, "upstream triggers enabled");
            Arc::new(HttpAnalyticsTrigger::new(pipeline, tone))
        }
        _ => {
            tracing::warn!(
                "trigger endpoints not configured — status events will not start analytics"
            );
            Arc::new(NullTrigger)
        }
    }
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

/// Placeholder trigger when no endpoints are configured.
struct NullTrigger;

#[async_trait::async_trait]
impl AnalyticsTrigger for NullTrigger {
    async fn create_analytics_pipeline(
        &self,
        _customer: &StreamSource,
        _agent: &StreamSource,
    ) -> Result<PipelineHandle, TriggerError> {
        Err(TriggerError::Request(
            "no trigger endpoints configured — set triggers.pipeline_endpoint in callscope.toml"
                .into(),
        ))
    }

    async fn start_tone_analysis(
        &self,
        _connector_id: &str,
        _transaction_id: &str,
    ) -> Result<(), TriggerError> {
        Err(TriggerError::Request(
            "no trigger endpoints configured — set triggers.tone_endpoint in callscope.toml"
                .into(),
        ))
    }
}
