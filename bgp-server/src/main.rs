//! BarcodeGen Pro Server
//!
//! Token purchases over mobile money, reconciled against the Optimus
//! aggregator, plus the label catalog behind the barcode generator.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use bgp_core::config::ConfigStore;
use bgp_core::events::{
    EventSenders, purchase_queued_channel, purchase_status_channel, sync_request_channel,
};
use bgp_core::framework::DatabaseProcessor;
use bgp_core::processors::{OutboxForwarder, ReconcileRunner, Reconciler};
use bgp_core::provider::{OptimusClient, PaymentProvider};
use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// BarcodeGen Pro - token purchases and label layout service
#[derive(Parser, Debug)]
#[command(name = "bgp-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./bgp-config.toml", env = "BGP_CONFIG")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false", env = "BGP_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_json);

    tracing::info!("Starting bgp-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let reconcile_config = loaded_config.reconcile.clone();
    let outbox_config = loaded_config.outbox.clone();
    let request_timeout = loaded_config.provider.request_timeout;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let shared_config = loaded_config.into_shared();

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let connect_options = SqliteConnectOptions::from_str(&database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let db_pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let db = DatabaseProcessor {
        pool: db_pool.clone(),
    };

    // Event channels
    let (queued_tx, queued_rx) = purchase_queued_channel();
    let (sync_tx, sync_rx) = sync_request_channel();
    let (status_tx, _status_rx) = purchase_status_channel();
    let events = EventSenders::new(queued_tx, sync_tx, status_tx);

    // Provider client; the endpoint is filled in from stored settings below.
    let endpoint_store = ConfigStore::new(None);
    let http = reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("bgp-server/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let provider: Arc<dyn PaymentProvider> =
        Arc::new(OptimusClient::new(http, endpoint_store.clone()));

    let state = AppState::new(
        db.clone(),
        shared_config,
        events,
        endpoint_store,
        provider.clone(),
    );
    state.refresh_provider_endpoint().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Background tasks
    let reconciler = Reconciler::new(db.clone(), provider.clone(), state.settler.clone());
    let reconcile_handle = tokio::spawn(
        ReconcileRunner::new(
            reconciler,
            reconcile_config.interval,
            reconcile_config.fetch_limit,
            sync_rx,
            shutdown_rx.clone(),
        )
        .run(),
    );
    let outbox_handle = tokio::spawn(
        OutboxForwarder::new(db, provider, outbox_config, queued_rx, shutdown_rx.clone()).run(),
    );
    let reload_handle =
        spawn_config_reload_handler(state.clone(), config_loader, shutdown_rx.clone());

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background tasks; the runner finishes its current cycle first.
    let _ = shutdown_tx.send(true);
    for (name, handle) in [
        ("ReconcileRunner", reconcile_handle),
        ("OutboxForwarder", outbox_handle),
        ("ConfigReload", reload_handle),
    ] {
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "Background task panicked");
        }
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
