//! Tournament floor server.
//!
//! Serves the REST and WebSocket API and drives every running tournament's
//! blind clock from a background scheduler.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use log::info;
use pf_server::{
    api::{self, AppState},
    config::{Overrides, ServerConfig, StorageBackend},
    logging,
    metrics::{self, MeteredNotifier},
};
use pico_args::Arguments;
use poker_floor::{
    TournamentManager,
    db::{
        Database, InMemoryTournamentRepository, PgTournamentRepository, TournamentRepository,
    },
    notify::NotificationHub,
    scheduler::ClockScheduler,
};

const HELP: &str = "\
Run the live tournament floor server

USAGE:
  pf_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --storage    BACKEND     memory | postgres           [default: env STORAGE_BACKEND or memory]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --tick-secs  N           Clock scheduler period      [default: env CLOCK_TICK_SECS or 5]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          memory | postgres
  DATABASE_URL             PostgreSQL connection string
  CLOCK_TICK_SECS          Clock scheduler period in seconds
  METRICS_BIND             Prometheus exporter address, disabled when unset
  WATCHER_BUFFER           Events buffered per websocket watcher
  RUST_LOG                 Log filter (default: info,sqlx=warn,hyper=warn)
";

fn parse_args() -> Result<Overrides, Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_fn("--storage", str::parse::<StorageBackend>)?,
        tick_secs: pargs.opt_value_from_str("--tick-secs")?,
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", rest);
    }
    Ok(overrides)
}

async fn open_repository(config: &ServerConfig) -> Result<Arc<dyn TournamentRepository>, Error> {
    match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage, tournaments are lost on restart");
            Ok(Arc::new(InMemoryTournamentRepository::new()))
        }
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to apply schema")?;
            let stored = db
                .tournament_count()
                .await
                .context("Failed to read tournaments")?;
            info!("Database connected, {} tournament(s) stored", stored);
            Ok(Arc::new(PgTournamentRepository::new(db.pool().clone())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let overrides = parse_args()?;
    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    info!(
        "Starting tournament floor at {} ({:?} storage, clock every {}s)",
        config.bind, config.storage, config.tick_secs
    );

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let repo = open_repository(&config).await?;
    let hub = NotificationHub::new(config.watcher_buffer);
    let manager = TournamentManager::new(repo, Arc::new(MeteredNotifier::new(hub.clone())));

    let scheduler = ClockScheduler::spawn(manager.clone(), config.tick_period());
    let mut reports = scheduler.reports();
    tokio::spawn(async move {
        while reports.changed().await.is_ok() {
            let report = *reports.borrow_and_update();
            metrics::clock_pass(&report);
            if report.advanced + report.finished + report.failed > 0 {
                logging::log_clock_pass(
                    report.ticked,
                    report.advanced,
                    report.finished,
                    report.failed,
                );
            }
        }
    });

    let app = api::create_router(AppState::new(manager, hub));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    scheduler.shutdown().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
