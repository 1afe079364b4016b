use clap::Parser;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uptime_backend::db::schema::ensure_schema;
use uptime_backend::db::services::SeaOrmCheckStore;
use uptime_backend::monitor::{CheckRunner, MonitorScheduler, NetworkProber};
use uptime_backend::server::config::ServerConfig;
use uptime_backend::web::create_axum_router;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging depends on the configured log directory, so config errors go to stderr.
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting uptime server.");

    // --- Database Pool Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);

    let db_pool: DatabaseConnection = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Failed to create database connection.");
        e
    })?;
    ensure_schema(&db_pool).await?;
    info!("Database schema ready.");

    // --- Check Runner Setup ---
    let prober = NetworkProber::new(Duration::from_secs(server_config.probe_timeout_seconds))?;
    let store = SeaOrmCheckStore::new(db_pool.clone());
    let runner = Arc::new(CheckRunner::new(
        Arc::new(store),
        Arc::new(prober),
        server_config.max_concurrent_checks,
    ));

    // --- Scheduler ---
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let scheduler_handle = if server_config.scheduler_enabled {
        let scheduler = MonitorScheduler::new(
            runner.clone(),
            Duration::from_secs(server_config.scheduler_tick_seconds),
        );
        info!(tick_seconds = server_config.scheduler_tick_seconds, "Starting check scheduler.");
        Some(tokio::spawn(scheduler.run(shutdown_rx)))
    } else {
        info!("Check scheduler disabled. Checks run only via the cron endpoint.");
        None
    };

    // --- HTTP Server ---
    let app = create_axum_router(db_pool, runner, server_config.clone());
    let addr: SocketAddr = server_config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped. Shutting down scheduler.");
    let _ = shutdown_tx.send(());
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Scheduler task ended abnormally.");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
    }
}
