//! Dealdesk server launcher.
//!
//! Loads configuration from the environment, connects Postgres and runs
//! migrations, spawns the background schedulers, then serves the REST
//! API until Ctrl+C/SIGTERM.

use std::panic;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dealdesk_config::{validate_config, ServerConfig};
use dealdesk_engine::{
    scheduler, BlockExpiryJob, Engine, HoldReminderJob, PgNotificationSink,
};
use dealdesk_server::{router, AppState};

/// Startup failure exit codes.
const EXIT_CONFIG: u8 = 2;
const EXIT_DATABASE: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "dealdesk-server")]
#[command(about = "Deal-lifecycle engine REST server", long_about = None)]
struct Args {
    /// Override the bind host from the environment
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port from the environment
    #[arg(long)]
    port: Option<u16>,

    /// Maximum database connections
    #[arg(long, default_value = "10")]
    max_connections: u32,
}

fn setup_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Server panic: {}", panic_info);
        default_hook(panic_info);
    }));
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_panic_hook();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_target(false)
        .init();

    if let Err(e) = validate_config(&config) {
        error!("Configuration invalid: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    let pool = match dealdesk_store::connect(&config.database_url, args.max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Database unavailable: {e}");
            return ExitCode::from(EXIT_DATABASE);
        }
    };
    info!("Database connected, migrations applied");

    let sink = Arc::new(PgNotificationSink::new(pool.clone()));
    let engine = Engine::new(pool.clone(), sink.clone(), config.currency.clone());

    if config.scheduler.block_expiry_enabled {
        scheduler::spawn(Arc::new(BlockExpiryJob::new(pool.clone(), sink.clone())));
        info!("Block expiry scheduler started");
    }
    if config.scheduler.hold_reminder_enabled {
        scheduler::spawn(Arc::new(HoldReminderJob::new(pool.clone(), sink.clone())));
        info!("Hold reminder scheduler started");
    }

    let addr = config.bind_addr();
    let app = router(AppState::new(engine, config, pool));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {addr}: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    info!("Dealdesk server listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server failed: {e}");
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}
