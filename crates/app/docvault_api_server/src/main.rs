//! Docvault API server binary.
//!
//! Serves the HTTP API over PostgreSQL and S3-compatible storage, or over
//! in-process backends with `--in-memory`.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use docvault_api::config::ApiConfig;
use docvault_core::storage::{MemoryStorage, S3Storage, SharedStorage};
use docvault_core::store::{MemoryStore, PgStore, SharedStore};
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "docvault_api_server", about = "Docvault API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/docvault"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all data in process memory (no PostgreSQL, no object storage).
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,docvault_api=debug,docvault_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.bind_addr = args.bind_addr;
    config.database_url = args.database_url;

    let (store, storage): (SharedStore, SharedStorage) = if args.in_memory {
        warn!("in-memory mode: all data is lost on exit");
        (Arc::new(MemoryStore::new()), Arc::new(MemoryStorage::new()))
    } else {
        info!(max_connections = args.max_connections, "connecting to database");
        let pg = PgStore::connect(&config.database_url, args.max_connections).await?;
        info!("running database migrations");
        pg.migrate().await?;
        info!(
            endpoint = %config.storage.endpoint,
            bucket = %config.storage.bucket,
            "using S3-compatible storage"
        );
        let s3 = S3Storage::new(config.storage.clone())?;
        (Arc::new(pg), Arc::new(s3))
    };

    let purged = store.purge_expired_sessions(Utc::now()).await?;
    if purged > 0 {
        info!(purged, "removed expired sessions");
    }

    let bind_addr = config.bind_addr.clone();
    let state = docvault_api::AppState {
        store,
        storage,
        config: Arc::new(config),
    };
    let app = docvault_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
