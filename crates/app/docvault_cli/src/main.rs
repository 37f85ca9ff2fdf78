// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use docvault_core::store::{PgStore, SharedStore};

mod cli;
mod logging;

const MAX_CONNECTIONS: u32 = 2;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            println!("docvault_core {}", docvault_core::version());
        }
        Commands::Migrate { database_url } => {
            block_on(migrate(&database_url))?;
        }
        Commands::SeedAdmin {
            database_url,
            email,
            password,
        } => {
            block_on(seed_admin(&database_url, &email, &password))?;
        }
    }

    Ok(())
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fut)
}

async fn connect(database_url: &str) -> Result<PgStore> {
    log::debug!("connecting to database");
    let store = PgStore::connect(database_url, MAX_CONNECTIONS).await?;
    store.migrate().await?;
    Ok(store)
}

async fn migrate(database_url: &str) -> Result<()> {
    connect(database_url).await?;
    log::info!("database schema is up to date");
    Ok(())
}

async fn seed_admin(database_url: &str, email: &str, password: &str) -> Result<()> {
    let store: SharedStore = Arc::new(connect(database_url).await?);
    let (user, created) = docvault_core::auth::accounts::seed_admin(&store, email, password).await?;
    if created {
        log::info!("created admin {} ({})", user.email, user.id);
    } else {
        log::info!("{} ({}) is an admin", user.email, user.id);
    }
    Ok(())
}
