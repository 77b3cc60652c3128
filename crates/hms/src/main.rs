//! Hospital Management System (HMS) store tool.
//!
//! Checks connectivity, seeds demo data and runs JSON query descriptors
//! against the configured document store.

mod commands;
mod config;
mod seed;

use std::sync::Arc;

use clap::Parser;
use hms_events::{EventBus, Notifier};
use hms_persistence::backends::memory::MemoryStore;
use hms_persistence::{BackendKind, Database, DocumentStore, StoreConfig};
use tracing::info;

use crate::config::{Cli, Command};

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "hms={level},hms_persistence={level},hms_events={level}",
            level = level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    if let Err(errors) = cli.config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let backend = cli
        .config
        .backend_kind()
        .map_err(|e| anyhow::anyhow!("Invalid backend configuration: {}", e))?;
    info!(backend = %backend, database = %cli.config.database_name, "Starting hms");

    let store = match backend {
        BackendKind::MongoDB => create_mongodb_store(cli.config.store_config())?,
        _ => Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>,
    };
    let db = Database::new(store);
    let notifier = Notifier::new(db.clone(), EventBus::new());

    match cli.command {
        Command::Ping => commands::ping(&db).await?,
        Command::Seed => {
            db.initialize().await?;
            let report = seed::seed(&db, &notifier).await?;
            println!(
                "Seeded {} users and {} documents",
                report.users, report.documents
            );
        }
        Command::Query {
            entity,
            operation,
            args,
            seed,
        } => {
            db.initialize().await?;
            if seed {
                seed::seed(&db, &notifier).await?;
            }
            let result = commands::query(&db, &entity, &operation, &args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Creates the MongoDB store. The connection is established on first use.
#[cfg(feature = "mongodb")]
fn create_mongodb_store(config: StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    use hms_persistence::backends::mongodb::MongoStore;

    info!(database = %config.database_name, "Initializing MongoDB backend");
    Ok(Arc::new(MongoStore::new(config)))
}

/// Fallback when the mongodb feature is not enabled.
#[cfg(not(feature = "mongodb"))]
fn create_mongodb_store(_config: StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    anyhow::bail!(
        "The mongodb backend requires the 'mongodb' feature. \
         Build with: cargo build -p hms --features mongodb"
    )
}
