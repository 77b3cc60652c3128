//! Subcommand implementations.

use anyhow::Context;
use hms_persistence::descriptor::Query;
use hms_persistence::schema::Entity;
use hms_persistence::Database;
use serde_json::Value;
use tracing::{debug, info};

/// Checks that the store answers.
pub async fn ping(db: &Database) -> anyhow::Result<()> {
    match db.health_check().await {
        Ok(()) => {
            info!(backend = %db.store().kind(), "Store is reachable");
            Ok(())
        }
        Err(e) if e.is_unavailable() => Err(e).context("store is unavailable"),
        Err(e) => Err(e.into()),
    }
}

/// Parses and runs one JSON descriptor.
pub async fn query(db: &Database, entity: &str, operation: &str, args: &str) -> anyhow::Result<Value> {
    let entity: Entity = entity.parse()?;
    let args: Value = serde_json::from_str(args).context("descriptor arguments are not valid JSON")?;
    let query = Query::parse(entity, operation, &args)?;
    debug!(entity = %entity, ?query, "Running descriptor");
    Ok(query.execute(&db.entity(entity)).await?)
}
