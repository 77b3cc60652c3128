//! CLI configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HMS_BACKEND` | memory | Store backend (`memory`, `mongodb`) |
//! | `HMS_DATABASE_URL` | mongodb://localhost:27017 | Connection string |
//! | `HMS_DATABASE_NAME` | hms | Database name |
//! | `HMS_LOG_LEVEL` | info | Log level |
//! | `HMS_MAX_POOL_SIZE` | 10 | Maximum pooled connections |
//! | `HMS_CONNECT_TIMEOUT_MS` | 10000 | Connection timeout (milliseconds) |

use clap::{Args, Parser, Subcommand};
use hms_persistence::{BackendKind, StoreConfig};

/// Command line of the `hms` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "hms")]
#[command(about = "Hospital management system store tool")]
#[command(version)]
pub struct Cli {
    /// Store and logging settings.
    #[command(flatten)]
    pub config: HmsConfig,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Checks that the store is reachable.
    Ping,
    /// Inserts a small demo ward.
    Seed,
    /// Runs a JSON descriptor against one entity and prints the result.
    Query {
        /// Entity name (`appointment`, `labTest`, `lab_test`, ...).
        entity: String,
        /// Operation (`findUnique`, `findMany`, `create`, `update`, ...).
        operation: String,
        /// Descriptor arguments as JSON.
        #[arg(default_value = "{}")]
        args: String,
        /// Seed the demo ward first (useful with the memory backend).
        #[arg(long)]
        seed: bool,
    },
}

/// Store and logging settings.
#[derive(Debug, Clone, Args)]
pub struct HmsConfig {
    /// Store backend (memory, mongodb).
    #[arg(long, env = "HMS_BACKEND", default_value = "memory", global = true)]
    pub backend: String,

    /// Database connection string.
    #[arg(long, env = "HMS_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Database name.
    #[arg(long, env = "HMS_DATABASE_NAME", default_value = "hms", global = true)]
    pub database_name: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "HMS_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Maximum pooled connections.
    #[arg(long, env = "HMS_MAX_POOL_SIZE", default_value = "10", global = true)]
    pub max_pool_size: u32,

    /// Connection timeout in milliseconds.
    #[arg(long, env = "HMS_CONNECT_TIMEOUT_MS", default_value = "10000", global = true)]
    pub connect_timeout_ms: u64,
}

impl Default for HmsConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database_url: None,
            database_name: "hms".to_string(),
            log_level: "info".to_string(),
            max_pool_size: 10,
            connect_timeout_ms: 10_000,
        }
    }
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl HmsConfig {
    /// The selected backend.
    pub fn backend_kind(&self) -> Result<BackendKind, String> {
        self.backend.parse()
    }

    /// Store settings derived from the flags.
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig {
            database_name: self.database_name.clone(),
            max_pool_size: self.max_pool_size,
            connect_timeout_ms: self.connect_timeout_ms,
            ..StoreConfig::default()
        };
        if let Some(url) = &self.database_url {
            config.connection_string = url.clone();
        }
        config.min_pool_size = config.min_pool_size.min(config.max_pool_size);
        config
    }

    /// Validates the configuration and returns every error found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.backend_kind() {
            errors.push(e);
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if let Err(store_errors) = self.store_config().validate() {
            errors.extend(store_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
