//! Document-store connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the document store.
///
/// Deserializes from partial input; missing fields take their defaults.
///
/// ```
/// use hms_persistence::config::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str(r#"{"database_name": "ward"}"#).unwrap();
/// assert_eq!(config.database_name, "ward");
/// assert_eq!(config.max_pool_size, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Database holding the entity collections.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// Minimum number of idle pooled connections.
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How long to wait for a reachable server, in milliseconds.
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    /// Application name reported to the server.
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

fn default_connection_string() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database_name() -> String {
    "hms".to_string()
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_min_pool_size() -> u32 {
    1
}

fn default_connect_timeout_ms() -> u64 {
    10000
}

fn default_server_selection_timeout_ms() -> u64 {
    5000
}

fn default_app_name() -> String {
    "hms".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            database_name: default_database_name(),
            max_pool_size: default_max_pool_size(),
            min_pool_size: default_min_pool_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
            server_selection_timeout_ms: default_server_selection_timeout_ms(),
            app_name: default_app_name(),
        }
    }
}

impl StoreConfig {
    /// Settings for the given connection string and database.
    pub fn new(connection_string: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_name: database_name.into(),
            ..Default::default()
        }
    }

    /// Sets the pool bounds.
    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_pool_size = min;
        self.max_pool_size = max;
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Connection timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Server selection timeout as a [`Duration`].
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.connection_string.trim().is_empty() {
            errors.push("connection_string must not be empty".to_string());
        }

        if self.database_name.trim().is_empty() {
            errors.push("database_name must not be empty".to_string());
        }

        if self.max_pool_size == 0 {
            errors.push("max_pool_size must be greater than 0".to_string());
        }

        if self.min_pool_size > self.max_pool_size {
            errors.push(format!(
                "min_pool_size ({}) must not exceed max_pool_size ({})",
                self.min_pool_size, self.max_pool_size
            ));
        }

        if self.connect_timeout_ms == 0 {
            errors.push("connect_timeout_ms must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.connection_string, "mongodb://localhost:27017");
        assert_eq!(config.database_name, "hms");
        assert_eq!(config.min_pool_size, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = StoreConfig::new("", "hms").with_pool_size(5, 2);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("connection_string"));
        assert!(errors[1].contains("min_pool_size"));
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = StoreConfig::default().with_connect_timeout_ms(250);
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.server_selection_timeout(), Duration::from_secs(5));
    }
}
