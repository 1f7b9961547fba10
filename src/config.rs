use std::collections::HashMap;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// Default users endpoint of the mock API
pub const DEFAULT_USERS_ENDPOINT: &str =
    "https://619ca0ea68ebaa001753c9b0.mockapi.io/evaluation/dataengineer/jr/v1/users";
/// Default messages endpoint of the mock API
pub const DEFAULT_MESSAGES_ENDPOINT: &str =
    "https://619ca0ea68ebaa001753c9b0.mockapi.io/evaluation/dataengineer/jr/v1/messages";

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Warehouse database connection settings
    pub database: DatabaseConfig,
    /// Mock API endpoint settings
    pub api: ApiConfig,
    /// Restricted analyst account provisioned during schema init
    pub analyst: AnalystConfig,
    /// Monitoring view settings
    pub views: ViewsConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Warehouse database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database server host
    pub host: String,
    /// Database server port
    pub port: u16,
    /// Connecting identity; schema init and mask-ID operations require the
    /// privileged identity
    pub username: String,
    /// Password for the connecting identity
    pub password: String,
    /// Warehouse database name
    pub database: String,
    /// Connection attempts before a regular connect gives up
    pub max_retries: u32,
    /// Fixed sleep between connection attempts, in seconds
    pub retry_delay_secs: u64,
    /// Connection attempts for the startup availability probe; larger than
    /// `max_retries` because the server may still be starting up
    pub availability_max_retries: u32,
}

/// Mock API endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Users collection endpoint
    pub users_endpoint: String,
    /// Messages collection endpoint
    pub messages_endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
}

/// Restricted analyst account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    /// Account name granted access to the non-sensitive tables only
    pub username: String,
    /// Password assigned to the account at creation
    pub password: String,
}

/// Monitoring view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Directory holding one `.sql` view definition per file
    pub query_dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format, "text" or "json"
    pub format: String,
    /// Optional log file path; console-only when absent
    pub file_path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: "spark_dwh".to_string(),
            max_retries: 10,
            retry_delay_secs: 3,
            availability_max_retries: 20,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            users_endpoint: DEFAULT_USERS_ENDPOINT.to_string(),
            messages_endpoint: DEFAULT_MESSAGES_ENDPOINT.to_string(),
            timeout_secs: 30,
            headers: HashMap::new(),
        }
    }
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            username: "analyst".to_string(),
            password: "password".to_string(),
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            query_dir: "sql/monitoring".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            api: ApiConfig::default(),
            analyst: AnalystConfig::default(),
            views: ViewsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence: built-in
    /// defaults, then `config/default.*` and `config.*` files, then
    /// `SPARK_ETL`-prefixed environment variables (`SPARK_ETL__DATABASE__HOST`
    /// and friends).
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("SPARK_ETL").separator("__"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.host.trim().is_empty() {
            return Err(EtlError::InvalidConfig(
                "database.host must not be empty".to_string(),
            ));
        }
        if self.database.port == 0 {
            return Err(EtlError::InvalidConfig(
                "database.port must be greater than 0".to_string(),
            ));
        }
        if self.database.max_retries == 0 {
            return Err(EtlError::InvalidConfig(
                "database.max_retries must be greater than 0".to_string(),
            ));
        }
        if self.database.retry_delay_secs == 0 {
            return Err(EtlError::InvalidConfig(
                "database.retry_delay_secs must be greater than 0".to_string(),
            ));
        }

        for endpoint in [&self.api.users_endpoint, &self.api.messages_endpoint] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(EtlError::InvalidConfig(format!(
                    "API endpoint must be an http(s) URL: {endpoint}"
                )));
            }
        }
        if self.api.timeout_secs == 0 {
            return Err(EtlError::InvalidConfig(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.analyst.username.trim().is_empty() {
            return Err(EtlError::InvalidConfig(
                "analyst.username must not be empty".to_string(),
            ));
        }
        if self.analyst.username == self.database.username {
            return Err(EtlError::InvalidConfig(
                "analyst.username must differ from the privileged database username".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(EtlError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(EtlError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.database, "spark_dwh");
        assert_eq!(config.api.users_endpoint, DEFAULT_USERS_ENDPOINT);
        assert_eq!(config.views.query_dir, "sql/monitoring");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_retry_budget() {
        let mut config = AppConfig::default();
        config.database.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = AppConfig::default();
        config.api.users_endpoint = "ftp://example.com/users".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analyst_must_not_be_privileged_identity() {
        let mut config = AppConfig::default();
        config.analyst.username = config.database.username.clone();
        assert!(config.validate().is_err());
    }
}
