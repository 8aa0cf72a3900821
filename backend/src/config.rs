//! Configuration management for the Food Cost Management engine
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FCM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Outbound alert gateway configuration
    pub alerting: AlertingConfig,

    /// Catalog name-cleaning patterns
    pub catalog: CatalogConfig,

    /// Job-runner tuning
    pub jobs: JobsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertingConfig {
    /// SMS gateway endpoint; alerts are disabled when unset
    pub gateway_url: Option<String>,

    /// Bearer token for the gateway
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Pattern stripped from raw supplier names before matching
    pub supplier_name_pattern: String,

    /// Pattern stripped from raw product names before matching
    pub product_name_pattern: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    /// Page size for bounded history scans
    pub history_page_size: usize,

    /// Maximum number of import jobs drained per runner pass
    pub batch_size: usize,
}

/// Legal-form suffixes, bracketed notes and long digit runs (SIRET and the
/// like) carry no identity and are stripped before supplier matching.
pub const DEFAULT_SUPPLIER_NAME_PATTERN: &str =
    r"(?i)\b(sas|sarl|sa|eurl|sci|snc)\b\.?|\(.*?\)|\d{5,}";

/// Reference codes and bracketed notes stripped before product matching.
pub const DEFAULT_PRODUCT_NAME_PATTERN: &str = r"(?i)\(.*?\)|\b(ref|art|lot)\.?\s*:?\s*\w+|\d{6,}";

impl Settings {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FCM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("alerting.timeout_seconds", 10)?
            .set_default(
                "catalog.supplier_name_pattern",
                DEFAULT_SUPPLIER_NAME_PATTERN,
            )?
            .set_default("catalog.product_name_pattern", DEFAULT_PRODUCT_NAME_PATTERN)?
            .set_default("jobs.history_page_size", 500)?
            .set_default("jobs.batch_size", 50)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FCM_ prefix)
            .add_source(
                Environment::with_prefix("FCM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            supplier_name_pattern: DEFAULT_SUPPLIER_NAME_PATTERN.to_string(),
            product_name_pattern: DEFAULT_PRODUCT_NAME_PATTERN.to_string(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            history_page_size: 500,
            batch_size: 50,
        }
    }
}
