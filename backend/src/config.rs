//! Configuration management for the farm inventory backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FARM__ prefix, e.g. `FARM__DATABASE__URL`

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::services::inventory::InventoryPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Inventory rules
    pub inventory: InventoryConfig,
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
pub struct InventoryConfig {
    /// Fraction of a legacy record's minimum stock used as its critical threshold
    pub legacy_critical_ratio: Decimal,

    /// Days ahead of expiry at which a warning is raised
    pub expiry_warning_days: i64,

    /// Location assigned to items materialized from legacy records
    pub default_location: String,
}

impl InventoryConfig {
    pub fn policy(&self) -> InventoryPolicy {
        InventoryPolicy {
            legacy_critical_ratio: self.legacy_critical_ratio,
            expiry_warning_days: self.expiry_warning_days,
            default_location: self.default_location.clone(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FARM__ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.legacy_critical_ratio", "0.5")?
            .set_default("inventory.expiry_warning_days", 30)?
            .set_default("inventory.default_location", "Almacén")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FARM__ prefix)
            .add_source(env_source())
            .build()?;

        config.try_deserialize()
    }
}

/// `FARM__SECTION__KEY` variables
fn env_source() -> Environment {
    Environment::with_prefix("FARM")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            legacy_critical_ratio: Decimal::new(5, 1),
            expiry_warning_days: shared::models::DEFAULT_EXPIRY_WARNING_DAYS,
            default_location: "Almacén".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = InventoryConfig::default().policy();
        assert_eq!(policy.legacy_critical_ratio, Decimal::new(5, 1));
        assert_eq!(policy.expiry_warning_days, 30);
        assert_eq!(policy.default_location, "Almacén");
    }

    #[test]
    fn test_env_variables_use_double_underscore_prefix() {
        let vars: config::Map<String, String> = [
            ("FARM__DATABASE__URL", "postgres://localhost/farm"),
            ("FARM__INVENTORY__EXPIRY_WARNING_DAYS", "14"),
            ("FARM_DATABASE__MAX_CONNECTIONS", "99"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = config::Config::builder()
            .add_source(env_source().source(Some(vars)))
            .build()
            .unwrap();

        assert_eq!(config.get_string("database.url").unwrap(), "postgres://localhost/farm");
        assert_eq!(config.get_int("inventory.expiry_warning_days").unwrap(), 14);
        assert!(config.get_int("database.max_connections").is_err());
    }
}
