//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Expense-to-line-item match scoring weights.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Report executor limits.
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Confidence-score weights for expense matching.
///
/// The weights are empirical; they are kept configurable rather than derived.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Bonus when amounts match exactly.
    pub exact_amount: u8,
    /// Bonus when amounts are within the near-amount tolerance.
    pub near_amount: u8,
    /// Near-amount tolerance as a percentage of the expense amount.
    pub near_amount_percent: Decimal,
    /// Minimum near-amount tolerance in currency units.
    pub near_amount_floor: Decimal,
    /// Bonus when dates fall on the same day.
    pub same_day: u8,
    /// Bonus when dates are at most 3 days apart.
    pub within_3_days: u8,
    /// Bonus when dates are at most 7 days apart.
    pub within_7_days: u8,
    /// Bonus when the payee is the same.
    pub same_payee: u8,
    /// Bonus when the candidate belongs to the expense's project.
    pub same_project: u8,
    /// How far (in days) around the expense date cross-project quotes are searched.
    pub candidate_window_days: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            exact_amount: 40,
            near_amount: 25,
            near_amount_percent: Decimal::from(5),
            near_amount_floor: Decimal::from(5),
            same_day: 30,
            within_3_days: 20,
            within_7_days: 10,
            same_payee: 20,
            same_project: 10,
            candidate_window_days: 90,
        }
    }
}

/// Report executor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Row limit applied when the caller sends none.
    pub default_limit: u64,
    /// Hard ceiling on returned rows, whatever the caller asks for.
    pub max_limit: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            default_limit: 1_000,
            max_limit: 10_000,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BUILDLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
