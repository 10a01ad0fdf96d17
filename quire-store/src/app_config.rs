use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Platform share of each captured total, e.g. 0.10.
    pub platform_fee_rate: f64,
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Seller commit-or-decline window, hours from capture.
    #[serde(default = "default_commit_window_hours")]
    pub commit_window_hours: i64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_sweep_batch_limit")]
    pub sweep_batch_limit: i64,
    /// Per-courier quote timeout for the aggregator fan-out.
    #[serde(default = "default_courier_timeout_ms")]
    pub courier_timeout_ms: u64,
}

fn default_commit_window_hours() -> i64 {
    48
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_sweep_batch_limit() -> i64 {
    100
}

fn default_courier_timeout_ms() -> u64 {
    5000
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // QUIRE__SERVER__PORT=9000 etc.
            .add_source(config::Environment::with_prefix("QUIRE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
