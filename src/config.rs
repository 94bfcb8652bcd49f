//! Configuration management for the MeteoWatch backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with MW_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Weather provider configuration
    pub weather: WeatherConfig,

    /// Outbound mail configuration
    pub mail: MailConfig,

    /// Background job configuration
    pub jobs: JobsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
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
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Weather API base URL
    pub api_endpoint: String,

    /// Weather API key
    pub api_key: String,

    /// Minimum spacing between per-city provider fetches, in milliseconds
    pub request_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// HTTP mail API base URL
    pub api_endpoint: String,

    /// Mail API key
    pub api_key: String,

    /// From address for outbound messages
    pub from_address: String,

    /// Address notified when a job-level failure occurs
    pub admin_address: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    /// Run the in-process daily scheduler
    pub scheduler_enabled: bool,

    /// UTC hour (0-23) at which the daily jobs run
    pub daily_hour_utc: u32,

    /// Minimum minutes between repeated firings of the same (rule, user) pair
    pub alert_cooldown_minutes: i64,

    /// Shared secret required by the manual job-trigger endpoints
    pub service_token: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("MW_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("weather.api_endpoint", "https://api.openweathermap.org")?
            .set_default("weather.request_interval_ms", 1500)?
            .set_default("mail.admin_address", None::<String>)?
            .set_default("jobs.scheduler_enabled", true)?
            .set_default("jobs.daily_hour_utc", 6)?
            .set_default("jobs.alert_cooldown_minutes", 720)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MW_ prefix)
            .add_source(
                Environment::with_prefix("MW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
