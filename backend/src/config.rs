//! Configuration management for the TradeFlow server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with TF__ prefix (e.g. TF__DATABASE__URL)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Log output format: "pretty" or "json"
    pub log_format: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// One-time code sign-in
    pub otp: OtpConfig,

    /// Alert text generation service
    #[serde(default)]
    pub text_generation: TextGenerationConfig,

    /// Reward points policy
    pub rewards: RewardsConfig,

    /// Operator endpoints
    #[serde(default)]
    pub admin: AdminConfig,
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

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    /// Code lifetime in seconds
    pub expiry_seconds: i64,

    /// Wrong guesses allowed before the code is burned
    pub max_attempts: i32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TextGenerationConfig {
    /// Completion endpoint; alerts fall back to local templates when unset
    pub endpoint: Option<String>,

    /// Bearer key for the endpoint
    pub api_key: Option<String>,

    /// Model name sent with each request
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RewardsConfig {
    /// Points credited to each party when an order is received
    pub points_per_completed_order: i32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Key expected in the x-admin-key header; operator routes are disabled when unset
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("TF_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("log_format", "pretty")?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 2_592_000)?
            .set_default("otp.expiry_seconds", 300)?
            .set_default("otp.max_attempts", 5)?
            .set_default("rewards.points_per_completed_order", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (TF__ prefix)
            .add_source(
                Environment::with_prefix("TF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}
