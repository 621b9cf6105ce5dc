//! Configuration loading and management

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use wayfarer_api::Environment;
use wayfarer_auth::ResponseStyle;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_environment")]
    pub environment: Environment,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL, used when building links sent out-of-band
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session-token signing secret; rotate by restarting with a new value
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    #[serde(default = "default_reset_ttl_minutes")]
    pub reset_ttl_minutes: i64,
    /// Argon2 memory cost in KiB
    #[serde(default = "default_hash_memory_kib")]
    pub hash_memory_kib: u32,
    /// Argon2 iteration count
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
    /// How the gate answers unauthenticated requests: "api" or "browser"
    #[serde(default = "default_response_style")]
    pub response_style: ResponseStyle,
    /// Login surface browser clients are redirected to
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// First-run administrator account
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_days: default_token_ttl_days(),
            reset_ttl_minutes: default_reset_ttl_minutes(),
            hash_memory_kib: default_hash_memory_kib(),
            hash_iterations: default_hash_iterations(),
            response_style: default_response_style(),
            login_path: default_login_path(),
            admin_email: None,
            admin_password: None,
        }
    }
}

/// Outbound mail configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Bound on how long a response waits for the mail transport
    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_mail_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_public_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_db_path() -> String {
    "./data/wayfarer.db".to_string()
}

fn default_token_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_token_ttl_days() -> i64 {
    90
}

fn default_reset_ttl_minutes() -> i64 {
    10
}

fn default_hash_memory_kib() -> u32 {
    19456
}

fn default_hash_iterations() -> u32 {
    2
}

fn default_response_style() -> ResponseStyle {
    ResponseStyle::Api
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_mail_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> Environment {
    Environment::Development
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
            environment: default_environment(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_ttl_days, 90);
        assert_eq!(config.auth.reset_ttl_minutes, 10);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            environment = "production"

            [server]
            port = 8080

            [auth]
            token_secret = "s3cret"
            response_style = "browser"
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_url, "http://localhost:5000");
        assert_eq!(config.auth.token_secret, "s3cret");
        assert_eq!(config.auth.response_style, ResponseStyle::Browser);
        assert_eq!(config.auth.token_ttl_days, 90);
    }
}
