use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_DIR: &str = "config";

/// Application configuration, loaded from defaults, optional files under
/// `config/`, and `APP__`-prefixed environment variables (later sources win).
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Secret used to sign bearer tokens
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub jwt_expiration: u64,

    /// Server bind host
    pub host: String,

    /// Server bind port
    pub port: u16,

    /// Deployment environment name
    pub environment: String,

    /// Log level directive when RUST_LOG is unset
    pub log_level: String,

    /// Run migrations on startup
    pub auto_migrate: bool,

    /// Database pool sizing
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_connect_timeout_secs: u64,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Loads configuration for the environment selected by `RUN_ENV`/`APP_ENV`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; using built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://sweetshop.db?mode=rwc")?
        .set_default("jwt_secret", "dev_only_sweetshop_signing_secret")?
        .set_default("jwt_expiration", 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("auto_migrate", true)?
        .set_default("db_max_connections", 10)?
        .set_default("db_min_connections", 1)?
        .set_default("db_connect_timeout_secs", 30)?
        .set_default("db_acquire_timeout_secs", 8)?
        .set_default("db_idle_timeout_secs", 600)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    config.try_deserialize()
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured
/// level directive.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let default_directive = format!("sweetshop_api={},tower_http=info", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_files_or_env() {
        let cfg = load_config().expect("defaults should satisfy the schema");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.auto_migrate);
        assert_eq!(cfg.environment, "development");
        assert!(!cfg.is_production());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
    }
}
