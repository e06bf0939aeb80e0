use serde::Deserialize;
use std::env;
use std::fs;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File read error")]
    FileError,

    #[error("Deserialization error:{0}")]
    DeserializationError(String),

    #[error("Missing environment variable:{0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            config: Config::new(config_file)?,
        })
    }
}

impl Config {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(config_file).map_err(|_| ConfigError::FileError)?;
        let mut config: Config = serde_json::from_str(&config_str)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        // API_BASE_URL from the environment wins over the config file
        if let Ok(base_url) = env::var("API_BASE_URL") {
            config.api.base_url = base_url;
        }
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let base_url = env::var("API_BASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("API_BASE_URL".to_string()))?;
        Ok(Self {
            api: ApiConfig { base_url },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

// Called once by the embedding shell, not by the library itself.
pub fn init_tracing(config: &Config) {
    let log_level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_deserialization() {
        let raw = r#"{
            "api": { "base_url": "https://api.example.com" },
            "log_level": "debug"
        }"#;
        let config: Config = serde_json::from_str(raw).expect("Failed to deserialize config");
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_from_env_requires_base_url() {
        env::remove_var("API_BASE_URL");
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));

        env::set_var("API_BASE_URL", "http://localhost:4000");
        let config = Config::from_env().expect("Failed to build config from env");
        assert_eq!(config.api.base_url, "http://localhost:4000");
        env::remove_var("API_BASE_URL");
    }
}
