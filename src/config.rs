//! Server configuration from environment variables (`.env` is loaded by the binary).

use crate::error::ConfigError;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database: DatabaseConfig,
    /// Upper bound on `max` for list requests.
    pub max_page_size: u32,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.into(),
                max_connections: 5,
            },
            max_page_size: 1000,
            body_limit: 64 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServerConfig::default();
        if let Some(url) = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            config.database.url = url.trim().to_string();
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(addr) = lookup("BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(v) = lookup("PORT") {
            let port: u16 = parse("PORT", &v)?;
            let host = config
                .bind_addr
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or(config.bind_addr.as_str());
            config.bind_addr = format!("{}:{}", host, port);
        }
        if let Some(v) = lookup("PETS_MAX_PAGE_SIZE") {
            config.max_page_size = parse("PETS_MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("REQUEST_BODY_LIMIT") {
            config.body_limit = parse("REQUEST_BODY_LIMIT", &v)?;
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
