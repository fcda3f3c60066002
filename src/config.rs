use std::env;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::core::{ConfigVersion, EstimatorError};

/// Process-level settings. Calculator constants live in `EstimatorConfig`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub config_version: ConfigVersion,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_env_file(dotenvy::dotenv().map(|_| ()))?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("FLIP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("FLIP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8080,
        };
        let log_level = lookup("FLIP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let config_version = match lookup("FLIP_CONFIG_VERSION") {
            Some(raw) => raw
                .parse::<ConfigVersion>()
                .map_err(ConfigError::Version)?,
            None => ConfigVersion::Latest,
        };

        Ok(Self {
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            config_version,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost {
                host: self.host.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn load_env_file(result: Result<(), dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::EnvFile(err)),
        Ok(()) => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FLIP_PORT must be a valid u16, got '{0}'")]
    InvalidPort(String),
    #[error("FLIP_HOST '{host}' must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        host: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("FLIP_CONFIG_VERSION: {0}")]
    Version(#[source] EstimatorError),
    #[error(".env file could not be loaded: {0}")]
    EnvFile(#[source] dotenvy::Error),
}
