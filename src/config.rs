use std::env;

use thiserror::Error;

pub const ACCESS_TOKEN_VAR: &str = "MAPBOX_ACCESS_TOKEN";
pub const HOST_VAR: &str = "CYCLEMAP_HOST";
pub const PORT_VAR: &str = "CYCLEMAP_PORT";

const DEFAULT_HOST: &str = "localhost";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{ACCESS_TOKEN_VAR} is not set or blank")]
    MissingAccessToken,

    #[error("invalid {PORT_VAR}: {0}")]
    InvalidPort(String),
}

/// Startup configuration, read once from the environment. A missing access
/// token is fatal here, before any view state is constructed.
#[derive(Clone, Debug)]
pub struct Config {
    pub access_token: String,
    pub host: String,
    /// Port 0 lets the OS pick one.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token = match env::var(ACCESS_TOKEN_VAR) {
            Ok(token) if !token.trim().is_empty() => token,
            _ => return Err(ConfigError::MissingAccessToken),
        };
        let host = env::var(HOST_VAR).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var(PORT_VAR) {
            Err(_) => 0,
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
        };
        Ok(Config {
            access_token,
            host,
            port,
        })
    }
}
