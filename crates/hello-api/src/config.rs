use std::net::{Ipv4Addr, SocketAddr};

/// Port the Lambda Web Adapter forwards to unless told otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Listener settings, read from the environment.
///
/// `AWS_LWA_PORT` takes precedence over `PORT` so the server always
/// listens where the Lambda Web Adapter is sending requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServerConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn load() -> Result<Self, ConfigError> {
        let dotenv_loaded = dotenvy::dotenv().is_ok();
        tracing::debug!(dotenv = dotenv_loaded, "loading ServerConfig");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `get`, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for var in ["AWS_LWA_PORT", "PORT"] {
            let Some(value) = get(var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let port = value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { var, value })?;
            return Ok(Self { port });
        }
        Ok(Self::default())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value} is not a valid port")]
    InvalidPort { var: &'static str, value: String },
}
