//! Service configuration from environment variables.
//!
//! Required: `DATABASE_URL`. Optional: `NATS_URL` (event publishing),
//! `PORT` (default 8083).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub nats_url: Option<String>,
    pub port: u16,
}

impl Config {
    /// Read configuration from the process environment. Loading `.env` is
    /// the caller's job.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;
        let nats_url = std::env::var("NATS_URL").ok();
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar("PORT", raw))?,
            Err(_) => 8083,
        };
        Ok(Self {
            database_url,
            nats_url,
            port,
        })
    }
}
