//! Listener configuration

use crate::error::{Error, Result};
use std::env;

/// Listener configuration for both servers.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub smtp_port: u16,
    pub pop3_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads from `.env` file if present. All variables are optional:
    /// - `MAILSINK_HOST` (default: `127.0.0.1`)
    /// - `SMTP_PORT` (default: `2525`)
    /// - `POP3_PORT` (default: `1110`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("MAILSINK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            smtp_port: parse_port("SMTP_PORT", 2525)?,
            pop3_port: parse_port("POP3_PORT", 1110)?,
        })
    }

    /// The SMTP listen address as `host:port`.
    #[must_use]
    pub fn smtp_addr(&self) -> String {
        format!("{}:{}", self.host, self.smtp_port)
    }

    /// The POP3 listen address as `host:port`.
    #[must_use]
    pub fn pop3_addr(&self) -> String {
        format!("{}:{}", self.host, self.pop3_port)
    }
}

fn parse_port(var: &str, default: u16) -> Result<u16> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {var}: {e}"))),
        Err(_) => Ok(default),
    }
}
