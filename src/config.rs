//! Process configuration, read once at startup.
//!
//! The two application secrets come from the environment; everything else
//! has a fixed default that can be overridden for local testing.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::auth::credentials::CredentialStore;

/// Default port the control service binds to.
pub const DEFAULT_PORT: u16 = 8888;

/// Default base URL for the authorization/token service.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Default base URL for the playback API.
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

/// Startup configuration for the control service.
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth application client identifier (`PLAYD_CLIENT_ID`).
    pub client_id: String,
    /// OAuth application client secret (`PLAYD_CLIENT_SECRET`).
    pub client_secret: String,
    /// Port to serve on (`PLAYD_PORT`, default 8888).
    pub port: u16,
    /// Base URL of the authorization/token service (`PLAYD_ACCOUNTS_URL`).
    pub accounts_base_url: String,
    /// Base URL of the playback API (`PLAYD_API_URL`).
    pub api_base_url: String,
    /// Location of the credential cache file.
    pub cache_path: PathBuf,
}

impl Config {
    /// Read the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = require("PLAYD_CLIENT_ID")?;
        let client_secret = require("PLAYD_CLIENT_SECRET")?;

        let port = match std::env::var("PLAYD_PORT") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
                var: "PLAYD_PORT",
                message: format!("expected a port number, got {value:?}"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let accounts_base_url = std::env::var("PLAYD_ACCOUNTS_URL")
            .unwrap_or_else(|_| DEFAULT_ACCOUNTS_URL.to_string());
        let api_base_url =
            std::env::var("PLAYD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self {
            client_id,
            client_secret,
            port,
            accounts_base_url,
            api_base_url,
            cache_path: CredentialStore::default_path(),
        })
    }

    /// Address the control service binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }

    /// Redirect URI registered for the one-time interactive handshake.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.port)
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(var)),
    }
}
