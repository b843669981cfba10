//! Authentication for the remote playback account.
//!
//! This module owns the whole credential lifecycle:
//! - [`credentials`]: the persisted token pair and its on-disk cache
//! - [`token_api`]: the token endpoint client (code exchange and refresh)
//! - [`manager`]: the in-process manager that hands out authenticated
//!   client handles and keeps the token fresh in the background
//!
//! The interactive consent step itself happens in a browser; the control
//! service only serves the authorization link (`/auth`) and completes the
//! exchange when the provider redirects back (`/callback`).

pub mod credentials;
pub mod manager;
pub mod token_api;

pub use credentials::{CredentialStore, Credentials, EXPIRY_GRACE_SECS};
pub use manager::CredentialManager;
pub use token_api::{AccountsClient, TokenResponse};

use thiserror::Error;

/// Scopes requested during the one-time interactive handshake.
pub const SCOPES: &[&str] = &[
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
];

#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential is available; the interactive handshake has not run yet
    /// (or the cache was deleted).
    #[error("not authenticated: no valid credential is available")]
    NotAuthenticated,

    /// The token endpoint rejected the request.
    #[error("token endpoint error ({status}): {message}")]
    TokenEndpoint { status: u16, message: String },

    /// A token response was unusable (e.g. first exchange without a
    /// refresh token).
    #[error("unusable token response: {0}")]
    BadTokenResponse(String),

    /// The credential cache could not be read or written.
    #[error("credential cache error: {0}")]
    Cache(String),

    /// Transport-level failure talking to the token endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    /// True when the error can only be resolved by re-running the
    /// interactive authorization handshake.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::TokenEndpoint { status: 400..=401, .. }
        )
    }
}

/// Build the interactive authorization URL for the configured application.
pub fn authorize_url(accounts_base_url: &str, client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}",
        accounts_base_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&SCOPES.join(" ")),
    )
}
