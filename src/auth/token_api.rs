//! Token endpoint client.
//!
//! Two operations exist against the accounts service: exchanging a one-time
//! authorization code for the initial credential, and trading a refresh
//! token for a new access token. Both go through `POST {base}/api/token`
//! with HTTP Basic application credentials.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use super::credentials::Credentials;
use super::AuthError;

/// Bounded timeout for token endpoint calls.
const TOKEN_TIMEOUT_SECS: u64 = 5;

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds. Some providers omit it on refresh.
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Refresh responses often omit this; the previous value is kept.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

impl TokenResponse {
    /// Fold a token response into a stored credential.
    ///
    /// A response that omits the refresh token keeps the previous one;
    /// losing it would force the interactive handshake to run again.
    pub fn into_credentials(self, previous_refresh: Option<&str>) -> Result<Credentials, AuthError> {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| {
                AuthError::BadTokenResponse("token endpoint returned no refresh token".to_string())
            })?;

        Ok(Credentials {
            access_token: self.access_token,
            refresh_token,
            expires_at: chrono::Utc::now().timestamp() + self.expires_in as i64,
            scopes: self
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }
}

/// Client for the accounts (authorization/token) service.
#[derive(Debug, Clone)]
pub struct AccountsClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    http: Client,
}

impl AccountsClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http: Client::new(),
        }
    }

    /// Exchange a one-time authorization code for the initial credential.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/api/token", self.base_url);
        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Basic {basic}"))
            .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AuthError::TokenEndpoint { status, message });
        }

        Ok(response.json().await?)
    }
}
