//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use playd::auth::{AccountsClient, CredentialManager, CredentialStore, Credentials};
use playd::config::Config;
use playd::server::AppState;
use tempfile::TempDir;

pub fn fresh_credentials() -> Credentials {
    credentials_expiring_in(3600)
}

pub fn expired_credentials() -> Credentials {
    credentials_expiring_in(-10)
}

/// A credential whose expiry sits `secs_from_now` seconds away.
pub fn credentials_expiring_in(secs_from_now: i64) -> Credentials {
    Credentials {
        access_token: "cached-access-token".to_string(),
        refresh_token: "cached-refresh-token".to_string(),
        expires_at: chrono::Utc::now().timestamp() + secs_from_now,
        scopes: vec!["user-read-playback-state".to_string()],
    }
}

pub fn credential_store(dir: &TempDir) -> CredentialStore {
    CredentialStore::new(dir.path().join("credentials.json"))
}

pub fn manager_with_store(
    store: CredentialStore,
    accounts_url: &str,
    api_url: &str,
) -> Arc<CredentialManager> {
    let accounts = AccountsClient::new(accounts_url, "test-client", "test-secret");
    Arc::new(CredentialManager::new(store, accounts, api_url.to_string()))
}

pub fn test_config(accounts_url: &str, api_url: &str, cache_path: PathBuf) -> Config {
    Config {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        port: 0,
        accounts_base_url: accounts_url.to_string(),
        api_base_url: api_url.to_string(),
        cache_path,
    }
}

/// Standard token endpoint success body.
pub fn token_response_json() -> serde_json::Value {
    serde_json::json!({
        "access_token": "new-access-token",
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": "new-refresh-token",
        "scope": "user-read-playback-state user-modify-playback-state"
    })
}

/// Bind the control service on an ephemeral port and return its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let _ = playd::server::serve(listener, state).await;
    });
    format!("http://{addr}")
}
