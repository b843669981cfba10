//! playd: local HTTP control of a remote playback account.
//!
//! Startup order matters: load config, try the credential cache, start the
//! background refresh loop, then serve. A missing or stale credential is
//! not fatal; the service starts unauthenticated and `/auth` + `/callback`
//! complete the one-time handshake.

use std::sync::Arc;

use playd::auth::{AccountsClient, CredentialManager, CredentialStore};
use playd::config::Config;
use playd::server::{self, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let store = CredentialStore::new(config.cache_path.clone());
    let accounts = AccountsClient::new(
        config.accounts_base_url.clone(),
        config.client_id.clone(),
        config.client_secret.clone(),
    );
    let manager = Arc::new(CredentialManager::new(
        store,
        accounts,
        config.api_base_url.clone(),
    ));

    match manager.bootstrap().await {
        Ok(true) => tracing::info!("credential cache loaded; client ready"),
        Ok(false) => {
            tracing::warn!("no fresh cached credential; will refresh or wait for /auth")
        }
        Err(error) => {
            tracing::warn!("credential bootstrap failed: {error}; visit /auth to re-authorize")
        }
    }

    tokio::spawn(Arc::clone(&manager).run_refresh_loop());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let state = AppState {
        manager,
        config: Arc::new(config),
    };
    server::serve(listener, state).await?;
    Ok(())
}
