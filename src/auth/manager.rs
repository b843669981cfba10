//! In-process credential manager.
//!
//! The manager owns the single authenticated [`RemoteClient`] handle.
//! Request handlers borrow it per call through [`CredentialManager::acquire_client`]
//! and must not cache it, since the manager swaps the handle whenever the
//! underlying credential changes.
//!
//! Refreshing is single-flight: one `tokio::sync::Mutex` gates the token
//! exchange, and a caller that wins the gate re-checks freshness first, so
//! concurrent triggers collapse into at most one network call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::remote::RemoteClient;

use super::credentials::{CredentialStore, Credentials};
use super::token_api::AccountsClient;
use super::AuthError;

/// How often the background loop checks the credential.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct ManagerState {
    credentials: Option<Credentials>,
    handle: Option<Arc<RemoteClient>>,
}

/// Owner of the credential and the authenticated client handle.
pub struct CredentialManager {
    store: CredentialStore,
    accounts: AccountsClient,
    api_base_url: String,
    refresh_interval: Duration,
    state: RwLock<ManagerState>,
    refresh_gate: Mutex<()>,
}

impl CredentialManager {
    pub fn new(store: CredentialStore, accounts: AccountsClient, api_base_url: String) -> Self {
        Self {
            store,
            accounts,
            api_base_url,
            refresh_interval: REFRESH_INTERVAL,
            state: RwLock::new(ManagerState::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Override the background loop cadence. Production keeps the default;
    /// tests shrink it.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Load the cached credential at startup.
    ///
    /// Returns `Ok(true)` when a fresh credential was installed. `Ok(false)`
    /// means the service starts without a usable handle: either no cache
    /// exists (the interactive handshake has not run) or the cached token is
    /// stale and the first refresh will bring it back.
    pub async fn bootstrap(&self) -> Result<bool, AuthError> {
        let Some(credentials) = self.store.load()? else {
            return Ok(false);
        };

        let fresh = !credentials.is_expired();
        {
            let mut state = self.state.write().await;
            state.credentials = Some(credentials.clone());
        }
        if fresh {
            self.install(credentials).await;
        }
        Ok(fresh)
    }

    /// Hand out the current authenticated handle, refreshing first if the
    /// credential is missing, expired, or inside the grace window.
    ///
    /// Callers borrow the handle for one request only.
    pub async fn acquire_client(&self) -> Result<Arc<RemoteClient>, AuthError> {
        {
            let state = self.state.read().await;
            if let (Some(credentials), Some(handle)) = (&state.credentials, &state.handle) {
                if !credentials.is_expired() {
                    return Ok(Arc::clone(handle));
                }
            }
        }

        self.refresh_if_needed().await?;

        let state = self.state.read().await;
        state.handle.clone().ok_or(AuthError::NotAuthenticated)
    }

    /// The installed handle, if any, without triggering a refresh.
    ///
    /// Used by the health probe, which wants to distinguish "serviceable as
    /// is" from "recovered after reinitialization".
    pub async fn installed_client(&self) -> Option<Arc<RemoteClient>> {
        self.state.read().await.handle.clone()
    }

    /// Refresh the credential if it is expired or inside the grace window.
    ///
    /// Safe to call concurrently from the background loop and any number of
    /// request handlers: a refresh that observes an already-fresh credential
    /// is a successful no-op.
    pub async fn refresh_if_needed(&self) -> Result<(), AuthError> {
        let _gate = self.refresh_gate.lock().await;

        // Re-check under the gate; a concurrent caller may have just
        // finished the refresh we queued up behind.
        let current = {
            let state = self.state.read().await;
            if state.handle.is_some() {
                if let Some(credentials) = &state.credentials {
                    if !credentials.is_expired() {
                        return Ok(());
                    }
                }
            }
            state.credentials.clone()
        };

        let Some(credentials) = current else {
            return Err(AuthError::NotAuthenticated);
        };

        if credentials.is_expired() {
            let response = self.accounts.refresh(&credentials.refresh_token).await?;
            let next = response.into_credentials(Some(&credentials.refresh_token))?;
            self.store.save(&next)?;
            self.install(next).await;
            tracing::info!("access token refreshed");
        } else {
            // Fresh credential on disk but no handle yet (stale-free
            // bootstrap path after a cache write by /callback).
            self.install(credentials).await;
        }
        Ok(())
    }

    /// Drop the installed handle and rebuild it from the persisted
    /// credential, refreshing if necessary.
    pub async fn reinitialize(&self) -> Result<(), AuthError> {
        {
            let mut state = self.state.write().await;
            state.credentials = self.store.load()?;
            state.handle = None;
        }
        self.refresh_if_needed().await
    }

    /// Complete the one-time interactive handshake.
    ///
    /// This is the only place a credential is minted from an authorization
    /// code rather than refreshed from an existing refresh token.
    pub async fn complete_authorization(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(), AuthError> {
        let response = self.accounts.exchange_code(code, redirect_uri).await?;
        let next = response.into_credentials(None)?;
        self.store.save(&next)?;
        self.install(next).await;
        tracing::info!("authorization exchange completed");
        Ok(())
    }

    /// Background refresh loop; runs for the lifetime of the process.
    ///
    /// Failures are logged and retried on the next tick. A transient
    /// network error must never kill the loop.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.refresh_if_needed().await {
                Ok(()) => {}
                Err(AuthError::NotAuthenticated) => {
                    tracing::debug!("no credential yet; waiting for authorization");
                }
                Err(error) => {
                    tracing::warn!("credential refresh failed: {error}");
                }
            }
        }
    }

    async fn install(&self, credentials: Credentials) {
        let handle = Arc::new(RemoteClient::new(
            self.api_base_url.clone(),
            credentials.access_token.clone(),
        ));
        let mut state = self.state.write().await;
        state.credentials = Some(credentials);
        state.handle = Some(handle);
    }
}
