//! Authenticated client for the remote playback API.
//!
//! Each [`RemoteClient`] wraps one access token; the credential manager
//! replaces the whole client when the token changes. Every call carries a
//! bounded timeout so a hung remote dependency cannot wedge the request
//! pool.

pub mod models;

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use thiserror::Error;

use models::{Device, DevicesResponse, PlaybackState, SearchResponse, Track};

/// Bounded timeout for playback API calls.
const REMOTE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The playback API rejected or failed the forwarded call.
    #[error("remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connect, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One authenticated session against the playback API.
#[derive(Debug)]
pub struct RemoteClient {
    api_base_url: String,
    access_token: String,
    http: Client,
}

impl RemoteClient {
    pub fn new(api_base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            access_token: access_token.into(),
            http: Client::new(),
        }
    }

    /// List the playback devices attached to the account.
    ///
    /// The cheapest end-to-end check of the session; the health endpoint
    /// leans on it.
    pub async fn devices(&self) -> Result<Vec<Device>, RemoteError> {
        let response = self
            .request(Method::GET, "/me/player/devices")
            .send()
            .await?;
        let response = expect_success(response).await?;
        let data: DevicesResponse = response.json().await?;
        Ok(data.devices)
    }

    /// Start playback of a single track on the active device.
    pub async fn start_playback(&self, track_uri: &str) -> Result<(), RemoteError> {
        let body = serde_json::json!({ "uris": [track_uri] });
        let response = self
            .request(Method::PUT, "/me/player/play")
            .json(&body)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    pub async fn pause_playback(&self) -> Result<(), RemoteError> {
        let response = self.request(Method::PUT, "/me/player/pause").send().await?;
        expect_success(response).await?;
        Ok(())
    }

    pub async fn next_track(&self) -> Result<(), RemoteError> {
        let response = self.request(Method::POST, "/me/player/next").send().await?;
        expect_success(response).await?;
        Ok(())
    }

    pub async fn previous_track(&self) -> Result<(), RemoteError> {
        let response = self
            .request(Method::POST, "/me/player/previous")
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Current playback state; `None` when nothing is playing.
    pub async fn current_playback(&self) -> Result<Option<PlaybackState>, RemoteError> {
        let response = self.request(Method::GET, "/me/player").send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = expect_success(response).await?;
        Ok(Some(response.json().await?))
    }

    /// Track search, capped at `limit` results.
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, RemoteError> {
        let limit = limit.to_string();
        let response = self
            .request(Method::GET, "/search")
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;
        let response = expect_success(response).await?;
        let data: SearchResponse = response.json().await?;
        Ok(data.tracks.items)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base_url, path))
            .bearer_auth(&self.access_token)
            .timeout(Duration::from_secs(REMOTE_TIMEOUT_SECS))
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(RemoteError::Api { status, message })
}
