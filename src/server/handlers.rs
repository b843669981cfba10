//! Request handlers.
//!
//! Each playback handler validates its input, acquires a client handle for
//! this one request, forwards exactly one remote call, and maps the result.
//! Handles are never cached across requests.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::authorize_url;

use super::error::ApiError;
use super::{AppState, SEARCH_LIMIT};

#[derive(Debug, Default, Deserialize)]
pub struct PlayRequest {
    #[serde(default)]
    pub track_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CurrentTrack {
    pub name: String,
    pub artist: String,
    pub uri: String,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct TrackSummary {
    pub name: String,
    pub artist: String,
    pub uri: String,
}

/// End-to-end health probe.
///
/// Three outcomes: the installed client can still list devices (healthy);
/// the client was missing or broken but reinitialization from the cache
/// brought one back (recovered, still a success); reinitialization failed
/// too (unhealthy).
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if let Some(client) = state.manager.installed_client().await {
        match client.devices().await {
            Ok(_) => {
                return (StatusCode::OK, Json(json!({ "status": "healthy" })));
            }
            Err(error) => {
                tracing::warn!("health probe remote check failed: {error}");
            }
        }
    }

    match state.manager.reinitialize().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "recovered", "message": "client reinitialized" })),
        ),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "unhealthy", "error": error.to_string() })),
        ),
    }
}

pub async fn play(
    State(state): State<AppState>,
    body: Option<Json<PlayRequest>>,
) -> Result<Json<Value>, ApiError> {
    let track_uri = body
        .and_then(|Json(request)| request.track_uri)
        .filter(|uri| !uri.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("no track URI provided".to_string()))?;

    let client = state.manager.acquire_client().await?;
    client.start_playback(&track_uri).await?;
    tracing::info!("started playback of {track_uri}");
    Ok(Json(
        json!({ "status": "success", "message": "track started playing" }),
    ))
}

pub async fn pause(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client = state.manager.acquire_client().await?;
    client.pause_playback().await?;
    Ok(Json(
        json!({ "status": "success", "message": "playback paused" }),
    ))
}

pub async fn next(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client = state.manager.acquire_client().await?;
    client.next_track().await?;
    Ok(Json(
        json!({ "status": "success", "message": "skipped to next track" }),
    ))
}

pub async fn previous(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client = state.manager.acquire_client().await?;
    client.previous_track().await?;
    Ok(Json(
        json!({ "status": "success", "message": "skipped to previous track" }),
    ))
}

pub async fn current_track(
    State(state): State<AppState>,
) -> Result<Json<CurrentTrack>, ApiError> {
    let client = state.manager.acquire_client().await?;
    let playback = client.current_playback().await?;

    let track = playback
        .as_ref()
        .and_then(|p| p.item.as_ref())
        .ok_or(ApiError::NothingPlaying)?;

    Ok(Json(CurrentTrack {
        name: track.name.clone(),
        artist: track.primary_artist().to_string(),
        uri: track.uri.clone(),
        progress_ms: playback
            .as_ref()
            .and_then(|p| p.progress_ms)
            .unwrap_or(0),
        duration_ms: track.duration_ms,
    }))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("no search query provided".to_string()))?;

    let client = state.manager.acquire_client().await?;
    let tracks = client.search_tracks(&query, SEARCH_LIMIT).await?;

    let tracks: Vec<TrackSummary> = tracks
        .into_iter()
        .map(|track| TrackSummary {
            artist: track.primary_artist().to_string(),
            name: track.name,
            uri: track.uri,
        })
        .collect();

    Ok(Json(json!({ "tracks": tracks })))
}

/// Informational page for the one-time interactive handshake.
pub async fn auth_page(State(state): State<AppState>) -> Html<String> {
    let url = authorize_url(
        &state.config.accounts_base_url,
        &state.config.client_id,
        &state.config.redirect_uri(),
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Playback Authorization</title></head>
<body>
<h1>Playback Authorization Required</h1>
<p>Click the link below to authorize playback control for your account:</p>
<a href="{url}" target="_blank">Authorize playback control</a>
</body>
</html>
"#
    ))
}

/// OAuth redirect target; completes the credential exchange.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> String {
    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        return "No authorization code provided".to_string();
    };

    match state
        .manager
        .complete_authorization(&code, &state.config.redirect_uri())
        .await
    {
        Ok(()) => "Authorization successful! You can close this window.".to_string(),
        Err(error) => {
            tracing::error!("authorization exchange failed: {error}");
            format!("Authorization failed: {error}")
        }
    }
}
