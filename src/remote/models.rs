//! Wire models for the playback API.
//!
//! Only the fields the control service actually forwards are modelled;
//! everything else in the remote payloads is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    /// The display artist: first credited artist on the track.
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(|artist| artist.name.as_str())
            .unwrap_or("Unknown Artist")
    }
}

/// Current playback state (`GET /me/player`).
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackState {
    pub item: Option<Track>,
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

/// A playback device attached to the account.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
pub struct TrackPage {
    pub items: Vec<Track>,
}
