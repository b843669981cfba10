//! Credential storage for the playback account.
//!
//! The credential cache lives at a fixed relative path
//! (`.playd/credentials.json`) and is rewritten after every successful
//! token exchange or refresh. Writes go through a temp file followed by a
//! rename so a concurrent reader never observes a torn file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AuthError;

/// Directory holding the credential cache.
const CACHE_DIR: &str = ".playd";

/// Credential cache file name.
const CACHE_FILE: &str = "credentials.json";

/// Seconds before the literal expiry at which a token is treated as
/// expired, so an in-flight remote call never races a token that lapses
/// mid-request.
pub const EXPIRY_GRACE_SECS: i64 = 60;

/// OAuth credential for the managed playback account.
///
/// The refresh token is never discarded once obtained; a refresh response
/// that omits one keeps the previous value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as Unix timestamp (seconds).
    pub expires_at: i64,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credentials {
    /// True once the token is inside the grace window (or past expiry).
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expires_at - EXPIRY_GRACE_SECS
    }
}

/// On-disk cache for the single managed credential.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The fixed relative cache path used in production.
    pub fn default_path() -> PathBuf {
        PathBuf::from(CACHE_DIR).join(CACHE_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached credential, if any.
    pub fn load(&self) -> Result<Option<Credentials>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.path)
            .map_err(|e| cache_error("read", &self.path, &e))?;
        let credentials = serde_json::from_slice(&data)
            .map_err(|e| cache_error("parse", &self.path, &e))?;
        Ok(Some(credentials))
    }

    /// Persist the credential. Write-then-rename keeps the cache readable
    /// at every instant.
    pub fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| cache_error("create", parent, &e))?;
            }
        }

        let data = serde_json::to_vec_pretty(credentials)
            .map_err(|e| cache_error("encode", &self.path, &e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data).map_err(|e| cache_error("write", &tmp, &e))?;
        fs::rename(&tmp, &self.path).map_err(|e| cache_error("rename", &tmp, &e))?;
        Ok(())
    }

    /// Remove the cached credential. Deleting the cache is the only way a
    /// refresh token is ever discarded.
    pub fn clear(&self) -> Result<(), AuthError> {
        if !self.path.exists() {
            return Ok(());
        }
        fs::remove_file(&self.path).map_err(|e| cache_error("remove", &self.path, &e))
    }
}

fn cache_error(op: &str, path: &Path, error: &dyn std::fmt::Display) -> AuthError {
    AuthError::Cache(format!("{op} {}: {error}", path.display()))
}
