// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token cache: load/save the refresh credential and hardware id to a JSON
//! file with atomic writes.
//!
//! Both directions are best-effort. A missing or corrupt file loads as an
//! empty payload; a failed save is logged and dropped.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CACHE_FILE_NAME: &str = "doorbot-cache.json";

/// On-disk cache record.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    #[serde(rename = "oauthToken", default, skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Cache file handle. A cache without a path loads empty and never writes.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: Option<PathBuf>,
}

impl TokenCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the cached payload. Never fails.
    pub async fn load(&self) -> CachePayload {
        let Some(ref path) = self.path else {
            return CachePayload::default();
        };
        match read_payload(path).await {
            Ok(payload) => {
                tracing::debug!(
                    path = %path.display(),
                    has_refresh = payload.refresh_token.is_some(),
                    has_hardware_id = payload.hardware_id.is_some(),
                    "token cache loaded"
                );
                payload
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no token cache yet");
                CachePayload::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "token cache unreadable, ignoring");
                CachePayload::default()
            }
        }
    }

    /// Persist the payload. Failures are logged, never propagated.
    pub async fn save(&self, payload: &CachePayload) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Err(e) = write_payload(path, payload).await {
            tracing::warn!(path = %path.display(), err = %e, "token cache write failed");
        } else {
            tracing::debug!(path = %path.display(), "token cache saved");
        }
    }
}

async fn read_payload(path: &Path) -> std::io::Result<CachePayload> {
    let contents = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&contents).map_err(std::io::Error::other)
}

/// Write tmp + rename so a crash never leaves a truncated cache.
///
/// The temp name is unique per process and call so concurrent saves never
/// share a `.tmp` file.
async fn write_payload(path: &Path, payload: &CachePayload) -> std::io::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(payload).map_err(std::io::Error::other)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
