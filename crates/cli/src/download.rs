// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `doorbot download`: fetch event recordings into a local tree.
//!
//! Files land at `<out>/<device id>/<yyyymmdd_HHMMSS>_<event id>.mp4`.
//! Existing files are skipped. Without a limit, history is paged from the
//! newest event backwards until a page yields no older event.

use std::path::{Path, PathBuf};

use anyhow::Context;
use futures_util::stream::{self, Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use doorbot::{device_id, ApiValue, Client, HistoryQuery};

/// Events requested per history page when paging.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} saved, {} skipped, {} failed", self.saved, self.skipped, self.failed)
    }
}

enum Fetched {
    Saved,
    Skipped,
}

/// Event id as a string, if the entry carries one.
pub fn event_id(event: &ApiValue) -> Option<String> {
    device_id(event).ok()
}

/// Local file for an event's recording.
pub fn recording_path(out: &Path, event: &ApiValue) -> Option<PathBuf> {
    let id = event_id(event)?;
    let device = device_id(&event["doorbot"]).unwrap_or_else(|_| "unknown".to_owned());
    let stamp = event["created_at"]
        .as_timestamp()
        .map(|ts| ts.format("%Y%m%d_%H%M%S").to_string())
        .unwrap_or_else(|| "undated".to_owned());
    Some(out.join(device).join(format!("{stamp}_{id}.mp4")))
}

/// Oldest event id on a page. Ids are decimal strings of any length.
pub fn oldest_id(events: &[ApiValue]) -> Option<String> {
    events
        .iter()
        .filter_map(event_id)
        .filter(|id| id.bytes().all(|b| b.is_ascii_digit()))
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

/// Download recordings for the newest `limit` events, or the whole history.
pub async fn run(
    client: &Client,
    limit: Option<u32>,
    out: &Path,
    concurrency: usize,
) -> anyhow::Result<Summary> {
    let http = reqwest::Client::builder().build()?;
    let mut summary = Summary::default();
    let mut cursor: Option<String> = None;

    loop {
        let query = HistoryQuery { limit: Some(limit.unwrap_or(PAGE_SIZE)), older_than: cursor.clone() };
        let page = client.history(&query).await?;
        let events = page.as_array().unwrap_or(&[]);
        if events.is_empty() {
            break;
        }
        info!(events = events.len(), older_than = ?cursor, "fetching page");

        let results: Vec<_> = stream::iter(events)
            .map(|event| fetch(client, &http, out, event))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        for result in results {
            match result {
                Ok(Fetched::Saved) => summary.saved += 1,
                Ok(Fetched::Skipped) => summary.skipped += 1,
                Err(e) => {
                    warn!(err = %format!("{e:#}"), "download failed");
                    summary.failed += 1;
                }
            }
        }

        if limit.is_some() {
            break;
        }
        let next = oldest_id(events);
        if next.is_none() || next == cursor {
            break;
        }
        cursor = next;
    }
    Ok(summary)
}

async fn fetch(
    client: &Client,
    http: &reqwest::Client,
    out: &Path,
    event: &ApiValue,
) -> anyhow::Result<Fetched> {
    let (Some(id), Some(path)) = (event_id(event), recording_path(out, event)) else {
        anyhow::bail!("history entry without an id");
    };
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        info!(path = %path.display(), "exists, skipping");
        return Ok(Fetched::Skipped);
    }

    let url = client.recording(&id).await?;
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.with_context(|| format!("create {}", dir.display()))?;
    }

    let resp = http.get(&url).send().await?.error_for_status()?;
    save_stream(resp.bytes_stream(), &path).await?;

    info!(event = %id, path = %path.display(), "saved");
    Ok(Fetched::Saved)
}

/// Write `body` to a `.part` file beside `path`, then move it into place.
///
/// A failed write removes the `.part` file so a rerun starts clean.
pub async fn save_stream<S, B, E>(body: S, path: &Path) -> anyhow::Result<()>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let tmp = path.with_extension("mp4.part");
    if let Err(e) = write_part(body, &tmp).await {
        if let Err(rm) = tokio::fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), err = %rm, "could not remove partial file");
        }
        return Err(e);
    }
    tokio::fs::rename(&tmp, path).await.with_context(|| format!("rename {}", tmp.display()))?;
    Ok(())
}

async fn write_part<S, B, E>(body: S, tmp: &Path) -> anyhow::Result<()>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut file = tokio::fs::File::create(tmp).await.with_context(|| format!("create {}", tmp.display()))?;
    let mut body = std::pin::pin!(body);
    while let Some(chunk) = body.next().await {
        file.write_all(chunk?.as_ref()).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
