// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use doorbot::value::normalize_body;

use super::*;

#[test]
fn path_uses_device_timestamp_and_event() {
    let event = normalize_body(
        r#"{"id":6812093456789012345,"created_at":"2024-03-01T10:20:30.000Z","doorbot":{"id":42}}"#,
    );
    let path = recording_path(Path::new("out"), &event);
    assert_eq!(path, Some(Path::new("out/42/20240301_102030_6812093456789012345.mp4").to_path_buf()));
}

#[test]
fn path_tolerates_missing_device_and_date() {
    let event = normalize_body(r#"{"id":7}"#);
    let path = recording_path(Path::new("out"), &event);
    assert_eq!(path, Some(Path::new("out/unknown/undated_7.mp4").to_path_buf()));
}

#[test]
fn path_requires_event_id() {
    assert_eq!(recording_path(Path::new("out"), &normalize_body(r#"{"kind":"ding"}"#)), None);
}

#[yare::parameterized(
    simple     = { r#"[{"id":30},{"id":10},{"id":20}]"#, Some("10") },
    by_length  = { r#"[{"id":"900"},{"id":"1000"}]"#, Some("900") },
    big        = { r#"[{"id":68120934567890123456,"created_at":"2024-03-01T10:20:30.000Z"},{"id":68120934567890123455,"created_at":"2024-03-01T10:20:30.000Z"}]"#, Some("68120934567890123455") },
    skips_junk = { r#"[{"id":"abc"},{"kind":"x"},{"id":5}]"#, Some("5") },
    empty      = { "[]", None },
)]
fn oldest_id_picks_smallest(body: &str, expected: Option<&str>) {
    let page = normalize_body(body);
    let events = page.as_array().unwrap_or(&[]);
    assert_eq!(oldest_id(events).as_deref(), expected);
}

#[test]
fn summary_display() {
    let summary = Summary { saved: 3, skipped: 1, failed: 0 };
    assert_eq!(summary.to_string(), "3 saved, 1 skipped, 0 failed");
}

#[tokio::test]
async fn complete_stream_lands_at_final_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("42_7.mp4");
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())];

    save_stream(stream::iter(chunks), &path).await?;

    assert_eq!(std::fs::read(&path)?, b"abcd");
    assert!(!path.with_extension("mp4.part").exists());
    Ok(())
}

#[tokio::test]
async fn interrupted_stream_leaves_no_partial_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("42_7.mp4");
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
        vec![Ok(b"ab".to_vec()), Err(std::io::Error::other("connection reset"))];

    let err = save_stream(stream::iter(chunks), &path).await.expect_err("stream cut");

    assert!(err.to_string().contains("connection reset"), "got {err:#}");
    assert!(!path.with_extension("mp4.part").exists());
    assert!(!path.exists());
    Ok(())
}
