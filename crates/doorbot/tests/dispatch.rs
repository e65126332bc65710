// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch: retries, deadlines, error envelopes, body handling.

mod support;

use std::sync::atomic::Ordering;

use doorbot::{ApiValue, Client, DoorbotError, HistoryQuery, Request};
use support::{FakeProvider, FakeState};

#[tokio::test]
async fn unauthorized_retry_budget() -> anyhow::Result<()> {
    // (retries, 401s served, succeeds, attempts)
    let cases = [(0, 1, false, 1), (1, 1, true, 2), (2, 5, false, 3), (3, 2, true, 3)];

    for (retries, rejections, succeeds, attempts) in cases {
        let fake = FakeProvider::start().await?;
        fake.state.unauthorized.store(rejections, Ordering::SeqCst);
        let client = Client::new(fake.config().retries(retries))?;

        let outcome = client.devices().await;

        assert_eq!(outcome.is_ok(), succeeds, "retries={retries}: got {outcome:?}");
        if let Err(e) = outcome {
            assert_eq!(e.status(), Some(401));
        }
        assert_eq!(FakeState::count(&fake.state.api_calls), attempts, "retries={retries}");
        // Every attempt runs on a freshly exchanged session.
        assert_eq!(FakeState::count(&fake.state.token_calls), attempts, "retries={retries}");
    }
    Ok(())
}

#[tokio::test]
async fn timeout_is_reported_once() -> anyhow::Result<()> {
    let fake = FakeProvider::start().await?;
    fake.state.api_delay_ms.store(500, Ordering::SeqCst);
    let client = Client::new(fake.config().timeout_ms(100).retries(3))?;

    let err = client.devices().await.expect_err("deadline");

    assert!(matches!(err, DoorbotError::Timeout(_)), "got {err:?}");
    assert_eq!(FakeState::count(&fake.state.api_calls), 1);
    Ok(())
}

#[tokio::test]
async fn error_envelope_becomes_application_error() -> anyhow::Result<()> {
    let fake = FakeProvider::start().await?;
    let client = Client::new(fake.config())?;

    let err = client.dispatch(&Request::get("/error_envelope")).await.expect_err("envelope");

    match err {
        DoorbotError::Application { status, ref payload } => {
            assert_eq!(status, Some(418));
            assert_eq!(payload["error"].as_str(), Some("teapot"));
        }
        other => anyhow::bail!("expected application error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_route_is_a_transport_error() -> anyhow::Result<()> {
    let fake = FakeProvider::start().await?;
    let client = Client::new(fake.config())?;

    let err = client.dispatch(&Request::get("/no/such/thing")).await.expect_err("404");

    assert!(matches!(err, DoorbotError::Transport { status: Some(404), .. }), "got {err:?}");
    assert_eq!(err.to_string(), "API returned Status Code 404");
    Ok(())
}

#[tokio::test]
async fn requests_carry_version_and_session_token() -> anyhow::Result<()> {
    let fake = FakeProvider::start().await?;
    let client = Client::new(fake.config())?;

    client.dings().await?;

    let query = fake.state.last_query();
    assert_eq!(query.get("api_version").map(String::as_str), Some("11"));
    assert_eq!(query.get("auth_token").map(String::as_str), Some("session-1"));
    Ok(())
}

#[tokio::test]
async fn bodies_are_normalized() -> anyhow::Result<()> {
    let fake = FakeProvider::start().await?;
    let client = Client::new(fake.config())?;

    let devices = client.devices().await?;
    let cam = &devices["stickup_cams"][0];
    assert!(matches!(cam["created_at"], ApiValue::Timestamp(_)));
    assert_eq!(cam["created_at"].to_json(), "2024-03-01T10:20:30.000Z");

    let history = client.history(&HistoryQuery::default()).await?;
    assert_eq!(history[0]["id"].as_str(), Some("68120934567890123456"));
    Ok(())
}

#[tokio::test]
async fn empty_body_is_null() -> anyhow::Result<()> {
    let fake = FakeProvider::start().await?;
    let client = Client::new(fake.config())?;

    let device = doorbot::value::normalize_body(r#"{"id": 42}"#);
    assert!(client.light_on(&device).await?.is_null());
    Ok(())
}
