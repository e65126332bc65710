// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fake provider: OAuth token endpoint, session registration,
//! a handful of REST endpoints, the alarm bootstrap, and the alarm socket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use doorbot::ClientConfig;

type Params = Query<HashMap<String, String>>;

/// Knobs and counters shared with the handlers.
#[derive(Default)]
pub struct FakeState {
    pub token_calls: AtomicU32,
    pub password_grants: AtomicU32,
    pub refresh_grants: AtomicU32,
    pub session_calls: AtomicU32,
    pub api_calls: AtomicU32,
    pub ws_connects: AtomicU32,

    pub reject_refresh: AtomicBool,
    pub reject_password: AtomicBool,
    pub reject_connections: AtomicBool,
    /// API calls still to be answered with 401.
    pub unauthorized: AtomicU32,
    pub token_delay_ms: AtomicU64,
    pub api_delay_ms: AtomicU64,

    last_query: Mutex<HashMap<String, String>>,
    last_path: Mutex<Option<String>>,
    last_session_body: Mutex<Value>,
    ws_frames: Mutex<Vec<String>>,
}

impl FakeState {
    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> HashMap<String, String> {
        self.last_query.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_path(&self) -> Option<String> {
        self.last_path.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_session_body(&self) -> Value {
        self.last_session_body.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn ws_frames(&self) -> Vec<String> {
        self.ws_frames.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub struct FakeProvider {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeProvider {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/clients_api/session", post(session))
            .route("/clients_api/ring_devices", get(devices))
            .route("/clients_api/doorbots/history", get(history))
            .route("/clients_api/dings/active", get(dings))
            .route("/clients_api/dings/{id}/recording", get(recording))
            .route("/clients_api/doorbots/{id}/{action}", get(action).put(action).post(action))
            .route("/clients_api/chimes/{id}/{action}", post(action))
            .route("/clients_api/error_envelope", get(error_envelope))
            .route("/api/v1/rs/connections", post(connections))
            .route("/ws/", get(alarm_socket))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, state })
    }

    pub fn base(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Password config aimed at this provider, with no settle delay or backoff.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_password("user@example.com", "hunter2")
            .base_url(&self.base())
            .settle_ms(0)
            .retry_backoff_ms(0)
            .alarm_reply_timeout_ms(2_000)
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

async fn token(State(s): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    let n = s.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = s.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let rejected = match body["grant_type"].as_str() {
        Some("refresh_token") => {
            s.refresh_grants.fetch_add(1, Ordering::SeqCst);
            s.reject_refresh.load(Ordering::SeqCst)
        }
        Some("password") => {
            s.password_grants.fetch_add(1, Ordering::SeqCst);
            s.reject_password.load(Ordering::SeqCst)
        }
        _ => true,
    };
    if rejected {
        return reply(StatusCode::UNAUTHORIZED, json!({ "error": "invalid_grant" }));
    }
    reply(
        StatusCode::OK,
        json!({ "access_token": format!("access-{n}"), "refresh_token": format!("refresh-{n}") }),
    )
}

async fn session(State(s): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    let n = s.session_calls.fetch_add(1, Ordering::SeqCst) + 1;
    *s.last_session_body.lock().unwrap_or_else(|e| e.into_inner()) = body;
    reply(StatusCode::OK, json!({ "profile": { "authentication_token": format!("session-{n}") } }))
}

/// Count the call, record its query, apply delay and pending 401s.
async fn gate(s: &FakeState, query: &HashMap<String, String>) -> Option<Response> {
    s.api_calls.fetch_add(1, Ordering::SeqCst);
    *s.last_query.lock().unwrap_or_else(|e| e.into_inner()) = query.clone();
    let delay = s.api_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if !query.contains_key("auth_token") {
        return Some(reply(StatusCode::UNAUTHORIZED, json!({})));
    }
    let pending = s.unauthorized.load(Ordering::SeqCst);
    if pending > 0 {
        s.unauthorized.store(pending - 1, Ordering::SeqCst);
        return Some((StatusCode::UNAUTHORIZED, "").into_response());
    }
    None
}

async fn devices(State(s): State<Arc<FakeState>>, Query(q): Params) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    let body = r#"{"doorbots":[{"id":6812093456789012345,"description":"Front Door"}],"chimes":[],"stickup_cams":[{"id":42,"led_status":"on","created_at":"2024-03-01T10:20:30.000Z"}]}"#;
    ([("content-type", "application/json")], body).into_response()
}

async fn history(State(s): State<Arc<FakeState>>, Query(q): Params) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    let body = r#"[{"id":68120934567890123456,"created_at":"2024-03-01T10:20:30.000Z","kind":"motion"}]"#;
    ([("content-type", "application/json")], body).into_response()
}

async fn dings(State(s): State<Arc<FakeState>>, Query(q): Params) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    reply(StatusCode::OK, json!([]))
}

async fn recording(
    State(s): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Query(q): Params,
) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    reply(StatusCode::OK, json!({ "url": format!("https://video.example/{id}.mp4") }))
}

async fn action(
    State(s): State<Arc<FakeState>>,
    Path((id, action)): Path<(String, String)>,
    Query(q): Params,
) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    *s.last_path.lock().unwrap_or_else(|e| e.into_inner()) = Some(format!("{id}/{action}"));
    (StatusCode::OK, "").into_response()
}

async fn error_envelope(State(s): State<Arc<FakeState>>, Query(q): Params) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    reply(StatusCode::OK, json!({ "error": "teapot", "status": "418" }))
}

async fn connections(
    State(s): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(q): Params,
) -> Response {
    if let Some(resp) = gate(&s, &q).await {
        return resp;
    }
    if s.reject_connections.load(Ordering::SeqCst) {
        return reply(StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "unavailable" }));
    }
    // The socket lives on the same listener; the server field carries its scheme.
    let host = headers.get("host").and_then(|h| h.to_str().ok()).unwrap_or_default();
    reply(StatusCode::OK, json!({ "server": format!("ws://{host}/ws"), "authCode": "alarm-code" }))
}

async fn alarm_socket(
    State(s): State<Arc<FakeState>>,
    Query(q): Params,
    ws: WebSocketUpgrade,
) -> Response {
    if q.get("authcode").map(String::as_str) != Some("alarm-code") {
        return StatusCode::FORBIDDEN.into_response();
    }
    s.ws_connects.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| serve_alarm(socket, s))
}

async fn serve_alarm(mut socket: WebSocket, s: Arc<FakeState>) {
    while let Some(Ok(frame)) = socket.recv().await {
        let text = match frame {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };
        s.ws_frames.lock().unwrap_or_else(|e| e.into_inner()).push(text.clone());

        let Ok(cmd) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let seq = cmd["seq"].clone();
        let answer = match cmd["msg"].as_str() {
            Some("DeviceInfoDocGetList") => json!({
                "msg": "DeviceInfoDocGetList",
                "seq": seq,
                "body": [{ "zid": "panel-zid", "deviceType": "security-panel" }],
            }),
            Some("DeviceInfoSet") => json!({ "msg": "DeviceInfoSet", "seq": seq, "status": 0 }),
            _ => json!({ "msg": "DataUpdate", "seq": seq, "body": cmd["body"].clone() }),
        };
        if socket.send(Message::Text(answer.to_string().into())).await.is_err() {
            break;
        }
    }
}
