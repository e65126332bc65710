// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request dispatch with a bounded 401 retry loop.

use std::sync::Arc;

use reqwest::header::{LOCATION, USER_AGENT};
use reqwest::Method;
use serde_json::Value;

use crate::auth::session::SessionManager;
use crate::auth::AuthTokens;
use crate::config::ClientConfig;
use crate::error::{DoorbotError, Result};
use crate::value::{normalize_body, ApiValue};

/// A single provider request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path under the API root, or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful provider response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ApiValue,
    /// `Location` header, when the provider redirects.
    pub location: Option<String>,
}

pub struct Dispatcher {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    session: Arc<SessionManager>,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, config: Arc<ClientConfig>, session: Arc<SessionManager>) -> Self {
        Self { http, config, session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Issue `req` with the current session, re-authenticating on 401 up to
    /// the configured retry budget.
    pub async fn dispatch(&self, req: &Request) -> Result<ApiResponse> {
        let limit = self.config.retries;
        let mut retries = 0u32;

        loop {
            let (outcome, used) = match self.session.ensure_authenticated().await {
                Ok(tokens) => (self.attempt(req, &tokens).await, Some(tokens)),
                Err(e) => (Err(e), None),
            };

            match outcome {
                Ok(resp) => return Ok(resp),
                Err(e) if is_retryable(&e) && retries < limit => {
                    retries += 1;
                    tracing::info!(
                        path = %req.path,
                        retry = retries,
                        limit,
                        err = %e,
                        "authorization failed, re-authenticating"
                    );
                    // A failed exchange already left the session empty.
                    if let Some(ref tokens) = used {
                        self.session.reject(tokens).await;
                    }
                    tokio::time::sleep(self.config.retry_backoff()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One network attempt bounded by the configured deadline.
    async fn attempt(&self, req: &Request, tokens: &AuthTokens) -> Result<ApiResponse> {
        let url = self.url(&req.path);
        let mut builder = self
            .http
            .request(req.method.clone(), &url)
            .bearer_auth(&tokens.access_token)
            .header(USER_AGENT, &self.config.user_agent)
            .query(&[
                ("api_version", self.config.api_version.to_string()),
                ("auth_token", tokens.session_token.clone()),
            ])
            .query(&req.query);
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %req.method, path = %req.path, "dispatching");
        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status().as_u16();
            let location =
                resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
            let text = resp.text().await?;
            Ok::<_, DoorbotError>((status, location, text))
        };

        let deadline = self.config.timeout();
        let (status, location, text) = tokio::time::timeout(deadline, exchange)
            .await
            .map_err(|_| DoorbotError::Timeout(deadline))??;

        tracing::debug!(method = %req.method, path = %req.path, status, "response");
        interpret(status, location, &text)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}{}", self.config.api_root, path)
        }
    }
}

fn is_retryable(e: &DoorbotError) -> bool {
    e.is_unauthorized() || matches!(e, DoorbotError::AuthExchange(_))
}

/// Turn a raw response into a body or an error.
///
/// A truthy `error` envelope becomes an application error; a status of 400 or
/// more then overwrites whatever status the envelope claimed, so the final
/// error always carries the transport status.
pub fn interpret(status: u16, location: Option<String>, text: &str) -> Result<ApiResponse> {
    let body = normalize_body(text);

    let mut error = match body.get("error") {
        Some(field) if is_truthy(field) => Some(DoorbotError::Application {
            status: envelope_status(&body["status"]),
            payload: body.clone(),
        }),
        _ => None,
    };

    if status >= 400 {
        error = Some(match error {
            Some(e) => e.with_transport_status(status),
            None => DoorbotError::Transport {
                status: Some(status),
                message: format!("API returned Status Code {status}"),
            },
        });
    }

    match error {
        Some(e) => Err(e),
        None => Ok(ApiResponse { status, body, location }),
    }
}

/// `null`, `false`, `""` and `0` mark an envelope without an error.
fn is_truthy(value: &ApiValue) -> bool {
    match value {
        ApiValue::Null => false,
        ApiValue::Bool(b) => *b,
        ApiValue::String(s) => !s.is_empty(),
        ApiValue::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        ApiValue::Timestamp(_) | ApiValue::Array(_) | ApiValue::Object(_) => true,
    }
}

fn envelope_status(value: &ApiValue) -> Option<u16> {
    match value {
        ApiValue::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        ApiValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
