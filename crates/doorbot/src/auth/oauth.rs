// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth exchange: token grant, then session registration.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::config::ClientConfig;
use crate::error::{DoorbotError, Result};
use crate::value::{normalize_body, ApiValue};

/// Token endpoint response, reduced to what the exchange needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Output of a full two-step exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub session_token: String,
}

/// Grant presented at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant<'a> {
    Password { username: &'a str, password: &'a str },
    Refresh(&'a str),
}

impl Grant<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Refresh(_) => "refresh_token",
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    grant_type: &'static str,
    scope: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

/// Performs the token and session round-trips.
pub struct OAuthExchanger {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl OAuthExchanger {
    pub fn new(http: reqwest::Client, config: Arc<ClientConfig>) -> Self {
        Self { http, config }
    }

    /// Run the full exchange.
    ///
    /// With a refresh token the refresh grant is tried first and a failure
    /// falls back exactly once to the password grant. Without password
    /// credentials the refresh-grant error is surfaced. A password-grant
    /// failure is surfaced as-is.
    pub async fn exchange(&self, hardware_id: &str, refresh_token: Option<&str>) -> Result<Exchange> {
        let token = match refresh_token {
            Some(rt) => match self.token_step(Grant::Refresh(rt)).await {
                Ok(token) => token,
                Err(e) => {
                    // Without password credentials the refresh failure is the answer.
                    let Ok(grant) = self.password_grant() else {
                        return Err(e);
                    };
                    tracing::warn!(err = %e, "refresh grant failed, falling back to password grant");
                    self.token_step(grant).await?
                }
            },
            None => self.token_step(self.password_grant()?).await?,
        };

        let session_token = self.session_step(hardware_id, &token.access_token).await?;
        Ok(Exchange {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            session_token,
        })
    }

    fn password_grant(&self) -> Result<Grant<'_>> {
        match (self.config.email.as_deref(), self.config.password.as_deref()) {
            (Some(username), Some(password)) => Ok(Grant::Password { username, password }),
            _ => Err(DoorbotError::AuthExchange("no password credentials configured".to_owned())),
        }
    }

    /// POST the grant to the token endpoint.
    pub async fn token_step(&self, grant: Grant<'_>) -> Result<TokenResponse> {
        let (username, password, refresh_token) = match grant {
            Grant::Password { username, password } => (Some(username), Some(password), None),
            Grant::Refresh(rt) => (None, None, Some(rt)),
        };
        let body = TokenRequest {
            client_id: &self.config.client_id,
            grant_type: grant.kind(),
            scope: "client",
            username,
            password,
            refresh_token,
        };

        tracing::debug!(grant = grant.kind(), "requesting oauth token");
        let resp = self
            .http
            .post(&self.config.oauth_url)
            .timeout(self.config.timeout())
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .json(&body)
            .send()
            .await
            .map_err(|e| DoorbotError::AuthExchange(format!("token request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| DoorbotError::AuthExchange(format!("token response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(DoorbotError::AuthExchange(format!(
                "token endpoint returned {status} for {} grant",
                grant.kind()
            )));
        }
        decode_token(&text)
    }

    /// POST the device registration and return the session token.
    pub async fn session_step(&self, hardware_id: &str, access_token: &str) -> Result<String> {
        let url = format!("{}/session", self.config.api_root);
        let body = json!({
            "device": {
                "hardware_id": hardware_id,
                "metadata": {
                    "api_version": self.config.api_version,
                    "device_model": "doorbot-rs",
                },
                "os": "android",
            }
        });

        tracing::debug!("requesting session token");
        let resp = self
            .http
            .post(url)
            .timeout(self.config.timeout())
            .query(&[("api_version", self.config.api_version)])
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .json(&body)
            .send()
            .await
            .map_err(|e| DoorbotError::AuthExchange(format!("session request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| DoorbotError::AuthExchange(format!("session response unreadable: {e}")))?;
        if !status.is_success() {
            tracing::debug!(%status, "session endpoint rejected the access token");
        }
        decode_session_token(&text)
    }
}

/// Extract `access_token` (and the rotated `refresh_token`) from a token body.
pub fn decode_token(body: &str) -> Result<TokenResponse> {
    let value = normalize_body(body);
    let access_token = non_empty_str(&value["access_token"]).ok_or_else(|| {
        DoorbotError::AuthExchange("Api failed to return an access_token".to_owned())
    })?;
    Ok(TokenResponse {
        access_token,
        refresh_token: non_empty_str(&value["refresh_token"]),
    })
}

/// Extract `profile.authentication_token` from a session body.
pub fn decode_session_token(body: &str) -> Result<String> {
    let value = normalize_body(body);
    non_empty_str(&value["profile"]["authentication_token"]).ok_or_else(|| {
        DoorbotError::AuthExchange("Api failed to return an authentication_token".to_owned())
    })
}

fn non_empty_str(value: &ApiValue) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_owned)
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
