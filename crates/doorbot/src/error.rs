// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use thiserror::Error;

use crate::value::ApiValue;

/// Errors surfaced by the client.
///
/// `Clone` so a single authentication outcome can be handed to every
/// caller that queued behind the in-flight exchange.
#[derive(Debug, Clone, Error)]
pub enum DoorbotError {
    /// The OAuth or session exchange did not yield a usable token.
    #[error("authentication failed: {0}")]
    AuthExchange(String),

    /// Non-2xx status or a network-level failure.
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },

    /// The request deadline elapsed before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with an explicit `error` envelope.
    #[error("provider error{}: {}", fmt_status(.status), envelope_message(.payload))]
    Application { status: Option<u16>, payload: ApiValue },

    /// Malformed caller input, rejected before any I/O.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Alarm channel failure that is not a transport error.
    #[error("alarm channel: {0}")]
    Alarm(String),
}

pub type Result<T> = std::result::Result<T, DoorbotError>;

impl DoorbotError {
    /// Status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } | Self::Application { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Overwrite the carried status with the transport status code.
    ///
    /// An error envelope keeps its payload; anything else becomes a
    /// [`DoorbotError::Transport`] error.
    pub(crate) fn with_transport_status(self, code: u16) -> Self {
        match self {
            Self::Application { payload, .. } => Self::Application { status: Some(code), payload },
            _ => Self::Transport {
                status: Some(code),
                message: format!("API returned Status Code {code}"),
            },
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<reqwest::Error> for DoorbotError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport { status: e.status().map(|s| s.as_u16()), message: e.to_string() }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DoorbotError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport { status: None, message: format!("websocket: {e}") }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

fn envelope_message(payload: &ApiValue) -> String {
    match payload.get("error") {
        Some(ApiValue::String(s)) => s.clone(),
        Some(other) => other.to_json().to_string(),
        None => payload.to_json().to_string(),
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
