// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-stage authentication: OAuth token exchange followed by a session
//! exchange, serialized behind a single-flight session manager.

pub mod oauth;
pub mod session;

use std::fmt;

/// Credentials produced by a completed exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokens {
    /// Short-lived OAuth bearer token.
    pub access_token: String,
    /// Provider session token required by REST endpoints.
    pub session_token: String,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh per-installation hardware identifier.
pub fn generate_hardware_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
