// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: owns the auth state and runs at most one exchange at a
//! time.
//!
//! Callers that arrive while an exchange is in flight are queued and all
//! receive that exchange's outcome, in arrival order. The exchange runs on
//! its own task, so it always completes and drains the queue even if every
//! caller has gone away.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex, OnceCell};

use crate::auth::oauth::{Exchange, OAuthExchanger};
use crate::auth::{generate_hardware_id, AuthTokens};
use crate::cache::{CachePayload, TokenCache};
use crate::config::ClientConfig;
use crate::error::{DoorbotError, Result};

type Waiter = oneshot::Sender<Result<AuthTokens>>;

/// Observable session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoToken,
    Authenticating,
    Authenticated,
}

enum AuthState {
    NoToken,
    Authenticating { queue: VecDeque<Waiter> },
    Authenticated(AuthTokens),
}

struct SessionState {
    auth: AuthState,
    hardware_id: String,
    refresh_token: Option<String>,
}

pub struct SessionManager {
    config: Arc<ClientConfig>,
    exchanger: OAuthExchanger,
    cache: TokenCache,
    loaded: OnceCell<()>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(config: Arc<ClientConfig>, exchanger: OAuthExchanger, cache: TokenCache) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SessionState {
                auth: AuthState::NoToken,
                hardware_id: String::new(),
                refresh_token: config.refresh_token.clone(),
            }),
            config,
            exchanger,
            cache,
            loaded: OnceCell::new(),
        })
    }

    /// Restore the cached refresh token and hardware id.
    ///
    /// Runs once; every authentication attempt waits on it so a restored
    /// refresh token is in place before the first network call.
    pub async fn ensure_loaded(&self) {
        self.loaded
            .get_or_init(|| async {
                let payload = self.cache.load().await;
                let mut state = self.state.lock().await;
                state.hardware_id = payload.hardware_id.unwrap_or_else(generate_hardware_id);
                // A cached token is at least as fresh as the configured seed.
                if payload.refresh_token.is_some() {
                    state.refresh_token = payload.refresh_token;
                }
            })
            .await;
    }

    /// Return usable tokens, authenticating if needed.
    pub async fn ensure_authenticated(self: &Arc<Self>) -> Result<AuthTokens> {
        self.ensure_loaded().await;

        let rx = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let (tx, rx) = oneshot::channel();
            match state.auth {
                AuthState::Authenticated(ref tokens) => return Ok(tokens.clone()),
                AuthState::Authenticating { ref mut queue } => {
                    queue.push_back(tx);
                    tracing::debug!(queued = queue.len(), "joining in-flight authentication");
                }
                AuthState::NoToken => {
                    state.auth = AuthState::Authenticating { queue: VecDeque::from([tx]) };
                    let hardware_id = state.hardware_id.clone();
                    let refresh_token = state.refresh_token.clone();
                    tracing::debug!(has_refresh = refresh_token.is_some(), "starting authentication");
                    let this = Arc::clone(self);
                    tokio::spawn(async move {
                        this.run_exchange(hardware_id, refresh_token).await;
                    });
                }
            }
            rx
        };

        rx.await.unwrap_or_else(|_| {
            Err(DoorbotError::AuthExchange("authentication task ended unexpectedly".to_owned()))
        })
    }

    async fn run_exchange(&self, hardware_id: String, refresh_token: Option<String>) {
        let result = self.exchanger.exchange(&hardware_id, refresh_token.as_deref()).await;

        let outcome = match result {
            Ok(exchange) => {
                let tokens = self.record_exchange(&hardware_id, exchange).await;
                // Provider-side propagation lag for fresh session tokens.
                tokio::time::sleep(self.config.settle_delay()).await;
                Ok(tokens)
            }
            Err(e) => {
                tracing::warn!(err = %e, "authentication failed");
                Err(e)
            }
        };

        let queue = {
            let mut state = self.state.lock().await;
            let next = match outcome {
                Ok(ref tokens) => AuthState::Authenticated(tokens.clone()),
                Err(_) => AuthState::NoToken,
            };
            match std::mem::replace(&mut state.auth, next) {
                AuthState::Authenticating { queue } => queue,
                _ => VecDeque::new(),
            }
        };

        tracing::debug!(
            waiters = queue.len(),
            ok = outcome.is_ok(),
            "authentication resolved"
        );
        for waiter in queue {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Store the rotated refresh token and write the cache through.
    async fn record_exchange(&self, hardware_id: &str, exchange: Exchange) -> AuthTokens {
        let refresh_token = {
            let mut state = self.state.lock().await;
            if exchange.refresh_token.is_some() {
                state.refresh_token = exchange.refresh_token;
            }
            state.refresh_token.clone()
        };
        self.cache
            .save(&CachePayload {
                hardware_id: Some(hardware_id.to_owned()),
                oauth_token: Some(exchange.access_token.clone()),
                refresh_token,
            })
            .await;
        AuthTokens { access_token: exchange.access_token, session_token: exchange.session_token }
    }

    /// Drop the current session unconditionally.
    ///
    /// A no-op while an exchange is in flight: that exchange's result is
    /// already newer than any token a caller holds.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if let AuthState::Authenticated(_) = state.auth {
            tracing::debug!("session invalidated");
            state.auth = AuthState::NoToken;
        }
    }

    /// Drop the session after the provider rejected `tokens`.
    ///
    /// Only the session those tokens belong to is dropped. A stale rejection
    /// arriving after another caller already re-authenticated leaves the
    /// fresh session in place.
    pub async fn reject(&self, tokens: &AuthTokens) {
        let mut state = self.state.lock().await;
        match state.auth {
            AuthState::Authenticated(ref current) if current == tokens => {
                tracing::debug!("rejected session invalidated");
                state.auth = AuthState::NoToken;
            }
            AuthState::Authenticated(_) => tracing::debug!("stale rejection, keeping newer session"),
            _ => {}
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        match self.state.lock().await.auth {
            AuthState::NoToken => SessionPhase::NoToken,
            AuthState::Authenticating { .. } => SessionPhase::Authenticating,
            AuthState::Authenticated(_) => SessionPhase::Authenticated,
        }
    }

    /// Per-installation hardware identifier (after the cache load).
    pub async fn hardware_id(&self) -> String {
        self.ensure_loaded().await;
        self.state.lock().await.hardware_id.clone()
    }

    /// Current refresh token, if any.
    pub async fn refresh_token(&self) -> Option<String> {
        self.ensure_loaded().await;
        self.state.lock().await.refresh_token.clone()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
