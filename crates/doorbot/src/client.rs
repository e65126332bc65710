// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::alarm::{AlarmChannels, AlarmCommand, AlarmHandler};
use crate::auth::oauth::OAuthExchanger;
use crate::auth::session::{SessionManager, SessionPhase};
use crate::auth::AuthTokens;
use crate::cache::TokenCache;
use crate::config::ClientConfig;
use crate::dispatch::{ApiResponse, Dispatcher, Request};
use crate::error::{DoorbotError, Result};

/// Client for one provider account.
///
/// Owns the session, the request dispatcher, and the alarm connections.
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Client {
    config: Arc<ClientConfig>,
    dispatcher: Arc<Dispatcher>,
    alarm: AlarmChannels,
}

impl Client {
    /// Build a client. Fails synchronously on an unusable config.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        crate::tls::ensure_crypto_provider();

        let http = reqwest::Client::builder().build().map_err(|e| DoorbotError::Transport {
            status: None,
            message: format!("http client: {e}"),
        })?;
        let config = Arc::new(config);
        let cache = TokenCache::new(config.cache_file());
        let exchanger = OAuthExchanger::new(http.clone(), Arc::clone(&config));
        let session = SessionManager::new(Arc::clone(&config), exchanger, cache);
        let dispatcher = Arc::new(Dispatcher::new(http, Arc::clone(&config), session));
        let alarm = AlarmChannels::new(Arc::clone(&dispatcher), Arc::clone(&config));

        Ok(Self { config, dispatcher, alarm })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn session(&self) -> &Arc<SessionManager> {
        self.dispatcher.session()
    }

    /// Authenticate now (normally done lazily by the first request).
    pub async fn authenticate(&self) -> Result<AuthTokens> {
        self.session().ensure_authenticated().await
    }

    /// Forget the current session token; the next call re-authenticates.
    pub async fn invalidate_session(&self) {
        self.session().invalidate().await
    }

    pub async fn session_phase(&self) -> SessionPhase {
        self.session().phase().await
    }

    pub async fn hardware_id(&self) -> String {
        self.session().hardware_id().await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.session().refresh_token().await
    }

    /// Issue an authenticated request.
    pub async fn dispatch(&self, req: &Request) -> Result<ApiResponse> {
        self.dispatcher.dispatch(req).await
    }

    /// Alarm connection registry.
    pub fn alarm(&self) -> &AlarmChannels {
        &self.alarm
    }

    pub async fn send_alarm_command(&self, location_id: &str, command: &AlarmCommand) -> Result<()> {
        self.alarm.send(location_id, command).await
    }

    pub async fn on_alarm_message(
        &self,
        location_id: &str,
        msg_type: &str,
        handler: AlarmHandler,
    ) -> Result<()> {
        self.alarm.on_message(location_id, msg_type, handler).await
    }

    pub async fn close_alarm(&self, location_id: &str) {
        self.alarm.close(location_id).await
    }
}
