// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DoorbotError, Result};

pub const DEFAULT_API_ROOT: &str = "https://api.ring.com/clients_api";
pub const DEFAULT_OAUTH_URL: &str = "https://oauth.ring.com/oauth/token";
pub const DEFAULT_APP_API_ROOT: &str = "https://app.ring.com/api/v1";
pub const DEFAULT_CLIENT_ID: &str = "ring_official_android";
pub const DEFAULT_API_VERSION: u32 = 11;

/// Configuration for a doorbot client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Account email used for the password grant.
    #[arg(long, alias = "username", env = "DOORBOT_EMAIL")]
    pub email: Option<String>,

    /// Account password used for the password grant.
    #[arg(long, env = "DOORBOT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Refresh token to try before falling back to the password grant.
    #[arg(long, env = "DOORBOT_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Directory holding the token cache file. Caching is off when unset.
    #[arg(long, env = "DOORBOT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// REST API root.
    #[arg(long, default_value = DEFAULT_API_ROOT, env = "DOORBOT_API_ROOT")]
    pub api_root: String,

    /// OAuth token endpoint.
    #[arg(long, default_value = DEFAULT_OAUTH_URL, env = "DOORBOT_OAUTH_URL")]
    pub oauth_url: String,

    /// Root of the app API used to bootstrap alarm connections.
    #[arg(long, default_value = DEFAULT_APP_API_ROOT, env = "DOORBOT_APP_API_ROOT")]
    pub app_api_root: String,

    /// API version sent with every request.
    #[arg(long, default_value_t = DEFAULT_API_VERSION, env = "DOORBOT_API_VERSION")]
    pub api_version: u32,

    /// OAuth client identifier.
    #[arg(long, default_value = DEFAULT_CLIENT_ID, env = "DOORBOT_CLIENT_ID")]
    pub client_id: String,

    /// Per-request deadline in milliseconds.
    #[arg(long, default_value_t = 300_000, env = "DOORBOT_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// How many times a 401 triggers re-authentication and a retry.
    #[arg(long, default_value_t = 0, env = "DOORBOT_RETRIES")]
    pub retries: u32,

    /// Wait between invalidating the session and re-authenticating, in milliseconds.
    #[arg(long, default_value_t = 500, env = "DOORBOT_RETRY_BACKOFF_MS")]
    pub retry_backoff_ms: u64,

    /// Pause after a new session token before releasing callers, in milliseconds.
    #[arg(long, default_value_t = 1500, env = "DOORBOT_SETTLE_MS")]
    pub settle_ms: u64,

    /// Wait bound for alarm command replies in milliseconds.
    #[arg(long, default_value_t = 30_000, env = "DOORBOT_ALARM_REPLY_TIMEOUT_MS")]
    pub alarm_reply_timeout_ms: u64,

    /// User agent sent with every HTTP request.
    #[arg(long, default_value = concat!("doorbot-rs/", env!("CARGO_PKG_VERSION")), env = "DOORBOT_USER_AGENT")]
    pub user_agent: String,
}

impl ClientConfig {
    /// Config with defaults and no credentials.
    pub fn new() -> Self {
        Self {
            email: None,
            password: None,
            refresh_token: None,
            cache_dir: None,
            api_root: DEFAULT_API_ROOT.to_owned(),
            oauth_url: DEFAULT_OAUTH_URL.to_owned(),
            app_api_root: DEFAULT_APP_API_ROOT.to_owned(),
            api_version: DEFAULT_API_VERSION,
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            timeout_ms: 300_000,
            retries: 0,
            retry_backoff_ms: 500,
            settle_ms: 1500,
            alarm_reply_timeout_ms: 30_000,
            user_agent: concat!("doorbot-rs/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    pub fn with_password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: Some(email.into()), password: Some(password.into()), ..Self::new() }
    }

    pub fn with_refresh_token(token: impl Into<String>) -> Self {
        Self { refresh_token: Some(token.into()), ..Self::new() }
    }

    /// Reject configs that cannot authenticate.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_token.as_deref().is_some_and(|t| !t.is_empty()) {
            return Ok(());
        }
        if self.email.as_deref().is_none_or(str::is_empty) {
            return Err(DoorbotError::validation("username is required"));
        }
        if self.password.as_deref().is_none_or(str::is_empty) {
            return Err(DoorbotError::validation("password is required"));
        }
        Ok(())
    }

    /// Point every endpoint at one base URL (used against fake providers).
    pub fn base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.api_root = format!("{base}/clients_api");
        self.oauth_url = format!("{base}/oauth/token");
        self.app_api_root = format!("{base}/api/v1");
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = ms;
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    pub fn alarm_reply_timeout_ms(mut self, ms: u64) -> Self {
        self.alarm_reply_timeout_ms = ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn alarm_reply_timeout(&self) -> Duration {
        Duration::from_millis(self.alarm_reply_timeout_ms)
    }

    /// Path of the token cache file, if caching is enabled.
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(crate::cache::CACHE_FILE_NAME))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
