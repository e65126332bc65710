// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client library for a cloud video-doorbell and alarm service.
//!
//! [`Client`] owns a session that authenticates lazily (refresh token
//! first, password as fallback), retries requests rejected with 401, and
//! normalizes response bodies into [`ApiValue`] trees. Alarm panels are
//! reached over a per-location WebSocket managed by [`AlarmChannels`].

pub mod alarm;
pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod tls;
pub mod value;

pub use alarm::{AlarmChannels, AlarmCommand, AlarmHandler, AlarmMessage, AlarmMode, AlarmState};
pub use api::{device_id, HistoryQuery};
pub use auth::session::SessionPhase;
pub use auth::AuthTokens;
pub use client::Client;
pub use config::ClientConfig;
pub use dispatch::{ApiResponse, Request};
pub use error::{DoorbotError, Result};
pub use value::ApiValue;
