// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alarm channel wire types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DoorbotError, Result};
use crate::value::ApiValue;

/// Device list request; the provider replies under the same name.
pub const DEVICE_LIST: &str = "DeviceInfoDocGetList";
/// Device mutation request; the provider replies under the same name.
pub const DEVICE_SET: &str = "DeviceInfoSet";

/// Outbound alarm command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmCommand {
    pub msg: String,
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

impl AlarmCommand {
    pub fn new(msg: impl Into<String>, seq: u64) -> Self {
        Self { msg: msg.into(), seq, datatype: None, body: Value::Null }
    }

    pub fn datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// Inbound alarm message, routed by its `msg` field.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmMessage {
    pub msg: String,
    /// The whole message as received.
    pub raw: ApiValue,
}

impl AlarmMessage {
    pub fn body(&self) -> &ApiValue {
        &self.raw["body"]
    }

    pub fn seq(&self) -> Option<i64> {
        self.raw["seq"].as_i64()
    }
}

/// Parse a text frame. Returns `None` for non-JSON or a missing `msg`.
pub fn parse_inbound(text: &str) -> Option<AlarmMessage> {
    let json: Value = serde_json::from_str(text).ok()?;
    let msg = json.get("msg")?.as_str()?.to_owned();
    Some(AlarmMessage { msg, raw: ApiValue::from(json) })
}

/// Arming mode of an alarm panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmMode {
    /// Away: every sensor armed.
    All,
    /// Home: perimeter sensors armed.
    Some,
    /// Disarmed.
    None,
}

impl AlarmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Some => "some",
            Self::None => "none",
        }
    }
}

impl fmt::Display for AlarmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlarmMode {
    type Err = DoorbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" | "away" => Ok(Self::All),
            "some" | "home" => Ok(Self::Some),
            "none" | "off" | "disarmed" => Ok(Self::None),
            other => Err(DoorbotError::validation(format!("invalid alarm mode: {other}"))),
        }
    }
}

/// Socket coordinates returned by the connection bootstrap call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCoordinates {
    pub server: String,
    pub auth_code: String,
}

impl ConnectionCoordinates {
    pub fn decode(body: &ApiValue) -> Result<Self> {
        let field = |name: &str| {
            body[name]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| DoorbotError::Alarm(format!("connection bootstrap missing {name}")))
        };
        Ok(Self { server: field("server")?, auth_code: field("authCode")? })
    }

    /// Socket URL: `wss://<server>/?authcode=<code>`.
    ///
    /// A server that already carries a scheme is used as-is.
    pub fn socket_url(&self) -> String {
        let base = if self.server.contains("://") {
            self.server.trim_end_matches('/').to_owned()
        } else {
            format!("wss://{}", self.server.trim_end_matches('/'))
        };
        format!("{base}/?authcode={}", self.auth_code)
    }
}

/// Body of a panel mode change.
pub fn mode_body(panel_zid: &str, mode: AlarmMode, bypass: &[String]) -> Value {
    serde_json::json!([{
        "zid": panel_zid,
        "v": { "mode": mode.as_str(), "bypass": bypass },
    }])
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
