// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint wrappers. Each one validates its input before touching the
//! network, then maps onto a single [`Request`].

use serde_json::json;

use crate::alarm::{AlarmMessage, AlarmMode};
use crate::client::Client;
use crate::dispatch::Request;
use crate::error::{DoorbotError, Result};
use crate::value::ApiValue;

/// Paging parameters for the event history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    /// Return events older than this event id.
    pub older_than: Option<String>,
}

impl HistoryQuery {
    pub fn limit(limit: u32) -> Self {
        Self { limit: Some(limit), older_than: None }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(DoorbotError::validation("history limit must be positive"));
        }
        if let Some(ref cursor) = self.older_than {
            if !is_numeric_id(cursor) {
                return Err(DoorbotError::validation(format!(
                    "older_than must be a numeric event id, got {cursor:?}"
                )));
            }
        }
        Ok(())
    }

    fn to_request(&self) -> Request {
        let mut req = Request::get("/doorbots/history");
        if let Some(limit) = self.limit {
            req = req.query("limit", limit);
        }
        if let Some(ref cursor) = self.older_than {
            req = req.query("older_than", cursor);
        }
        req
    }
}

/// Extract the `id` of a device record.
pub fn device_id(device: &ApiValue) -> Result<String> {
    if !device.is_object() {
        return Err(DoorbotError::validation("device must be an object"));
    }
    match device.get("id") {
        Some(ApiValue::Number(n)) => Ok(n.to_string()),
        Some(ApiValue::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(DoorbotError::validation("device is missing id")),
    }
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl Client {
    /// `GET /ring_devices`
    pub async fn devices(&self) -> Result<ApiValue> {
        Ok(self.dispatch(&Request::get("/ring_devices")).await?.body)
    }

    /// `GET /doorbots/history`
    pub async fn history(&self, query: &HistoryQuery) -> Result<ApiValue> {
        query.validate()?;
        Ok(self.dispatch(&query.to_request()).await?.body)
    }

    /// `GET /dings/active`
    pub async fn dings(&self) -> Result<ApiValue> {
        Ok(self.dispatch(&Request::get("/dings/active")).await?.body)
    }

    /// Resolve the download URL of a recorded event.
    pub async fn recording(&self, event_id: &str) -> Result<String> {
        if !is_numeric_id(event_id) {
            return Err(DoorbotError::validation(format!(
                "recording id must be numeric, got {event_id:?}"
            )));
        }
        let req = Request::get(format!("/dings/{event_id}/recording"))
            .query("disable_redirect", true);
        let resp = self.dispatch(&req).await?;
        resp.body["url"]
            .as_str()
            .map(str::to_owned)
            .or(resp.location)
            .ok_or_else(|| DoorbotError::Transport {
                status: Some(resp.status),
                message: format!("no recording url for event {event_id}"),
            })
    }

    pub async fn light_on(&self, device: &ApiValue) -> Result<ApiValue> {
        let id = device_id(device)?;
        self.put(format!("/doorbots/{id}/floodlight_light_on")).await
    }

    pub async fn light_off(&self, device: &ApiValue) -> Result<ApiValue> {
        let id = device_id(device)?;
        self.put(format!("/doorbots/{id}/floodlight_light_off")).await
    }

    /// Flip the floodlight based on the device's `led_status`.
    pub async fn light_toggle(&self, device: &ApiValue) -> Result<ApiValue> {
        if device["led_status"].as_str() == Some("on") {
            self.light_off(device).await
        } else {
            self.light_on(device).await
        }
    }

    pub async fn siren_on(&self, device: &ApiValue, duration_secs: u32) -> Result<ApiValue> {
        let id = device_id(device)?;
        if duration_secs == 0 {
            return Err(DoorbotError::validation("siren duration must be positive"));
        }
        let req = Request::put(format!("/doorbots/{id}/siren_on")).query("duration", duration_secs);
        Ok(self.dispatch(&req).await?.body)
    }

    pub async fn siren_off(&self, device: &ApiValue) -> Result<ApiValue> {
        let id = device_id(device)?;
        self.put(format!("/doorbots/{id}/siren_off")).await
    }

    /// Silence a chime for `minutes`; zero clears do-not-disturb.
    pub async fn set_chime_dnd(&self, device: &ApiValue, minutes: u32) -> Result<ApiValue> {
        let id = device_id(device)?;
        let req = Request::post(format!("/chimes/{id}/do_not_disturb")).json(json!({ "time": minutes }));
        Ok(self.dispatch(&req).await?.body)
    }

    /// Snooze motion alerts of a doorbell for `minutes`.
    pub async fn set_doorbot_dnd(&self, device: &ApiValue, minutes: u32) -> Result<ApiValue> {
        let id = device_id(device)?;
        if minutes == 0 {
            return Err(DoorbotError::validation("snooze duration must be positive"));
        }
        let req = Request::post(format!("/doorbots/{id}/motion_snooze")).json(json!({ "time": minutes }));
        Ok(self.dispatch(&req).await?.body)
    }

    /// Start a live view.
    pub async fn vod(&self, device: &ApiValue) -> Result<ApiValue> {
        let id = device_id(device)?;
        Ok(self.dispatch(&Request::post(format!("/doorbots/{id}/vod"))).await?.body)
    }

    pub async fn health(&self, device: &ApiValue) -> Result<ApiValue> {
        let id = device_id(device)?;
        Ok(self.dispatch(&Request::get(format!("/doorbots/{id}/health"))).await?.body)
    }

    pub async fn alarm_devices(&self, location_id: &str) -> Result<AlarmMessage> {
        require_location(location_id)?;
        self.alarm().devices(location_id).await
    }

    pub async fn set_alarm_mode(
        &self,
        location_id: &str,
        panel_zid: &str,
        mode: AlarmMode,
        bypass: &[String],
    ) -> Result<AlarmMessage> {
        require_location(location_id)?;
        self.alarm().set_mode(location_id, panel_zid, mode, bypass).await
    }

    async fn put(&self, path: String) -> Result<ApiValue> {
        Ok(self.dispatch(&Request::put(path)).await?.body)
    }
}

fn require_location(location_id: &str) -> Result<()> {
    if location_id.is_empty() {
        return Err(DoorbotError::validation("location id is required"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
