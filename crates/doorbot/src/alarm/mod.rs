// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time alarm channel: one WebSocket per location, inbound messages
//! routed to handlers by their `msg` type.
//!
//! Connections are opened lazily on first use and live until [`AlarmChannels::close`].
//! There is no automatic reconnection; a socket the provider drops stays
//! registered until closed.
//!
//! Replies are matched to commands by message type only, not by `seq`. A
//! stale reply of the same type can satisfy a newer command.

pub mod message;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, Request};
use crate::error::{DoorbotError, Result};

pub use message::{AlarmCommand, AlarmMessage, AlarmMode, ConnectionCoordinates};

/// Callback for inbound alarm messages of one type.
pub type AlarmHandler = Arc<dyn Fn(&AlarmMessage) + Send + Sync>;

type HandlerMap = Arc<RwLock<HashMap<String, AlarmHandler>>>;
type ConnectionSlot = Arc<OnceCell<Arc<AlarmConnection>>>;

/// Connection state of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Disconnected,
    Connecting,
    Connected,
}

/// Live socket for one location.
struct AlarmConnection {
    location_id: String,
    outbound: mpsc::UnboundedSender<Message>,
    handlers: HandlerMap,
    cancel: CancellationToken,
}

impl AlarmConnection {
    fn push(&self, frame: Message) -> Result<()> {
        self.outbound.send(frame).map_err(|_| {
            DoorbotError::Alarm(format!("connection for {} is closed", self.location_id))
        })
    }
}

impl Drop for AlarmConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Registry of per-location alarm connections.
pub struct AlarmChannels {
    dispatcher: Arc<Dispatcher>,
    config: Arc<ClientConfig>,
    connections: Mutex<HashMap<String, ConnectionSlot>>,
    seq: AtomicU64,
}

impl AlarmChannels {
    pub fn new(dispatcher: Arc<Dispatcher>, config: Arc<ClientConfig>) -> Self {
        Self { dispatcher, config, connections: Mutex::new(HashMap::new()), seq: AtomicU64::new(1) }
    }

    /// Next sequence number for outbound commands.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn state(&self, location_id: &str) -> AlarmState {
        match self.connections.lock().await.get(location_id) {
            None => AlarmState::Disconnected,
            Some(slot) if slot.initialized() => AlarmState::Connected,
            Some(_) => AlarmState::Connecting,
        }
    }

    /// Return the location's connection, opening it if absent.
    ///
    /// An existing connection is returned without checking liveness.
    /// Concurrent callers share a single connection attempt.
    async fn ensure_connection(&self, location_id: &str) -> Result<Arc<AlarmConnection>> {
        let slot = {
            let mut map = self.connections.lock().await;
            Arc::clone(map.entry(location_id.to_owned()).or_default())
        };

        match slot.get_or_try_init(|| self.connect(location_id)).await {
            Ok(conn) => Ok(Arc::clone(conn)),
            Err(e) => {
                let mut map = self.connections.lock().await;
                if map.get(location_id).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                    map.remove(location_id);
                }
                Err(e)
            }
        }
    }

    async fn connect(&self, location_id: &str) -> Result<Arc<AlarmConnection>> {
        let req = Request::post(format!("{}/rs/connections", self.config.app_api_root))
            .json(json!({ "accountId": location_id }));
        let resp = self.dispatcher.dispatch(&req).await?;
        let coords = ConnectionCoordinates::decode(&resp.body)?;

        tracing::info!(location = %location_id, server = %coords.server, "opening alarm connection");
        let (ws, _) = tokio_tungstenite::connect_async(coords.socket_url()).await?;
        let (mut write, read) = ws.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let handlers: HandlerMap = Arc::new(RwLock::new(HashMap::new()));
        let cancel = CancellationToken::new();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if write.send(frame).await.is_err() || closing {
                    break;
                }
            }
        });

        tokio::spawn(route_inbound(
            location_id.to_owned(),
            read,
            Arc::clone(&handlers),
            cancel.clone(),
        ));

        tracing::info!(location = %location_id, "alarm connection open");
        Ok(Arc::new(AlarmConnection {
            location_id: location_id.to_owned(),
            outbound,
            handlers,
            cancel,
        }))
    }

    /// Register the handler for `msg_type`, replacing any previous one.
    ///
    /// Opens the connection first if needed.
    pub async fn on_message(
        &self,
        location_id: &str,
        msg_type: &str,
        handler: AlarmHandler,
    ) -> Result<()> {
        let conn = self.ensure_connection(location_id).await?;
        conn.handlers.write().await.insert(msg_type.to_owned(), handler);
        Ok(())
    }

    /// Send a command, opening the connection first if needed.
    pub async fn send(&self, location_id: &str, command: &AlarmCommand) -> Result<()> {
        let conn = self.ensure_connection(location_id).await?;
        let text = serde_json::to_string(command)
            .map_err(|e| DoorbotError::Alarm(format!("encode {}: {e}", command.msg)))?;
        tracing::debug!(location = %location_id, msg = %command.msg, seq = command.seq, "alarm send");
        conn.push(Message::Text(text.into()))
    }

    /// Send `command` and wait for the first message of type `reply_type`.
    ///
    /// Correlation is by type only; see the module docs.
    pub async fn request(
        &self,
        location_id: &str,
        reply_type: &str,
        command: &AlarmCommand,
    ) -> Result<AlarmMessage> {
        let (tx, rx) = oneshot::channel();
        let slot = std::sync::Mutex::new(Some(tx));
        let handler: AlarmHandler = Arc::new(move |msg: &AlarmMessage| {
            if let Some(tx) = slot.lock().ok().and_then(|mut s| s.take()) {
                let _ = tx.send(msg.clone());
            }
        });
        self.on_message(location_id, reply_type, handler).await?;
        self.send(location_id, command).await?;

        let wait = self.config.alarm_reply_timeout();
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => Err(DoorbotError::Alarm(format!(
                "connection for {location_id} went away before a {reply_type} reply"
            ))),
            Err(_) => Err(DoorbotError::Alarm(format!("no {reply_type} reply within {wait:?}"))),
        }
    }

    /// List the alarm devices at a location.
    pub async fn devices(&self, location_id: &str) -> Result<AlarmMessage> {
        let cmd = AlarmCommand::new(message::DEVICE_LIST, self.next_seq());
        self.request(location_id, message::DEVICE_LIST, &cmd).await
    }

    /// Change the arming mode of a panel.
    pub async fn set_mode(
        &self,
        location_id: &str,
        panel_zid: &str,
        mode: AlarmMode,
        bypass: &[String],
    ) -> Result<AlarmMessage> {
        if panel_zid.is_empty() {
            return Err(DoorbotError::validation("alarm panel zid is required"));
        }
        let cmd = AlarmCommand::new(message::DEVICE_SET, self.next_seq())
            .datatype("DeviceInfoSetType")
            .body(message::mode_body(panel_zid, mode, bypass));
        self.request(location_id, message::DEVICE_SET, &cmd).await
    }

    /// Send a termination notice and tear the connection down.
    ///
    /// The next use of the location opens a fresh connection.
    pub async fn close(&self, location_id: &str) {
        let slot = self.connections.lock().await.remove(location_id);
        let Some(conn) = slot.and_then(|s| s.get().cloned()) else {
            return;
        };
        if conn.push(Message::Close(None)).is_err() {
            tracing::debug!(location = %location_id, "alarm socket already gone");
        }
        conn.cancel.cancel();
        tracing::info!(location = %location_id, "alarm connection closed");
    }

    /// Close every open connection.
    pub async fn close_all(&self) {
        let locations: Vec<String> = self.connections.lock().await.keys().cloned().collect();
        for location in locations {
            self.close(&location).await;
        }
    }
}

/// Inbound router: hand each message to the handler for its `msg` type.
async fn route_inbound<S>(location_id: String, mut read: S, handlers: HandlerMap, cancel: CancellationToken)
where
    S: Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Some(msg) = message::parse_inbound(&text) else {
                            tracing::debug!(location = %location_id, "dropping unparseable alarm frame");
                            continue;
                        };
                        let handler = handlers.read().await.get(&msg.msg).cloned();
                        match handler {
                            Some(handler) => handler(&msg),
                            None => {
                                tracing::debug!(location = %location_id, msg = %msg.msg, "no handler, dropping");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(location = %location_id, "alarm socket closed by provider");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(location = %location_id, err = %e, "alarm socket error");
                        break;
                    }
                    _ => {} // ping/pong/binary ignored
                }
            }
        }
    }
}
