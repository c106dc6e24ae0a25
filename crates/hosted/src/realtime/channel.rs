//! One realtime channel per live query.
//!
//! The channel joins a unique topic with a `postgres_changes` filter,
//! keeps the socket alive with heartbeats, forwards refreshed access
//! tokens, and turns change frames into [`ChangeEvent`]s on a bus. It
//! never reconnects: when the socket ends, the bus is dropped and the
//! feed built on it ends too.
//!
//! [`ChangeEvent`]: notesync_events::ChangeEvent

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use notesync_core::query::CollectionQuery;
use notesync_events::ChangeBus;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::messages::{
    access_token_frame, heartbeat_frame, join_frame, leave_frame, parse_message, ChannelMessage,
    PhoenixFrame,
};
use crate::api::{HostedApi, HostedError};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// The service drops sockets that stay silent for about a minute.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RealtimeChannel {
    topic: String,
    ws: WsStream,
    next_ref: u64,
}

impl RealtimeChannel {
    /// Open a socket and join a channel for `query`.
    ///
    /// Fails when the socket cannot be opened, the join is refused, or no
    /// reply arrives in time.
    pub async fn join(api: &HostedApi, query: &CollectionQuery) -> Result<Self, HostedError> {
        let url = api.config().realtime_url();
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| HostedError::Realtime(format!("Failed to connect: {e}")))?;

        let mut channel = Self {
            topic: format!("realtime:notesync-{}", uuid::Uuid::new_v4()),
            ws,
            next_ref: 0,
        };

        let token = api
            .tokens()
            .access_token()
            .unwrap_or_else(|| api.config().anon_key.clone());
        let join_ref = channel.next_ref();
        let frame = join_frame(&channel.topic, query, &token, join_ref.clone());
        channel.send(&frame).await?;

        tokio::time::timeout(JOIN_TIMEOUT, channel.await_reply(&join_ref))
            .await
            .map_err(|_| HostedError::Realtime("Join timed out".into()))??;

        tracing::debug!(topic = %channel.topic, collection = %query.collection, "Realtime channel joined");
        Ok(channel)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn next_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }

    async fn send(&mut self, frame: &PhoenixFrame) -> Result<(), HostedError> {
        self.ws
            .send(Message::Text(frame.to_text()))
            .await
            .map_err(|e| HostedError::Realtime(format!("Send failed: {e}")))
    }

    async fn await_reply(&mut self, expected_ref: &str) -> Result<(), HostedError> {
        while let Some(msg_result) = self.ws.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match parse_message(&text) {
                    Ok((_, ChannelMessage::Reply { msg_ref, payload }))
                        if msg_ref.as_deref() == Some(expected_ref) =>
                    {
                        if payload.is_ok() {
                            return Ok(());
                        }
                        return Err(HostedError::Realtime(format!(
                            "Join refused: {}",
                            payload.response
                        )));
                    }
                    Ok((_, ChannelMessage::Error | ChannelMessage::Close)) => {
                        return Err(HostedError::Realtime("Channel closed during join".into()));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, raw_message = %text, "Failed to parse realtime frame");
                    }
                },
                Ok(Message::Close(frame)) => {
                    return Err(HostedError::Realtime(format!("Socket closed during join: {frame:?}")));
                }
                Ok(_) => {}
                Err(e) => return Err(HostedError::Realtime(e.to_string())),
            }
        }
        Err(HostedError::Realtime("Socket ended during join".into()))
    }

    /// Forward change events onto `bus` until `cancel` fires or the socket
    /// ends. On cancel the channel is left politely.
    pub async fn run(mut self, api: HostedApi, bus: ChangeBus, cancel: CancellationToken) {
        let mut tokens = api.tokens().watch();
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.leave().await;
                    break;
                }
                _ = heartbeat.tick() => {
                    let msg_ref = self.next_ref();
                    if let Err(e) = self.send(&heartbeat_frame(msg_ref)).await {
                        tracing::warn!(topic = %self.topic, error = %e, "Heartbeat failed");
                        break;
                    }
                }
                changed = tokens.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let token = tokens.borrow_and_update().as_ref().map(|t| t.access_token.clone());
                    if let Some(token) = token {
                        let msg_ref = self.next_ref();
                        let frame = access_token_frame(&self.topic, &token, msg_ref);
                        if let Err(e) = self.send(&frame).await {
                            tracing::warn!(topic = %self.topic, error = %e, "Failed to forward access token");
                            break;
                        }
                    }
                }
                msg_result = self.ws.next() => match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        if !self.handle_text(&text, &bus) {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::trace!(topic = %self.topic, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(topic = %self.topic, ?frame, "Realtime socket closed");
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        tracing::warn!(topic = %self.topic, error = %e, "Realtime receive error");
                        break;
                    }
                    None => {
                        tracing::info!(topic = %self.topic, "Realtime socket ended");
                        break;
                    }
                },
            }
        }
    }

    /// Handle one text frame. Returns `false` when the channel is gone.
    fn handle_text(&self, text: &str, bus: &ChangeBus) -> bool {
        match parse_message(text) {
            Ok((_, ChannelMessage::PostgresChanges(data))) => match data.to_event() {
                Some(event) => {
                    tracing::trace!(
                        topic = %self.topic,
                        collection = %event.collection,
                        doc_id = %event.doc_id,
                        "Row change received",
                    );
                    bus.publish(event);
                }
                None => {
                    tracing::debug!(table = %data.table, kind = %data.kind, "Ignoring change of unknown table");
                }
            },
            Ok((_, ChannelMessage::System(payload))) => {
                tracing::debug!(topic = %self.topic, status = %payload.status, message = %payload.message, "Realtime system notice");
            }
            Ok((_, ChannelMessage::Reply { payload, .. })) => {
                if !payload.is_ok() {
                    tracing::warn!(topic = %self.topic, response = %payload.response, "Realtime request refused");
                }
            }
            Ok((_, ChannelMessage::Error | ChannelMessage::Close)) => {
                tracing::warn!(topic = %self.topic, "Realtime channel closed by server");
                return false;
            }
            Ok((_, ChannelMessage::Other(event))) => {
                tracing::trace!(topic = %self.topic, event = %event, "Ignoring realtime event");
            }
            Err(e) => {
                tracing::warn!(topic = %self.topic, error = %e, raw_message = %text, "Failed to parse realtime frame");
            }
        }
        true
    }

    async fn leave(&mut self) {
        let msg_ref = self.next_ref();
        let frame = leave_frame(&self.topic, msg_ref);
        if let Err(e) = self.send(&frame).await {
            tracing::debug!(topic = %self.topic, error = %e, "Leave not delivered");
        }
        let _ = self.ws.close(None).await;
        tracing::debug!(topic = %self.topic, "Realtime channel left");
    }
}
