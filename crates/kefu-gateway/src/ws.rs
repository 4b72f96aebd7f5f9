// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent live channel over WebSocket.
//!
//! Agent -> Server (JSON):
//! ```json
//! {"type": "message", "user_id": 3, "content": "Hello", "image_url": null}
//! {"type": "ping"}
//! ```
//!
//! Server -> Agent: one JSON-encoded message record per text frame.
//!
//! Each connection runs a writer task (outbound queue, keep-alive pings) and
//! a reader loop. Any inbound frame counts as activity for the read timeout.
//! The reader exiting stops the writer and deregisters the connection.

use axum::{
    extract::{
        Path, State,
        rejection::PathRejection,
        ws::{
            Message as WsMessage, WebSocket, WebSocketUpgrade,
            rejection::WebSocketUpgradeRejection,
        },
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use kefu_core::{AgentId, KefuError, UserId};
use kefu_router::LiveChannel;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::sync::CancellationToken;

use crate::handlers::ApiError;
use crate::server::{GatewayState, LiveSettings};

/// A frame sent by an agent. The sender is always the connection's agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentFrame {
    Message {
        user_id: UserId,
        content: String,
        #[serde(default)]
        image_url: Option<String>,
    },
    Ping,
}

impl AgentFrame {
    pub fn parse(text: &str) -> Result<Self, KefuError> {
        serde_json::from_str(text).map_err(|e| KefuError::MalformedInput(e.to_string()))
    }
}

/// GET /chat/ws/{agent_id}
///
/// Rejects unknown agents with 404 before upgrading.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    path: Result<Path<i64>, PathRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let agent_id = match path {
        Ok(Path(id)) => AgentId(id),
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    match state.router.store().agent(agent_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ApiError(KefuError::not_found("agent", agent_id)).into_response(),
        Err(e) => return ApiError(e).into_response(),
    }
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, agent_id, state)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Handle one agent connection until it fails, closes, or is superseded.
async fn handle_socket(socket: WebSocket, agent_id: AgentId, state: GatewayState) {
    let live = state.live;
    let (channel, outbound) = LiveChannel::new(agent_id, live.outbound_buffer);
    let channel_id = channel.id();
    let superseded = channel.closed_token();

    if let Some(previous) = state.router.registry().register(channel) {
        previous.close();
        tracing::info!(agent_id = %agent_id, "previous live connection superseded");
    }
    tracing::info!(agent_id = %agent_id, "agent connected");

    let (sink, mut stream) = socket.split();
    let stop_writer = superseded.child_token();
    let writer = tokio::spawn(write_loop(sink, outbound, live, stop_writer.clone()));

    loop {
        let next = tokio::select! {
            _ = superseded.cancelled() => break,
            next = timeout(live.read_timeout, stream.next()) => next,
        };
        let msg = match next {
            Err(_) => {
                tracing::info!(agent_id = %agent_id, "live connection read timeout");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(agent_id = %agent_id, error = %e, "live connection read failed");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };
        match msg {
            WsMessage::Text(text) => handle_frame(&state, agent_id, text.as_str()).await,
            WsMessage::Close(_) => break,
            // Pong and ping only refresh the read deadline.
            _ => {}
        }
    }

    state.router.registry().deregister(agent_id, channel_id);
    stop_writer.cancel();
    if let Err(e) = writer.await {
        tracing::warn!(agent_id = %agent_id, error = %e, "live writer task failed");
    }
    tracing::info!(agent_id = %agent_id, "agent disconnected");
}

async fn handle_frame(state: &GatewayState, agent_id: AgentId, text: &str) {
    let frame = match AgentFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(agent_id = %agent_id, error = %e, "dropping live frame");
            return;
        }
    };
    match frame {
        AgentFrame::Message {
            user_id,
            content,
            image_url,
        } => {
            if let Err(e) = state
                .router
                .route_agent_message(agent_id, user_id, &content, image_url)
                .await
            {
                tracing::warn!(
                    agent_id = %agent_id,
                    user_id = %user_id,
                    error = %e,
                    "live message rejected"
                );
            }
        }
        AgentFrame::Ping => {}
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut outbound: mpsc::Receiver<String>,
    live: LiveSettings,
    stop: CancellationToken,
) {
    let mut ping = interval_at(Instant::now() + live.ping_interval, live.ping_interval);
    loop {
        let msg = tokio::select! {
            _ = stop.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(text) => WsMessage::Text(text.into()),
                None => break,
            },
            _ = ping.tick() => WsMessage::Ping(Vec::new().into()),
        };
        match timeout(live.write_timeout, sink.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "live connection write failed");
                return;
            }
            Err(_) => {
                tracing::info!("live connection write timeout");
                return;
            }
        }
    }
    let _ = timeout(live.write_timeout, sink.send(WsMessage::Close(None))).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_frame_parses() {
        let frame = AgentFrame::parse(r#"{"type": "message", "user_id": 3, "content": "hi"}"#).unwrap();
        assert_eq!(
            frame,
            AgentFrame::Message {
                user_id: UserId(3),
                content: "hi".into(),
                image_url: None,
            }
        );
    }

    #[test]
    fn image_frame_parses() {
        let json = r#"{"type": "message", "user_id": 3, "content": "", "image_url": "https://x/a.png"}"#;
        let AgentFrame::Message { image_url, .. } = AgentFrame::parse(json).unwrap() else {
            panic!("expected message frame");
        };
        assert_eq!(image_url.as_deref(), Some("https://x/a.png"));
    }

    #[test]
    fn ping_frame_parses() {
        assert_eq!(AgentFrame::parse(r#"{"type": "ping"}"#).unwrap(), AgentFrame::Ping);
    }

    #[test]
    fn malformed_frames_are_rejected() {
        for text in [
            "not json",
            r#"{"content": "no tag"}"#,
            r#"{"type": "message", "content": "missing user"}"#,
            r#"{"type": "message", "user_id": "three", "content": "x"}"#,
            r#"{"type": "shout"}"#,
        ] {
            let err = AgentFrame::parse(text).unwrap_err();
            assert!(matches!(err, KefuError::MalformedInput(_)), "{text}");
        }
    }
}
