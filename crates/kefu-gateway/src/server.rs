// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::time::{Duration, Instant};

use axum::{
    Router,
    routing::{delete, get, post},
};
use kefu_core::KefuError;
use kefu_router::MessageRouter;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::ws;

/// Timing and buffering of agent live connections.
#[derive(Debug, Clone, Copy)]
pub struct LiveSettings {
    /// Interval between keep-alive pings.
    pub ping_interval: Duration,
    /// Silence after which a connection is considered dead.
    pub read_timeout: Duration,
    /// Upper bound for a single frame write.
    pub write_timeout: Duration,
    /// Outbound frames queued per connection before new ones are dropped.
    pub outbound_buffer: usize,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            outbound_buffer: 64,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub router: MessageRouter,
    pub live: LiveSettings,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(router: MessageRouter, live: LiveSettings) -> Self {
        Self {
            router,
            live,
            start_time: Instant::now(),
        }
    }
}

/// Gateway server configuration (mirrors `ServerConfig` from kefu-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the application router with every `/chat` route and `/health`.
pub fn build_router(state: GatewayState) -> Router {
    let chat = Router::new()
        .route("/ws/{agent_id}", get(ws::ws_handler))
        .route("/send", post(handlers::post_user_message))
        .route("/cs/send", post(handlers::post_agent_message))
        .route("/heartbeat", post(handlers::post_heartbeat))
        .route("/subscribe", post(handlers::post_subscribe))
        .route("/history", get(handlers::get_user_history))
        .route(
            "/cs/{agent_id}/user/{user_id}/messages",
            get(handlers::get_agent_history),
        )
        .route(
            "/cs/{agent_id}/user/{user_id}/presence",
            get(handlers::get_presence),
        )
        .route(
            "/cs/{agent_id}/user/{user_id}/push",
            post(handlers::post_reminder),
        )
        .route(
            "/cs/{agent_id}/user/{user_id}/push-status",
            get(handlers::get_push_status),
        )
        .route("/message/{id}", delete(handlers::delete_message))
        .route("/message/{id}/read", post(handlers::post_message_read));

    Router::new()
        .route("/health", get(handlers::get_health))
        .nest("/chat", chat)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds to the configured host:port and serves until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), KefuError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| KefuError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");
    serve(listener, state, shutdown).await
}

/// Serves on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), KefuError> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| KefuError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}
