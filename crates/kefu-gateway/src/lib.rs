// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Kefu relay.
//!
//! Agents hold one WebSocket live channel each; end users and agent
//! consoles reach the [`kefu_router::MessageRouter`] through JSON endpoints.

pub mod handlers;
pub mod server;
pub mod ws;

pub use handlers::{ApiError, status_for};
pub use server::{GatewayState, LiveSettings, ServerConfig, build_router, serve, start_server};
pub use ws::AgentFrame;
