// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kefu customer-service message relay.
//!
//! Provides the domain types shared by every crate in the workspace, the
//! error taxonomy, the presence verdict, and the trait seams behind which
//! storage and the push provider live.

pub mod error;
pub mod presence;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, KefuError};
pub use presence::{Presence, PresenceTracker};
pub use traits::{Adapter, Directory, MessageStore, PushDispatch, PushProvider, Store, UserStore};
pub use types::{
    AdapterType, Agent, AgentId, HealthStatus, Message, MessageId, MiniApp, MiniAppId, NewMessage,
    PushJob, PushPayload, SenderRole, User, UserId,
};
