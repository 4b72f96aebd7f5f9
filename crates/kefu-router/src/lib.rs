// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing layer of the Kefu relay.
//!
//! [`ConnectionRegistry`] owns the agent live channels and [`MessageRouter`]
//! moves messages between users and agents: persist, deliver live, hand
//! user-bound messages to push.

pub mod conversation;
pub mod registry;
pub mod router;

pub use conversation::{PresenceView, PushStatus};
pub use registry::{ConnectionRegistry, LiveChannel, LiveDelivery};
pub use router::{MessageRouter, UserSendReceipt};
