// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent live-channel registry.
//!
//! Maps each agent to at most one [`LiveChannel`]. Registering replaces any
//! previous channel for the agent; deregistering only removes the channel if
//! it is still the current one, so a late cleanup from a superseded
//! connection cannot evict its successor. The registry performs no I/O.

use dashmap::DashMap;
use kefu_core::AgentId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of handing a frame to an agent's live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveDelivery {
    /// The frame was queued on the agent's connection.
    Delivered,
    /// No channel is registered for the agent.
    Offline,
    /// A channel exists but its outbound queue is full or closed.
    Dropped,
}

impl LiveDelivery {
    pub fn is_delivered(self) -> bool {
        self == Self::Delivered
    }
}

/// Handle to one agent connection's outbound queue.
///
/// Cloning is cheap; every clone addresses the same connection.
#[derive(Debug, Clone)]
pub struct LiveChannel {
    id: Uuid,
    agent_id: AgentId,
    tx: mpsc::Sender<String>,
    closed: CancellationToken,
}

impl LiveChannel {
    /// Creates a channel and the receiving half its transport task drains.
    pub fn new(agent_id: AgentId, buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let channel = Self {
            id: Uuid::new_v4(),
            agent_id,
            tx,
            closed: CancellationToken::new(),
        };
        (channel, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Queues one frame without waiting.
    pub fn try_deliver(&self, frame: String) -> LiveDelivery {
        match self.tx.try_send(frame) {
            Ok(()) => LiveDelivery::Delivered,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(agent_id = %self.agent_id, "live channel full, frame dropped");
                LiveDelivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(agent_id = %self.agent_id, "live channel closed, frame dropped");
                LiveDelivery::Dropped
            }
        }
    }

    /// Signals the owning transport task to close the connection.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled by [`close`](Self::close).
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

/// Owned map from agent identity to its current live channel.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    channels: DashMap<AgentId, LiveChannel>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `channel` the sole live channel of its agent.
    ///
    /// Returns the channel it superseded, if any. The previous channel is
    /// left open; closing it is up to the caller.
    pub fn register(&self, channel: LiveChannel) -> Option<LiveChannel> {
        let agent_id = channel.agent_id;
        let previous = self.channels.insert(agent_id, channel);
        tracing::debug!(
            agent_id = %agent_id,
            superseded = previous.is_some(),
            "live channel registered"
        );
        previous
    }

    /// Returns a handle to the agent's channel. The map lock is released on return.
    pub fn lookup(&self, agent_id: AgentId) -> Option<LiveChannel> {
        self.channels.get(&agent_id).map(|entry| entry.value().clone())
    }

    /// Removes the agent's channel only if it is still `channel_id`.
    ///
    /// Returns `true` when a mapping was removed.
    pub fn deregister(&self, agent_id: AgentId, channel_id: Uuid) -> bool {
        let removed = self
            .channels
            .remove_if(&agent_id, |_, current| current.id == channel_id)
            .is_some();
        if removed {
            tracing::debug!(agent_id = %agent_id, "live channel deregistered");
        }
        removed
    }

    /// Looks up the agent's channel and queues `frame` on it.
    pub fn deliver(&self, agent_id: AgentId, frame: String) -> LiveDelivery {
        match self.lookup(agent_id) {
            Some(channel) => channel.try_deliver(frame),
            None => LiveDelivery::Offline,
        }
    }

    /// Signals every registered channel to close. Mappings are left for each
    /// connection task to remove.
    pub fn close_all(&self) {
        for entry in self.channels.iter() {
            entry.value().close();
        }
    }

    pub fn is_connected(&self, agent_id: AgentId) -> bool {
        self.channels.contains_key(&agent_id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
