// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence contracts consumed by the router and the push notifier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::KefuError;
use crate::types::{
    Agent, AgentId, ConversationFilter, Message, MessageId, MiniApp, MiniAppId, NewMessage,
    ReadSide, User, UserId,
};

/// Durable message records.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persists a message and returns it with its id and creation time.
    async fn insert_message(&self, message: NewMessage) -> Result<Message, KefuError>;

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, KefuError>;

    /// Non-deleted messages of a conversation, oldest first.
    async fn list_conversation(
        &self,
        filter: ConversationFilter,
    ) -> Result<Vec<Message>, KefuError>;

    /// Number of messages the user has ever sent, deleted ones included.
    async fn count_sent_by_user(&self, user_id: UserId) -> Result<u64, KefuError>;

    /// Batch-marks the counterpart's unread messages as read by `side`.
    ///
    /// Returns the number of messages that changed.
    async fn mark_conversation_read(
        &self,
        filter: ConversationFilter,
        side: ReadSide,
    ) -> Result<u64, KefuError>;

    /// Marks one agent-sent message as read by the user.
    ///
    /// Returns `false` when the message was sent by the user and left untouched.
    async fn mark_read_by_user(&self, id: MessageId) -> Result<bool, KefuError>;

    /// Sets the soft-delete flag. Returns `false` if no such message exists.
    async fn soft_delete_message(&self, id: MessageId) -> Result<bool, KefuError>;
}

/// End-user identities and their presence/subscription state.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, KefuError>;

    async fn find_user_by_external_id(&self, external_id: &str)
        -> Result<Option<User>, KefuError>;

    /// Returns the user for `external_id`, creating it under `mini_app_id` when absent.
    ///
    /// The flag is `true` when this call created the record.
    async fn find_or_create_user(
        &self,
        external_id: &str,
        mini_app_id: MiniAppId,
    ) -> Result<(User, bool), KefuError>;

    async fn touch_user(&self, id: UserId, at: DateTime<Utc>) -> Result<(), KefuError>;

    async fn set_subscribed(&self, id: UserId, subscribed: bool) -> Result<(), KefuError>;
}

/// Read-only view of mini-applications, agents and their assignment.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn mini_app_by_key(&self, app_key: &str) -> Result<Option<MiniApp>, KefuError>;

    async fn mini_app(&self, id: MiniAppId) -> Result<Option<MiniApp>, KefuError>;

    async fn agent(&self, id: AgentId) -> Result<Option<Agent>, KefuError>;

    /// The single agent assigned to a mini-application, if any.
    async fn assigned_agent(&self, mini_app_id: MiniAppId) -> Result<Option<AgentId>, KefuError>;

    async fn is_assigned(&self, mini_app_id: MiniAppId, agent_id: AgentId)
        -> Result<bool, KefuError>;
}

/// Everything the relay needs from persistence.
pub trait Store: MessageStore + UserStore + Directory {}

impl<T: MessageStore + UserStore + Directory + ?Sized> Store for T {}
