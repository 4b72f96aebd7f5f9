// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across components of the Kefu relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Stable identity of an end user.
    UserId
);
numeric_id!(
    /// Stable identity of a customer-service agent. Also the connection registry key.
    AgentId
);
numeric_id!(
    /// Identity of a mini-application record.
    MiniAppId
);
numeric_id!(
    /// Identity of a persisted message.
    MessageId
);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    PushProvider,
}

/// Which side of a conversation sent a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SenderRole {
    User,
    Agent,
}

impl SenderRole {
    /// The other side of the conversation.
    pub fn counterpart(self) -> Self {
        match self {
            Self::User => Self::Agent,
            Self::Agent => Self::User,
        }
    }
}

// --- Directory types ---

/// A third-party mini-application and its push configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct MiniApp {
    pub id: MiniAppId,
    pub name: String,
    /// Public application key clients identify themselves with.
    pub app_key: String,
    #[serde(skip_serializing)]
    pub secret: String,
    /// Push template identifier; `None` disables push for this app.
    pub template_id: Option<String>,
}

impl std::fmt::Debug for MiniApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniApp")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("app_key", &self.app_key)
            .field("secret", &"[redacted]")
            .field("template_id", &self.template_id)
            .finish()
    }
}

/// A customer-service agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    /// Sent automatically on a user's first contact when set.
    pub welcome_message: Option<String>,
}

/// An end user bound to one mini-application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Opaque identity issued by the mini-application platform.
    pub external_id: String,
    pub mini_app_id: MiniAppId,
    /// Eligible for push delivery.
    pub subscribed: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// --- Message types ---

/// A persisted conversation message.
///
/// Sender and recipient ids never change after creation; only the read and
/// deleted flags do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub sender: SenderRole,
    pub content: String,
    pub image_url: Option<String>,
    pub read_by_agent: bool,
    pub read_by_user: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// An image message is one with a non-empty image reference, whatever the text says.
    pub fn is_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// A message about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub sender: SenderRole,
    pub content: String,
    pub image_url: Option<String>,
}

impl NewMessage {
    /// A message sent by the user to their assigned agent.
    pub fn from_user(
        user_id: UserId,
        agent_id: AgentId,
        content: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        Self::new(SenderRole::User, user_id, agent_id, content.into(), image_url)
    }

    /// A message sent by an agent to a user.
    pub fn from_agent(
        agent_id: AgentId,
        user_id: UserId,
        content: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        Self::new(SenderRole::Agent, user_id, agent_id, content.into(), image_url)
    }

    fn new(
        sender: SenderRole,
        user_id: UserId,
        agent_id: AgentId,
        content: String,
        image_url: Option<String>,
    ) -> Self {
        Self {
            user_id,
            agent_id,
            sender,
            content,
            image_url: image_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

/// Selects the messages of one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationFilter {
    pub user_id: UserId,
    /// `None` spans every agent the user has talked to.
    pub agent_id: Option<AgentId>,
}

impl ConversationFilter {
    pub fn pair(user_id: UserId, agent_id: AgentId) -> Self {
        Self {
            user_id,
            agent_id: Some(agent_id),
        }
    }

    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            agent_id: None,
        }
    }
}

/// The reader whose unread flags a history read clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReadSide {
    /// The agent read the conversation: user-sent messages become read-by-agent.
    Agent,
    /// The user read the conversation: agent-sent messages become read-by-user.
    User,
}

// --- Push types ---

/// Fixed phrase pushed in place of an image.
pub const IMAGE_PUSH_PHRASE: &str = "您收到一张图片";

/// Fixed phrase pushed when a message has no displayable text.
pub const GENERIC_PUSH_PHRASE: &str = "您收到新的消息,请点击查看!";

/// Fixed phrase pushed by an agent-requested reminder.
pub const REMINDER_PUSH_PHRASE: &str = "您有新的客服消息，请查看";

/// What a push notification should say about the message behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushPayload {
    Text(String),
    Image,
    Reminder,
}

impl PushPayload {
    /// Payload for a persisted message.
    pub fn for_message(message: &Message) -> Self {
        if message.is_image() {
            Self::Image
        } else {
            Self::Text(message.content.clone())
        }
    }

    /// The text shown in the notification, truncated to `max_chars` code points.
    pub fn render(&self, max_chars: usize) -> String {
        match self {
            Self::Image => IMAGE_PUSH_PHRASE.to_string(),
            Self::Reminder => REMINDER_PUSH_PHRASE.to_string(),
            Self::Text(text) if text.trim().is_empty() => GENERIC_PUSH_PHRASE.to_string(),
            Self::Text(text) => text.chars().take(max_chars).collect(),
        }
    }
}

/// One best-effort push attempt, queued after the message was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushJob {
    pub user_id: UserId,
    pub agent_id: AgentId,
    /// Message that triggered the push; `None` for manual reminders.
    pub message_id: Option<MessageId>,
    pub payload: PushPayload,
}

impl PushJob {
    pub fn for_message(message: &Message) -> Self {
        Self {
            user_id: message.user_id,
            agent_id: message.agent_id,
            message_id: Some(message.id),
            payload: PushPayload::for_message(message),
        }
    }

    pub fn reminder(agent_id: AgentId, user_id: UserId) -> Self {
        Self {
            user_id,
            agent_id,
            message_id: None,
            payload: PushPayload::Reminder,
        }
    }
}

/// Short-lived credential returned by the push provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// A templated notification request for the push provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMessage {
    /// Recipient identity on the provider side.
    pub to_user: String,
    pub template_id: String,
    pub sender_label: String,
    pub content: String,
    pub timestamp: String,
}

/// Raw status returned by the push provider's send call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderReply {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}
