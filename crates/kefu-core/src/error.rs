// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kefu message relay.

use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::{AgentId, UserId};

/// The primary error type used across all Kefu components.
#[derive(Debug, Error)]
pub enum KefuError {
    /// No agent is assigned to the mini-application.
    #[error("mini-application `{app_key}` has no assigned agent")]
    NotAssigned { app_key: String },

    /// An agent tried to act on a user outside its assignment.
    #[error("agent {agent_id} is not assigned to the mini-application of user {user_id}")]
    Forbidden { agent_id: AgentId, user_id: UserId },

    /// Unknown user, agent, mini-application, or message.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unparseable inbound payload (live-channel frames are dropped on this).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The user has not opted into push delivery.
    #[error("user {user_id} has not subscribed to push messages")]
    NotSubscribed { user_id: UserId },

    /// The push provider rejected a call but the subscription stays valid.
    #[error("push provider transient failure {code}: {message}")]
    ProviderTransient { code: i64, message: String },

    /// The push provider reported that the user's subscription is gone.
    #[error("push subscription invalidated {code}: {message}")]
    ProviderInvalidated { code: i64, message: String },

    /// Push provider transport errors (HTTP failure, undecodable body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport errors (bind failure, socket errors).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`KefuError`], used for status mapping and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotAssigned,
    Forbidden,
    NotFound,
    MalformedInput,
    NotSubscribed,
    ProviderTransient,
    ProviderInvalidated,
    Provider,
    Storage,
    Config,
    Channel,
    Internal,
}

impl KefuError {
    /// Shorthand for a [`KefuError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAssigned { .. } => ErrorKind::NotAssigned,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::NotSubscribed { .. } => ErrorKind::NotSubscribed,
            Self::ProviderTransient { .. } => ErrorKind::ProviderTransient,
            Self::ProviderInvalidated { .. } => ErrorKind::ProviderInvalidated,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
            Self::Channel { .. } => ErrorKind::Channel,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is meant to be shown to the caller as-is.
    ///
    /// Storage, transport and internal failures are reported generically.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotAssigned
                | ErrorKind::Forbidden
                | ErrorKind::NotFound
                | ErrorKind::MalformedInput
                | ErrorKind::NotSubscribed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = KefuError::NotAssigned {
            app_key: "shop1".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotAssigned);
        assert!(err.to_string().contains("shop1"));

        let err = KefuError::Forbidden {
            agent_id: AgentId(7),
            user_id: UserId(3),
        };
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("agent 7"));
    }

    #[test]
    fn not_found_shorthand() {
        let err = KefuError::not_found("user", "openid-1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "user not found: openid-1");
    }

    #[test]
    fn storage_errors_are_not_user_visible() {
        let err = KefuError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert!(!err.is_user_visible());
        assert!(KefuError::MalformedInput("x".into()).is_user_visible());
    }

    #[test]
    fn kind_displays_snake_case() {
        assert_eq!(ErrorKind::NotAssigned.to_string(), "not_assigned");
        assert_eq!(ErrorKind::ProviderInvalidated.to_string(), "provider_invalidated");
    }
}
