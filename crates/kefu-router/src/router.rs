// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing between users and their assigned agents.
//!
//! Every accepted message is persisted before anything else happens to it.
//! Agents are reached through the [`ConnectionRegistry`]; users are reached
//! through push jobs handed to a [`PushDispatch`]. Neither delivery path
//! affects the result of a send once persistence succeeded.

use std::sync::Arc;

use kefu_core::{
    AgentId, KefuError, Message, NewMessage, PresenceTracker, PushDispatch, PushJob, Store, User,
    UserId,
};
use serde::Serialize;

use crate::registry::{ConnectionRegistry, LiveDelivery};

/// Result of a user send.
#[derive(Debug, Clone, Serialize)]
pub struct UserSendReceipt {
    pub message: Message,
    /// Auto-reply persisted on first contact.
    pub welcome: Option<Message>,
    #[serde(skip)]
    pub live: LiveDelivery,
}

/// Central orchestrator for both send directions.
#[derive(Clone)]
pub struct MessageRouter {
    store: Arc<dyn Store>,
    registry: Arc<ConnectionRegistry>,
    dispatch: Arc<dyn PushDispatch>,
    presence: PresenceTracker,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ConnectionRegistry>,
        dispatch: Arc<dyn PushDispatch>,
        presence: PresenceTracker,
    ) -> Self {
        Self {
            store,
            registry,
            dispatch,
            presence,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn presence(&self) -> PresenceTracker {
        self.presence
    }

    pub(crate) fn dispatch(&self, job: PushJob) {
        self.dispatch.dispatch(job);
    }

    /// Accepts a message from end user `external_id` of mini-application `app_key`.
    pub async fn route_user_message(
        &self,
        app_key: &str,
        external_id: &str,
        content: &str,
        image_url: Option<String>,
    ) -> Result<UserSendReceipt, KefuError> {
        let not_assigned = || KefuError::NotAssigned {
            app_key: app_key.to_string(),
        };
        let app = self
            .store
            .mini_app_by_key(app_key)
            .await?
            .ok_or_else(not_assigned)?;
        let agent_id = self
            .store
            .assigned_agent(app.id)
            .await?
            .ok_or_else(not_assigned)?;

        let (user, created) = self.store.find_or_create_user(external_id, app.id).await?;
        let first_contact = created || self.store.count_sent_by_user(user.id).await? == 0;

        self.presence.record_activity(self.store.as_ref(), user.id).await?;

        let message = self
            .store
            .insert_message(NewMessage::from_user(user.id, agent_id, content, image_url))
            .await?;
        tracing::debug!(
            message_id = %message.id,
            user_id = %user.id,
            agent_id = %agent_id,
            first_contact,
            "user message persisted"
        );

        let welcome = if first_contact {
            self.send_welcome(agent_id, user.id).await?
        } else {
            None
        };

        let live = self.deliver_live(&message);
        Ok(UserSendReceipt {
            message,
            welcome,
            live,
        })
    }

    async fn send_welcome(
        &self,
        agent_id: AgentId,
        user_id: UserId,
    ) -> Result<Option<Message>, KefuError> {
        let Some(agent) = self.store.agent(agent_id).await? else {
            return Ok(None);
        };
        let Some(text) = agent.welcome_message.filter(|w| !w.trim().is_empty()) else {
            return Ok(None);
        };

        let welcome = self
            .store
            .insert_message(NewMessage::from_agent(agent_id, user_id, text, None))
            .await?;
        tracing::debug!(message_id = %welcome.id, user_id = %user_id, "welcome message persisted");

        self.deliver_live(&welcome);
        self.dispatch(PushJob::for_message(&welcome));
        Ok(Some(welcome))
    }

    /// Accepts a message from `agent_id` to `user_id`.
    pub async fn route_agent_message(
        &self,
        agent_id: AgentId,
        user_id: UserId,
        content: &str,
        image_url: Option<String>,
    ) -> Result<Message, KefuError> {
        self.assigned_user(agent_id, user_id).await?;

        let message = self
            .store
            .insert_message(NewMessage::from_agent(agent_id, user_id, content, image_url))
            .await?;
        tracing::debug!(
            message_id = %message.id,
            user_id = %user_id,
            agent_id = %agent_id,
            "agent message persisted"
        );

        self.dispatch(PushJob::for_message(&message));
        Ok(message)
    }

    /// Loads `user_id` and checks its mini-application is assigned to `agent_id`.
    pub async fn assigned_user(
        &self,
        agent_id: AgentId,
        user_id: UserId,
    ) -> Result<User, KefuError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| KefuError::not_found("user", user_id))?;
        if !self.store.is_assigned(user.mini_app_id, agent_id).await? {
            return Err(KefuError::Forbidden { agent_id, user_id });
        }
        Ok(user)
    }

    fn deliver_live(&self, message: &Message) -> LiveDelivery {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(message_id = %message.id, error = %e, "failed to encode live frame");
                return LiveDelivery::Dropped;
            }
        };
        let outcome = self.registry.deliver(message.agent_id, frame);
        tracing::trace!(message_id = %message.id, ?outcome, "live delivery attempted");
        outcome
    }
}
