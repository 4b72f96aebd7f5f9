// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation reads, presence and subscription operations.
//!
//! History reads clear the reader's unread flags in one batch after the
//! listing is taken, so the returned messages still show their prior state.

use chrono::{DateTime, Utc};
use kefu_core::types::{ConversationFilter, ReadSide};
use kefu_core::{AgentId, KefuError, Message, MessageId, MiniApp, Presence, PushJob, User, UserId};
use serde::Serialize;

use crate::router::MessageRouter;

/// Presence of a user as shown to its agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceView {
    pub user_id: UserId,
    pub presence: Presence,
    pub online: bool,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Push readiness of a user, for agent-side display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushStatus {
    pub subscribed: bool,
    pub mini_app_exists: bool,
    pub app_key: Option<String>,
    pub template_id: Option<String>,
    pub has_template: bool,
}

impl MessageRouter {
    /// Refreshes a user's presence, creating the user on first sight.
    pub async fn heartbeat(&self, app_key: &str, external_id: &str) -> Result<User, KefuError> {
        let app = self.mini_app_by_key(app_key).await?;
        let (user, created) = self.store().find_or_create_user(external_id, app.id).await?;
        let at = self.presence().record_activity(self.store().as_ref(), user.id).await?;
        if created {
            tracing::debug!(user_id = %user.id, app_key, "user created by heartbeat");
        }
        Ok(User {
            last_active_at: Some(at),
            ..user
        })
    }

    /// Opts a user into push delivery.
    pub async fn subscribe(&self, external_id: &str) -> Result<(), KefuError> {
        let user = self.user_by_external_id(external_id).await?;
        self.store().set_subscribed(user.id, true).await?;
        tracing::info!(user_id = %user.id, "user subscribed to push messages");
        Ok(())
    }

    /// The user's whole history. Clears the user's unread flags.
    pub async fn user_history(
        &self,
        app_key: &str,
        external_id: &str,
    ) -> Result<Vec<Message>, KefuError> {
        let app = self.mini_app_by_key(app_key).await?;
        let user = self.user_by_external_id(external_id).await?;
        if user.mini_app_id != app.id {
            return Err(KefuError::not_found("user", external_id));
        }

        let filter = ConversationFilter::user(user.id);
        let messages = self.store().list_conversation(filter).await?;
        let marked = self.store().mark_conversation_read(filter, ReadSide::User).await?;
        tracing::debug!(user_id = %user.id, count = messages.len(), marked, "user history read");
        Ok(messages)
    }

    /// The conversation between an agent and one of its users. Clears the agent's unread flags.
    pub async fn agent_history(
        &self,
        agent_id: AgentId,
        user_id: UserId,
    ) -> Result<Vec<Message>, KefuError> {
        self.assigned_user(agent_id, user_id).await?;

        let filter = ConversationFilter::pair(user_id, agent_id);
        let messages = self.store().list_conversation(filter).await?;
        let marked = self.store().mark_conversation_read(filter, ReadSide::Agent).await?;
        tracing::debug!(
            agent_id = %agent_id,
            user_id = %user_id,
            count = messages.len(),
            marked,
            "agent history read"
        );
        Ok(messages)
    }

    pub async fn delete_message(&self, id: MessageId) -> Result<(), KefuError> {
        if !self.store().soft_delete_message(id).await? {
            return Err(KefuError::not_found("message", id));
        }
        tracing::debug!(message_id = %id, "message deleted");
        Ok(())
    }

    /// Marks an agent-sent message as read by its user.
    ///
    /// Returns `false` for a user-sent message, which is left as is.
    pub async fn mark_message_read(&self, id: MessageId) -> Result<bool, KefuError> {
        self.store().mark_read_by_user(id).await
    }

    pub async fn user_presence(
        &self,
        agent_id: AgentId,
        user_id: UserId,
    ) -> Result<PresenceView, KefuError> {
        let user = self.assigned_user(agent_id, user_id).await?;
        let presence = self.presence().verdict(&user);
        Ok(PresenceView {
            user_id,
            presence,
            online: presence == Presence::Online,
            last_active_at: user.last_active_at,
        })
    }

    /// Queues a fixed-text reminder push to a subscribed user.
    pub async fn request_reminder(
        &self,
        agent_id: AgentId,
        user_id: UserId,
    ) -> Result<(), KefuError> {
        let user = self.assigned_user(agent_id, user_id).await?;
        if !user.subscribed {
            return Err(KefuError::NotSubscribed { user_id });
        }
        self.dispatch(PushJob::reminder(agent_id, user_id));
        tracing::info!(agent_id = %agent_id, user_id = %user_id, "push reminder queued");
        Ok(())
    }

    pub async fn push_status(
        &self,
        agent_id: AgentId,
        user_id: UserId,
    ) -> Result<PushStatus, KefuError> {
        let user = self.assigned_user(agent_id, user_id).await?;
        let app = self.store().mini_app(user.mini_app_id).await?;
        let template_id = app
            .as_ref()
            .and_then(|a| a.template_id.clone())
            .filter(|t| !t.is_empty());
        Ok(PushStatus {
            subscribed: user.subscribed,
            mini_app_exists: app.is_some(),
            app_key: app.map(|a| a.app_key),
            has_template: template_id.is_some(),
            template_id,
        })
    }

    async fn mini_app_by_key(&self, app_key: &str) -> Result<MiniApp, KefuError> {
        self.store()
            .mini_app_by_key(app_key)
            .await?
            .ok_or_else(|| KefuError::not_found("mini-application", app_key))
    }

    async fn user_by_external_id(&self, external_id: &str) -> Result<User, KefuError> {
        self.store()
            .find_user_by_external_id(external_id)
            .await?
            .ok_or_else(|| KefuError::not_found("user", external_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use kefu_core::{MessageStore, NewMessage, PresenceTracker, PushPayload, SenderRole, UserStore};
    use kefu_test_utils::TestHarness;

    use super::*;
    use crate::registry::ConnectionRegistry;

    fn router(harness: &TestHarness) -> MessageRouter {
        MessageRouter::new(
            harness.store.clone(),
            Arc::new(ConnectionRegistry::new()),
            harness.dispatch.clone(),
            PresenceTracker::default(),
        )
    }

    async fn seed(harness: &TestHarness, user: UserId, from_user: &[bool]) -> Vec<Message> {
        let mut out = Vec::new();
        for (i, &sent_by_user) in from_user.iter().enumerate() {
            let text = format!("m{i}");
            let new = if sent_by_user {
                NewMessage::from_user(user, harness.agent.id, text, None)
            } else {
                NewMessage::from_agent(harness.agent.id, user, text, None)
            };
            out.push(harness.store.insert_message(new).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn heartbeat_creates_user_and_marks_online() {
        let harness = TestHarness::builder().build().await.unwrap();
        let router = router(&harness);

        let user = router.heartbeat("shop", "openid-hb").await.unwrap();
        let stored = harness.store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.mini_app_id, harness.app.id);
        assert!(router.presence().is_online(&stored));
    }

    #[tokio::test]
    async fn heartbeat_for_unknown_app_is_not_found() {
        let harness = TestHarness::builder().build().await.unwrap();
        let err = router(&harness).heartbeat("nope", "openid").await.unwrap_err();
        assert!(matches!(err, KefuError::NotFound { .. }));
    }

    #[tokio::test]
    async fn subscribe_sets_flag() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-s").await;
        assert!(!user.subscribed);

        router(&harness).subscribe("openid-s").await.unwrap();
        assert!(harness.store.get_user(user.id).await.unwrap().unwrap().subscribed);

        let err = router(&harness).subscribe("ghost").await.unwrap_err();
        assert!(matches!(err, KefuError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn agent_history_marks_only_unread_user_messages() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-e").await;
        let seeded = seed(&harness, user.id, &[true, false, true, true]).await;

        // One user message was already read earlier.
        let filter = ConversationFilter::pair(user.id, harness.agent.id);
        harness.store.mark_conversation_read(filter, ReadSide::Agent).await.unwrap();
        let late = harness
            .store
            .insert_message(NewMessage::from_user(user.id, harness.agent.id, "late", None))
            .await
            .unwrap();

        let history = router(&harness).agent_history(harness.agent.id, user.id).await.unwrap();
        assert_eq!(history.len(), 5);
        assert!(!history.last().unwrap().read_by_agent);

        let after = harness.store.list_conversation(filter).await.unwrap();
        for message in &after {
            match message.sender {
                SenderRole::User => assert!(message.read_by_agent, "{}", message.content),
                SenderRole::Agent => {
                    assert!(!message.read_by_agent);
                    assert!(!message.read_by_user);
                }
            }
        }
        assert!(after.iter().any(|m| m.id == late.id));
        assert_eq!(after[1].id, seeded[1].id);
    }

    #[tokio::test]
    async fn agent_history_checks_assignment() {
        let harness = TestHarness::builder().build().await.unwrap();
        let other = harness.unassigned_app("elsewhere").await;
        let (stranger, _) = harness
            .store
            .find_or_create_user("openid-z", other.id)
            .await
            .unwrap();

        let err = router(&harness)
            .agent_history(harness.agent.id, stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(err, KefuError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn user_history_marks_agent_messages_read_by_user() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-h").await;
        seed(&harness, user.id, &[true, false, false]).await;

        let history = router(&harness).user_history("shop", "openid-h").await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|m| !m.read_by_user));

        let after = harness
            .store
            .list_conversation(ConversationFilter::user(user.id))
            .await
            .unwrap();
        assert!(!after[0].read_by_user);
        assert!(after[1].read_by_user && after[2].read_by_user);
    }

    #[tokio::test]
    async fn user_history_rejects_foreign_app() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.unassigned_app("other").await;
        harness.user("openid-f").await;

        let err = router(&harness).user_history("other", "openid-f").await.unwrap_err();
        assert!(matches!(err, KefuError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn delete_hides_message_from_history() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-del").await;
        let seeded = seed(&harness, user.id, &[true, false]).await;
        let router = router(&harness);

        router.delete_message(seeded[0].id).await.unwrap();
        let history = router.agent_history(harness.agent.id, user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, seeded[1].id);

        let err = router.delete_message(MessageId(9999)).await.unwrap_err();
        assert!(matches!(err, KefuError::NotFound { entity: "message", .. }));
    }

    #[tokio::test]
    async fn mark_read_only_touches_agent_messages() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-r").await;
        let seeded = seed(&harness, user.id, &[true, false]).await;
        let router = router(&harness);

        assert!(!router.mark_message_read(seeded[0].id).await.unwrap());
        assert!(router.mark_message_read(seeded[1].id).await.unwrap());
        let stored = harness.store.get_message(seeded[1].id).await.unwrap().unwrap();
        assert!(stored.read_by_user);
    }

    #[tokio::test]
    async fn presence_view_reflects_last_activity() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-pv").await;
        let router = router(&harness);

        let view = router.user_presence(harness.agent.id, user.id).await.unwrap();
        assert_eq!(view.presence, Presence::Offline);
        assert!(view.last_active_at.is_none());

        harness.store.touch_user(user.id, Utc::now()).await.unwrap();
        let view = router.user_presence(harness.agent.id, user.id).await.unwrap();
        assert!(view.online);

        harness
            .store
            .touch_user(user.id, Utc::now() - TimeDelta::minutes(2))
            .await
            .unwrap();
        let view = router.user_presence(harness.agent.id, user.id).await.unwrap();
        assert!(!view.online);
    }

    #[tokio::test]
    async fn reminder_requires_subscription() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-rm").await;
        let router = router(&harness);

        let err = router.request_reminder(harness.agent.id, user.id).await.unwrap_err();
        assert!(matches!(err, KefuError::NotSubscribed { .. }));
        assert!(harness.dispatch.jobs().is_empty());

        harness.store.set_subscribed(user.id, true).await.unwrap();
        router.request_reminder(harness.agent.id, user.id).await.unwrap();
        let jobs = harness.dispatch.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].payload, PushPayload::Reminder);
        assert_eq!(jobs[0].message_id, None);
    }

    #[tokio::test]
    async fn push_status_reports_template() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.offline_subscriber("openid-ps").await;

        let status = router(&harness).push_status(harness.agent.id, user.id).await.unwrap();
        assert!(status.subscribed);
        assert!(status.mini_app_exists);
        assert_eq!(status.app_key.as_deref(), Some("shop"));
        assert_eq!(status.template_id.as_deref(), Some("tpl-1"));
        assert!(status.has_template);
    }

    #[tokio::test]
    async fn push_status_without_template() {
        let harness = TestHarness::builder().without_template().build().await.unwrap();
        let user = harness.user("openid-nt").await;

        let status = router(&harness).push_status(harness.agent.id, user.id).await.unwrap();
        assert!(!status.subscribed);
        assert!(!status.has_template);
        assert_eq!(status.template_id, None);
    }
}
