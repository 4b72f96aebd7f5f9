// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the relay's store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use kefu_config::model::StorageConfig;
use kefu_core::types::{ConversationFilter, ReadSide};
use kefu_core::{
    Adapter, AdapterType, Agent, AgentId, Directory, HealthStatus, KefuError, Message,
    MessageId, MessageStore, MiniApp, MiniAppId, NewMessage, User, UserId, UserStore,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed message store, user store and directory.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database named by the storage configuration.
    pub async fn open(config: &StorageConfig) -> Result<Self, KefuError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite storage initialized");
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Administrative writes ---

    pub async fn create_mini_app(
        &self,
        name: &str,
        app_key: &str,
        secret: &str,
        template_id: Option<&str>,
    ) -> Result<MiniApp, KefuError> {
        queries::directory::create_mini_app(&self.db, name, app_key, secret, template_id).await
    }

    pub async fn create_agent(
        &self,
        name: &str,
        welcome_message: Option<&str>,
    ) -> Result<Agent, KefuError> {
        queries::directory::create_agent(&self.db, name, welcome_message).await
    }

    pub async fn assign(&self, mini_app_id: MiniAppId, agent_id: AgentId) -> Result<(), KefuError> {
        queries::directory::assign(&self.db, mini_app_id, agent_id).await
    }

    pub async fn set_welcome_message(
        &self,
        agent_id: AgentId,
        welcome_message: Option<&str>,
    ) -> Result<(), KefuError> {
        queries::directory::set_welcome_message(&self.db, agent_id, welcome_message).await
    }
}

#[async_trait]
impl Adapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KefuError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KefuError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, KefuError> {
        queries::messages::insert_message(&self.db, message).await
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, KefuError> {
        queries::messages::get_message(&self.db, id).await
    }

    async fn list_conversation(
        &self,
        filter: ConversationFilter,
    ) -> Result<Vec<Message>, KefuError> {
        queries::messages::list_conversation(&self.db, filter).await
    }

    async fn count_sent_by_user(&self, user_id: UserId) -> Result<u64, KefuError> {
        queries::messages::count_sent_by_user(&self.db, user_id).await
    }

    async fn mark_conversation_read(
        &self,
        filter: ConversationFilter,
        side: ReadSide,
    ) -> Result<u64, KefuError> {
        queries::messages::mark_conversation_read(&self.db, filter, side).await
    }

    async fn mark_read_by_user(&self, id: MessageId) -> Result<bool, KefuError> {
        queries::messages::mark_read_by_user(&self.db, id).await
    }

    async fn soft_delete_message(&self, id: MessageId) -> Result<bool, KefuError> {
        queries::messages::soft_delete_message(&self.db, id).await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, KefuError> {
        queries::users::get_user(&self.db, id).await
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, KefuError> {
        queries::users::find_by_external_id(&self.db, external_id).await
    }

    async fn find_or_create_user(
        &self,
        external_id: &str,
        mini_app_id: MiniAppId,
    ) -> Result<(User, bool), KefuError> {
        queries::users::find_or_create(&self.db, external_id, mini_app_id).await
    }

    async fn touch_user(&self, id: UserId, at: DateTime<Utc>) -> Result<(), KefuError> {
        queries::users::touch(&self.db, id, at).await
    }

    async fn set_subscribed(&self, id: UserId, subscribed: bool) -> Result<(), KefuError> {
        queries::users::set_subscribed(&self.db, id, subscribed).await
    }
}

#[async_trait]
impl Directory for SqliteStore {
    async fn mini_app_by_key(&self, app_key: &str) -> Result<Option<MiniApp>, KefuError> {
        queries::directory::mini_app_by_key(&self.db, app_key).await
    }

    async fn mini_app(&self, id: MiniAppId) -> Result<Option<MiniApp>, KefuError> {
        queries::directory::mini_app(&self.db, id).await
    }

    async fn agent(&self, id: AgentId) -> Result<Option<Agent>, KefuError> {
        queries::directory::agent(&self.db, id).await
    }

    async fn assigned_agent(&self, mini_app_id: MiniAppId) -> Result<Option<AgentId>, KefuError> {
        queries::directory::assigned_agent(&self.db, mini_app_id).await
    }

    async fn is_assigned(
        &self,
        mini_app_id: MiniAppId,
        agent_id: AgentId,
    ) -> Result<bool, KefuError> {
        queries::directory::is_assigned(&self.db, mini_app_id, agent_id).await
    }
}
