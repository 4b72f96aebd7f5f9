// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration testing.
//!
//! `TestHarness` opens a temp SQLite database and seeds it with one
//! mini-application (`shop`) assigned to one agent (`Alice`), alongside a
//! [`MockPushProvider`] and a [`RecordingDispatch`].

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use kefu_config::model::{KefuConfig, StorageConfig};
use kefu_core::{Agent, KefuError, MiniApp, User, UserStore};
use kefu_storage::SqliteStore;

use crate::mock_dispatch::RecordingDispatch;
use crate::mock_provider::MockPushProvider;

/// Key of the seeded mini-application.
pub const APP_KEY: &str = "shop";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    welcome_message: Option<String>,
    template_id: Option<String>,
    config: KefuConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            welcome_message: None,
            template_id: Some("tpl-1".to_string()),
            config: KefuConfig::default(),
        }
    }

    /// Give the seeded agent a first-contact welcome message.
    pub fn with_welcome_message(mut self, text: &str) -> Self {
        self.welcome_message = Some(text.to_string());
        self
    }

    /// Seed the mini-application without a push template.
    pub fn without_template(mut self) -> Self {
        self.template_id = None;
        self
    }

    /// Start from a custom configuration. The storage section is replaced.
    pub fn with_config(mut self, config: KefuConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> Result<TestHarness, KefuError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| KefuError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let store = SqliteStore::open(&config.storage).await?;
        let app = store
            .create_mini_app("Shop", APP_KEY, "shop-secret", self.template_id.as_deref())
            .await?;
        let agent = store
            .create_agent("Alice", self.welcome_message.as_deref())
            .await?;
        store.assign(app.id, agent.id).await?;

        Ok(TestHarness {
            store: Arc::new(store),
            provider: Arc::new(MockPushProvider::new()),
            dispatch: Arc::new(RecordingDispatch::new()),
            app,
            agent,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub provider: Arc<MockPushProvider>,
    pub dispatch: Arc<RecordingDispatch>,
    /// The seeded mini-application.
    pub app: MiniApp,
    /// The agent assigned to [`Self::app`].
    pub agent: Agent,
    pub config: KefuConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The user for `external_id` under the seeded app, created if needed.
    ///
    /// # Panics
    ///
    /// Panics on storage failure.
    pub async fn user(&self, external_id: &str) -> User {
        let (user, _) = self
            .store
            .find_or_create_user(external_id, self.app.id)
            .await
            .unwrap_or_else(|e| panic!("failed to create user {external_id}: {e}"));
        user
    }

    /// A subscribed user last active five minutes ago.
    ///
    /// # Panics
    ///
    /// Panics on storage failure.
    pub async fn offline_subscriber(&self, external_id: &str) -> User {
        let user = self.user(external_id).await;
        let last_active = Utc::now() - TimeDelta::minutes(5);
        self.store
            .set_subscribed(user.id, true)
            .await
            .unwrap_or_else(|e| panic!("failed to subscribe user: {e}"));
        self.store
            .touch_user(user.id, last_active)
            .await
            .unwrap_or_else(|e| panic!("failed to touch user: {e}"));
        User {
            subscribed: true,
            last_active_at: Some(last_active),
            ..user
        }
    }

    /// Create a mini-application with no assigned agent.
    ///
    /// # Panics
    ///
    /// Panics on storage failure.
    pub async fn unassigned_app(&self, app_key: &str) -> MiniApp {
        self.store
            .create_mini_app(app_key, app_key, "secret", Some("tpl-unassigned"))
            .await
            .unwrap_or_else(|e| panic!("failed to create mini-app {app_key}: {e}"))
    }
}
