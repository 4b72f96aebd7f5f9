// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External push provider contract.

use async_trait::async_trait;

use crate::error::KefuError;
use crate::traits::adapter::Adapter;
use crate::types::{AccessToken, MiniApp, ProviderReply, TemplateMessage};

/// Client for a templated push notification service.
///
/// Both calls are single attempts. The provider's numeric status on `send`
/// is returned as-is in [`ProviderReply`] for the caller to classify; an
/// `Err` only means the call itself could not be completed.
#[async_trait]
pub trait PushProvider: Adapter {
    /// Obtains a short-lived credential using the mini-application's own secret.
    async fn access_token(&self, app: &MiniApp) -> Result<AccessToken, KefuError>;

    /// Submits one templated notification.
    async fn send(
        &self,
        token: &AccessToken,
        message: &TemplateMessage,
    ) -> Result<ProviderReply, KefuError>;
}
