// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One best-effort push attempt per job.
//!
//! Each step either continues or ends the attempt with a logged
//! [`PushOutcome`]. Nothing is retried and nothing is returned to the
//! original sender; the only lasting effect besides the notification itself
//! is a possible change of the user's subscription flag.

use std::sync::Arc;

use chrono::Local;
use kefu_core::types::{PushJob, TemplateMessage};
use kefu_core::{KefuError, PresenceTracker, PushProvider, Store};
use strum::Display;
use tracing::{debug, info, warn};

use crate::classify::{classify, describe, resolve_subscription, Verdict};

/// Sender label used when the agent's name cannot be resolved.
pub const FALLBACK_SENDER_LABEL: &str = "客服";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why an attempt ended before reaching the provider's send call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    UnknownUser,
    NotSubscribed,
    Online,
    UnknownMiniApp,
    NoTemplate,
    NoCredential,
}

/// How a push attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Skipped(SkipReason),
    /// The provider answered the send call with this classification.
    Sent { code: i64, verdict: Verdict },
    /// The send call itself failed; no state was changed.
    Failed(String),
}

/// Executes push jobs against a store and a provider.
pub struct Notifier {
    store: Arc<dyn Store>,
    provider: Arc<dyn PushProvider>,
    presence: PresenceTracker,
    content_max_chars: usize,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn PushProvider>,
        presence: PresenceTracker,
        content_max_chars: usize,
    ) -> Self {
        Self {
            store,
            provider,
            presence,
            content_max_chars,
        }
    }

    /// Run one attempt for `job`. Never fails; the outcome is for logs and tests.
    pub async fn notify(&self, job: &PushJob) -> PushOutcome {
        match self.attempt(job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(user_id = %job.user_id, error = %e, "push attempt failed");
                PushOutcome::Failed(e.to_string())
            }
        }
    }

    async fn attempt(&self, job: &PushJob) -> Result<PushOutcome, KefuError> {
        let Some(user) = self.store.get_user(job.user_id).await? else {
            debug!(user_id = %job.user_id, "push skipped: user not found");
            return Ok(PushOutcome::Skipped(SkipReason::UnknownUser));
        };

        if !user.subscribed {
            debug!(user_id = %user.id, "push skipped: user not subscribed");
            return Ok(PushOutcome::Skipped(SkipReason::NotSubscribed));
        }

        if self.presence.is_online(&user) {
            debug!(user_id = %user.id, "push skipped: user online");
            return Ok(PushOutcome::Skipped(SkipReason::Online));
        }

        let sender_label = match self.store.agent(job.agent_id).await {
            Ok(Some(agent)) => agent.name,
            Ok(None) => FALLBACK_SENDER_LABEL.to_string(),
            Err(e) => {
                debug!(agent_id = %job.agent_id, error = %e, "agent lookup failed, using fallback label");
                FALLBACK_SENDER_LABEL.to_string()
            }
        };

        let Some(app) = self.store.mini_app(user.mini_app_id).await? else {
            info!(user_id = %user.id, mini_app_id = %user.mini_app_id, "push skipped: mini-application not found");
            return Ok(PushOutcome::Skipped(SkipReason::UnknownMiniApp));
        };

        let template_id = match app.template_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                info!(app_key = %app.app_key, "push skipped: no template configured");
                return Ok(PushOutcome::Skipped(SkipReason::NoTemplate));
            }
        };

        let token = match self.provider.access_token(&app).await {
            Ok(token) => token,
            Err(e) => {
                warn!(app_key = %app.app_key, error = %e, "push skipped: access token unavailable");
                return Ok(PushOutcome::Skipped(SkipReason::NoCredential));
            }
        };

        let message = TemplateMessage {
            to_user: user.external_id.clone(),
            template_id,
            sender_label,
            content: job.payload.render(self.content_max_chars),
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        };
        let reply = self.provider.send(&token, &message).await?;

        let verdict = classify(reply.errcode);
        match verdict {
            Verdict::Success => {
                info!(user_id = %user.id, message_id = ?job.message_id.map(|id| id.0), "push delivered");
            }
            _ => {
                warn!(
                    user_id = %user.id,
                    code = reply.errcode,
                    errmsg = %reply.errmsg,
                    verdict = %verdict,
                    "push rejected: {}",
                    describe(reply.errcode)
                );
            }
        }

        if let Some(subscribed) = resolve_subscription(verdict) {
            match self.store.set_subscribed(user.id, subscribed).await {
                Ok(()) => info!(user_id = %user.id, subscribed, "subscription updated"),
                Err(e) => warn!(user_id = %user.id, error = %e, "failed to update subscription"),
            }
        }

        Ok(PushOutcome::Sent {
            code: reply.errcode,
            verdict,
        })
    }
}
