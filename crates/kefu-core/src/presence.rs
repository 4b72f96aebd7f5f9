// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Online/offline presence derived from a user's last-activity timestamp.
//!
//! Heartbeats and inbound user messages are the only writers of
//! `last_active_at`, both through [`PresenceTracker::record_activity`].
//! Verdicts are pure reads. The same window gates live-presence display and
//! push suppression.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use strum::Display;

use crate::error::KefuError;
use crate::traits::UserStore;
use crate::types::{User, UserId};

/// Default recency window for an online verdict, in seconds.
pub const DEFAULT_ONLINE_WINDOW_SECS: u64 = 60;

const MAX_WINDOW_SECS: u64 = 365 * 24 * 3600;

/// Presence classification of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Presence {
    Online,
    Offline,
}

/// `true` when `last_active` is set and strictly less than `window` old at `now`.
pub fn is_online_at(
    last_active: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: TimeDelta,
) -> bool {
    match last_active {
        Some(at) => now.signed_duration_since(at) < window,
        None => false,
    }
}

/// Derives presence verdicts and records user activity.
#[derive(Debug, Clone, Copy)]
pub struct PresenceTracker {
    window: TimeDelta,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::from_secs(DEFAULT_ONLINE_WINDOW_SECS)
    }
}

impl PresenceTracker {
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    pub fn from_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs.min(MAX_WINDOW_SECS)).unwrap_or(0);
        Self::new(TimeDelta::seconds(secs))
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn verdict_at(&self, user: &User, now: DateTime<Utc>) -> Presence {
        if is_online_at(user.last_active_at, now, self.window) {
            Presence::Online
        } else {
            Presence::Offline
        }
    }

    pub fn verdict(&self, user: &User) -> Presence {
        self.verdict_at(user, Utc::now())
    }

    pub fn is_online(&self, user: &User) -> bool {
        self.verdict(user) == Presence::Online
    }

    /// Stamp `user` as active now and return the stored timestamp.
    pub async fn record_activity<S>(
        &self,
        users: &S,
        user: UserId,
    ) -> Result<DateTime<Utc>, KefuError>
    where
        S: UserStore + ?Sized,
    {
        let now = Utc::now();
        users.touch_user(user, now).await?;
        tracing::trace!(user_id = %user, "presence refreshed");
        Ok(now)
    }
}
