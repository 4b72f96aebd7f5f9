// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push notification fallback for the Kefu message relay.
//!
//! A [`PushQueue`] accepts [`PushJob`](kefu_core::PushJob)s without waiting
//! and hands each one to a [`Notifier`], which decides whether to notify,
//! calls the provider once, and translates the provider's status code into
//! a subscription change.

pub mod classify;
pub mod client;
pub mod notifier;
pub mod queue;

pub use classify::{classify, resolve_subscription, Verdict};
pub use client::WechatClient;
pub use notifier::{Notifier, PushOutcome, SkipReason};
pub use queue::{DisabledDispatch, PushQueue};
