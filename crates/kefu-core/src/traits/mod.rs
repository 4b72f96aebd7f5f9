// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the relay core and its collaborators.
//!
//! Storage and push-provider backends implement [`Adapter`] plus their
//! specific trait, and use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod dispatch;
pub mod push;
pub mod store;

pub use adapter::Adapter;
pub use dispatch::PushDispatch;
pub use push::PushProvider;
pub use store::{Directory, MessageStore, Store, UserStore};
