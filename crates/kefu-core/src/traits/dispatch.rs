// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-off point from the synchronous routing path to background push delivery.

use crate::types::PushJob;

/// Accepts push jobs without waiting for them.
///
/// Implementations must never block the caller. Whether a job ends in a
/// notification is not observable through this trait.
pub trait PushDispatch: Send + Sync {
    fn dispatch(&self, job: PushJob);
}
