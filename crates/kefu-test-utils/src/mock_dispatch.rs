// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push dispatcher that records jobs instead of running them.

use std::sync::Mutex;

use kefu_core::types::PushJob;
use kefu_core::PushDispatch;

#[derive(Debug, Default)]
pub struct RecordingDispatch {
    jobs: Mutex<Vec<PushJob>>,
}

impl RecordingDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs dispatched so far, in dispatch order.
    pub fn jobs(&self) -> Vec<PushJob> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl PushDispatch for RecordingDispatch {
    fn dispatch(&self, job: PushJob) {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(job);
    }
}
