// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded push queue drained by a fixed pool of workers.
//!
//! [`PushQueue::dispatch`] never waits: a full queue drops the job with a
//! warning. Jobs run in no particular order relative to each other.

use std::sync::Arc;

use kefu_core::types::PushJob;
use kefu_core::PushDispatch;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::notifier::Notifier;

/// Push dispatcher backed by an mpsc queue and `workers` tasks.
pub struct PushQueue {
    tx: mpsc::Sender<PushJob>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl PushQueue {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn start(
        notifier: Arc<Notifier>,
        workers: usize,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let tracker = TaskTracker::new();

        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let notifier = Arc::clone(&notifier);
            let cancel = cancel.clone();
            tracker.spawn(async move {
                while let Some(job) = next_job(&rx, &cancel).await {
                    let outcome = notifier.notify(&job).await;
                    debug!(worker, user_id = %job.user_id, ?outcome, "push job finished");
                }
                debug!(worker, "push worker stopped");
            });
        }
        tracker.close();
        info!(workers = workers.max(1), capacity, "push queue started");

        Self {
            tx,
            cancel,
            tracker,
        }
    }

    /// Stop accepting jobs, let workers drain what is queued, and wait for them.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.wait().await;
        info!("push queue drained");
    }
}

/// Next job for a worker. After cancellation, only already-queued jobs are returned.
async fn next_job(
    rx: &Mutex<mpsc::Receiver<PushJob>>,
    cancel: &CancellationToken,
) -> Option<PushJob> {
    let mut rx = rx.lock().await;
    if cancel.is_cancelled() {
        return rx.try_recv().ok();
    }
    tokio::select! {
        job = rx.recv() => job,
        _ = cancel.cancelled() => rx.try_recv().ok(),
    }
}

impl PushDispatch for PushQueue {
    fn dispatch(&self, job: PushJob) {
        if self.cancel.is_cancelled() {
            debug!(user_id = %job.user_id, "push queue stopped, dropping job");
            return;
        }
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(user_id = %job.user_id, "push queue full, dropping job");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(user_id = %job.user_id, "push queue closed, dropping job");
            }
        }
    }
}

/// Dispatcher used when push delivery is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDispatch;

impl PushDispatch for DisabledDispatch {
    fn dispatch(&self, job: PushJob) {
        debug!(user_id = %job.user_id, "push disabled, dropping job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kefu_core::{PresenceTracker, UserStore};
    use kefu_test_utils::TestHarness;

    async fn queue_for(harness: &TestHarness, workers: usize, capacity: usize) -> PushQueue {
        let notifier = Notifier::new(
            harness.store.clone(),
            harness.provider.clone(),
            PresenceTracker::default(),
            20,
        );
        PushQueue::start(Arc::new(notifier), workers, capacity, CancellationToken::new())
    }

    #[tokio::test]
    async fn queued_jobs_are_drained_on_shutdown() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.offline_subscriber("openid-1").await;

        let queue = queue_for(&harness, 2, 16).await;
        for _ in 0..5 {
            queue.dispatch(PushJob::reminder(harness.agent.id, user.id));
        }
        queue.shutdown().await;

        assert_eq!(harness.provider.sent().len(), 5);
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_is_dropped() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.user("openid-1").await;
        harness.store.set_subscribed(user.id, true).await.unwrap();

        let queue = queue_for(&harness, 1, 4).await;
        queue.shutdown().await;
        queue.dispatch(PushJob::reminder(harness.agent.id, user.id));

        assert!(harness.provider.sent().is_empty());
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let harness = TestHarness::builder().build().await.unwrap();
        let user = harness.offline_subscriber("openid-1").await;
        let (workers, capacity) = (1, 1);
        let queue = queue_for(&harness, workers, capacity).await;

        // More jobs than capacity; dispatch must return immediately every time.
        for _ in 0..100 {
            queue.dispatch(PushJob::reminder(harness.agent.id, user.id));
        }
        queue.shutdown().await;

        let sent = harness.provider.sent().len();
        assert!(sent >= 1, "queued job was not delivered");
        assert!(sent <= capacity + workers, "{sent} jobs delivered");
    }

    #[test]
    fn disabled_dispatch_accepts_jobs() {
        DisabledDispatch.dispatch(PushJob::reminder(
            kefu_core::AgentId(1),
            kefu_core::UserId(1),
        ));
    }
}
