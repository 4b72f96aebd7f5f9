// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock push provider for deterministic testing.
//!
//! Token and send results are scripted up front; every send request is
//! captured for assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use kefu_core::types::{AccessToken, ProviderReply, TemplateMessage};
use kefu_core::{Adapter, AdapterType, HealthStatus, KefuError, MiniApp, PushProvider};

enum SendScript {
    Reply(ProviderReply),
    Fail(String),
}

/// A push provider that never leaves the process.
///
/// With nothing scripted, tokens are issued and every send succeeds.
#[derive(Default)]
pub struct MockPushProvider {
    token_error: Mutex<Option<i64>>,
    script: Mutex<VecDeque<SendScript>>,
    sent: Mutex<Vec<TemplateMessage>>,
    token_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a provider status for the next send.
    pub fn reply_with(&self, errcode: i64, errmsg: &str) {
        lock(&self.script).push_back(SendScript::Reply(ProviderReply {
            errcode,
            errmsg: errmsg.to_string(),
        }));
    }

    /// Make the next send fail at the transport level.
    pub fn fail_send(&self, message: &str) {
        lock(&self.script).push_back(SendScript::Fail(message.to_string()));
    }

    /// Make every token request fail with `errcode`.
    pub fn fail_token(&self, errcode: i64) {
        *lock(&self.token_error) = Some(errcode);
    }

    /// Every request that reached `send`, in order.
    pub fn sent(&self) -> Vec<TemplateMessage> {
        lock(&self.sent).clone()
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MockPushProvider {
    fn name(&self) -> &str {
        "mock-push"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PushProvider
    }

    async fn health_check(&self) -> Result<HealthStatus, KefuError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn access_token(&self, app: &MiniApp) -> Result<AccessToken, KefuError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        match *lock(&self.token_error) {
            Some(code) => Err(KefuError::ProviderTransient {
                code,
                message: "mock token failure".to_string(),
            }),
            None => Ok(AccessToken(format!("mock-token-{}", app.app_key))),
        }
    }

    async fn send(
        &self,
        _token: &AccessToken,
        message: &TemplateMessage,
    ) -> Result<ProviderReply, KefuError> {
        let next = lock(&self.script).pop_front();
        match next {
            Some(SendScript::Fail(reason)) => Err(KefuError::Provider {
                message: reason,
                source: None,
            }),
            Some(SendScript::Reply(reply)) => {
                lock(&self.sent).push(message.clone());
                Ok(reply)
            }
            None => {
                lock(&self.sent).push(message.clone());
                Ok(ProviderReply {
                    errcode: 0,
                    errmsg: "ok".to_string(),
                })
            }
        }
    }
}
