// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by storage and push-provider backends.

use async_trait::async_trait;

use crate::error::KefuError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle of a backend adapter.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the kind of backend this adapter fronts.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, KefuError>;

    /// Releases held resources. Called once during graceful shutdown.
    async fn shutdown(&self) -> Result<(), KefuError> {
        Ok(())
    }
}
