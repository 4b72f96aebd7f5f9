// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kefu serve`: wires storage, push, routing and the gateway together.

use std::sync::Arc;
use std::time::Duration;

use kefu_config::model::{KefuConfig, LiveConfig};
use kefu_core::{Adapter, HealthStatus, KefuError, PresenceTracker, PushDispatch};
use kefu_gateway::{GatewayState, LiveSettings, ServerConfig};
use kefu_push::{DisabledDispatch, Notifier, PushQueue, WechatClient};
use kefu_router::{ConnectionRegistry, MessageRouter};
use kefu_storage::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the relay until SIGINT or SIGTERM.
pub async fn run_serve(config: KefuConfig) -> Result<(), KefuError> {
    init_tracing(&config.server.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "kefu starting");

    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    match store.health_check().await? {
        HealthStatus::Healthy => info!(path = %config.storage.database_path, "storage ready"),
        HealthStatus::Degraded(reason) => warn!(%reason, "storage degraded"),
        HealthStatus::Unhealthy(reason) => {
            return Err(KefuError::Internal(format!("storage unhealthy: {reason}")));
        }
    }

    let presence = PresenceTracker::from_secs(config.presence.online_window_secs);

    // The push queue gets its own token so it drains after the gateway stops.
    let push_cancel = CancellationToken::new();
    let queue = if config.push.enabled {
        let provider = Arc::new(WechatClient::new(&config.push)?);
        let notifier = Arc::new(Notifier::new(
            store.clone(),
            provider,
            presence,
            config.push.content_max_chars,
        ));
        Some(Arc::new(PushQueue::start(
            notifier,
            config.push.workers,
            config.push.queue_capacity,
            push_cancel.clone(),
        )))
    } else {
        info!("push delivery disabled");
        None
    };
    let dispatch: Arc<dyn PushDispatch> = match &queue {
        Some(queue) => queue.clone(),
        None => Arc::new(DisabledDispatch),
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let router = MessageRouter::new(store.clone(), Arc::clone(&registry), dispatch, presence);
    let state = GatewayState::new(router, live_settings(&config.live));
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    let cancel = shutdown::install_signal_handler();
    {
        let cancel = cancel.clone();
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            cancel.cancelled().await;
            info!(connections = registry.len(), "closing live channels");
            registry.close_all();
        });
    }

    let served = kefu_gateway::start_server(&server_config, state, cancel.clone()).await;
    cancel.cancel();

    if let Some(queue) = &queue {
        queue.shutdown().await;
    }
    if let Err(e) = store.shutdown().await {
        error!(error = %e, "storage shutdown failed");
    }

    served?;
    info!("kefu serve shutdown complete");
    Ok(())
}

/// Maps the `[live]` section onto gateway connection settings.
pub fn live_settings(config: &LiveConfig) -> LiveSettings {
    LiveSettings {
        ping_interval: Duration::from_secs(config.ping_interval_secs),
        read_timeout: Duration::from_secs(config.read_timeout_secs),
        write_timeout: Duration::from_secs(config.write_timeout_secs),
        outbound_buffer: config.outbound_buffer,
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kefu={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_settings_follow_config() {
        let live = live_settings(&LiveConfig::default());
        assert_eq!(live.ping_interval, Duration::from_secs(30));
        assert_eq!(live.read_timeout, Duration::from_secs(60));
        assert_eq!(live.write_timeout, Duration::from_secs(10));
        assert_eq!(live.outbound_buffer, 64);
    }
}
