// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::KefuConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MINIPROGRAM_STATES: &[&str] = &["developer", "trial", "formal"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &KefuConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.presence.online_window_secs == 0 {
        fail("presence.online_window_secs must be greater than 0".to_string());
    }

    let live = &config.live;
    if live.ping_interval_secs == 0 {
        fail("live.ping_interval_secs must be greater than 0".to_string());
    }
    if live.read_timeout_secs <= live.ping_interval_secs {
        fail(format!(
            "live.read_timeout_secs ({}) must be greater than live.ping_interval_secs ({})",
            live.read_timeout_secs, live.ping_interval_secs
        ));
    }
    if live.write_timeout_secs == 0 {
        fail("live.write_timeout_secs must be greater than 0".to_string());
    }
    if live.outbound_buffer == 0 {
        fail("live.outbound_buffer must be greater than 0".to_string());
    }

    let push = &config.push;
    if !(push.base_url.starts_with("http://") || push.base_url.starts_with("https://")) {
        fail(format!(
            "push.base_url must start with http:// or https://, got `{}`",
            push.base_url
        ));
    }
    if push.workers == 0 {
        fail("push.workers must be greater than 0".to_string());
    }
    if push.queue_capacity == 0 {
        fail("push.queue_capacity must be greater than 0".to_string());
    }
    if push.content_max_chars == 0 {
        fail("push.content_max_chars must be greater than 0".to_string());
    }
    if !MINIPROGRAM_STATES.contains(&push.miniprogram_state.as_str()) {
        fail(format!(
            "push.miniprogram_state must be one of {}, got `{}`",
            MINIPROGRAM_STATES.join(", "),
            push.miniprogram_state
        ));
    }
    if push.request_timeout_secs == 0 {
        fail("push.request_timeout_secs must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
