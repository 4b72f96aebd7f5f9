// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kefu message relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Kefu configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KefuConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Online/offline verdict settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Agent live-channel timings.
    #[serde(default)]
    pub live: LiveConfig,

    /// Push provider and worker pool settings.
    #[serde(default)]
    pub push: PushConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "kefu.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Presence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// A user is online when active strictly less than this many seconds ago.
    #[serde(default = "default_online_window_secs")]
    pub online_window_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_window_secs: default_online_window_secs(),
        }
    }
}

fn default_online_window_secs() -> u64 {
    60
}

/// Live-channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LiveConfig {
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Close the channel when nothing (data or pong) arrives for this long.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Frames queued per channel before further frames are dropped.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_outbound_buffer() -> usize {
    64
}

/// Push notifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Disable to run without any outbound provider calls.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Provider API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Text payloads longer than this are truncated (counted in characters).
    #[serde(default = "default_content_max_chars")]
    pub content_max_chars: usize,

    /// Mini-program page opened from the notification.
    #[serde(default = "default_page")]
    pub page: String,

    #[serde(default = "default_miniprogram_state")]
    pub miniprogram_state: String,

    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            content_max_chars: default_content_max_chars(),
            page: default_page(),
            miniprogram_state: default_miniprogram_state(),
            lang: default_lang(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.weixin.qq.com".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_content_max_chars() -> usize {
    20
}

fn default_page() -> String {
    "pages/index/index?p=true".to_string()
}

fn default_miniprogram_state() -> String {
    "formal".to_string()
}

fn default_lang() -> String {
    "zh_CN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}
