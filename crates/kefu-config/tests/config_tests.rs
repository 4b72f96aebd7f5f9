// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Kefu configuration system.

use std::path::Path;

use kefu_config::diagnostic::ConfigError;
use kefu_config::model::KefuConfig;
use kefu_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

#[test]
fn valid_toml_deserializes_into_kefu_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"

[storage]
database_path = "/tmp/kefu-test.db"
wal_mode = false

[presence]
online_window_secs = 90

[live]
ping_interval_secs = 15
read_timeout_secs = 45

[push]
enabled = false
base_url = "http://127.0.0.1:7777"
workers = 2
content_max_chars = 30
miniprogram_state = "trial"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/kefu-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.presence.online_window_secs, 90);
    assert_eq!(config.live.ping_interval_secs, 15);
    assert_eq!(config.live.read_timeout_secs, 45);
    assert_eq!(config.live.write_timeout_secs, 10);
    assert!(!config.push.enabled);
    assert_eq!(config.push.base_url, "http://127.0.0.1:7777");
    assert_eq!(config.push.workers, 2);
    assert_eq!(config.push.content_max_chars, 30);
    assert_eq!(config.push.miniprogram_state, "trial");
    assert_eq!(config.push.lang, "zh_CN");
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.storage.database_path, "kefu.db");
    assert_eq!(config.presence.online_window_secs, 60);
    assert_eq!(config.live.ping_interval_secs, 30);
    assert_eq!(config.live.read_timeout_secs, 60);
    assert_eq!(config.push.base_url, "https://api.weixin.qq.com");
    assert_eq!(config.push.page, "pages/index/index?p=true");
    assert_eq!(config.push.queue_capacity, 1024);
}

#[test]
fn unknown_field_in_section_gets_suggestion() {
    let toml = "[presence]\nonline_windw_secs = 30\n";

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "online_windw_secs");
            assert_eq!(suggestion.as_deref(), Some("online_window_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n")
        .expect_err("unknown section should be rejected");
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n")
        .expect_err("string port should be rejected");
    assert!(
        matches!(errors[0], ConfigError::InvalidType { .. }),
        "got {:?}",
        errors[0]
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let errors = load_and_validate_str("[push]\nworkers = 0\n").expect_err("zero workers");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
    assert!(errors[0].to_string().contains("push.workers"));
}

#[test]
#[serial]
fn file_values_are_overridden_by_env() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "kefu.toml",
            "[server]\nport = 9100\n\n[push]\nworkers = 3\n",
        )?;
        jail.set_env("KEFU_PUSH_WORKERS", "8");

        let config = load_and_validate_path(Path::new("kefu.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.push.workers, 8);
        Ok(())
    });
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    figment::Jail::expect_with(|_jail| {
        let config = load_and_validate_path(Path::new("does-not-exist.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.server.port, KefuConfig::default().server.port);
        Ok(())
    });
}
