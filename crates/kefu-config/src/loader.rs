// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/kefu/kefu.toml`, `~/.config/kefu/kefu.toml`,
//! `./kefu.toml`, then `KEFU_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KefuConfig;

/// Config sections addressable from the environment.
const ENV_SECTIONS: &[&str] = &["server", "storage", "presence", "live", "push"];

/// Candidate config files, lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/kefu/kefu.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("kefu/kefu.toml"));
    }
    paths.push(PathBuf::from("kefu.toml"));
    paths
}

/// Build the Figment for the standard hierarchy without extracting it.
pub fn build_figment() -> Figment {
    config_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(KefuConfig::default())),
            |figment, path| {
                if path.exists() {
                    tracing::debug!(path = %path.display(), "config file found");
                }
                figment.merge(Toml::file(path))
            },
        )
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<KefuConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<KefuConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KefuConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KefuConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KefuConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Maps `KEFU_<SECTION>_<KEY>` onto `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `KEFU_PUSH_BASE_URL` lands on `push.base_url`.
fn env_provider() -> Env {
    Env::prefixed("KEFU_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
