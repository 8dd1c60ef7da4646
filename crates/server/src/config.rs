//! Configuration file support for zkmcp.
//!
//! Loads settings from `~/.zkmcp/config.toml` (or the file named by
//! `ZKMCP_CONFIG`) with the following precedence:
//! CLI arguments > Environment variables > Config file
//!
//! ## Configuration File Format
//!
//! ```toml
//! # ~/.zkmcp/config.toml
//!
//! [bridge]
//! # Metadata catalog files, loaded in order
//! catalogs = ["/etc/zkmcp/catalog.json"]
//!
//! # Approval records and audit log
//! approvals_file = "/var/lib/zkmcp/approvals.json"
//!
//! # Seconds between reconcile passes
//! reconcile_secs = 30
//!
//! # Object nesting expanded into tool schemas
//! max_depth = 8
//!
//! # Publish unrecognised method names as zero-argument tools
//! heuristic_fallback = true
//!
//! [entities]
//! user = "com.example.model.User"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use zkmcp_metadata::HeuristicOptions;
use zkmcp_schema::SchemaOptions;
use zkmcp_state::{env_flag, env_u64};

use crate::bridge::BridgeOptions;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "ZKMCP_CONFIG";
/// Comma-separated catalog files.
pub const ENV_CATALOGS: &str = "ZKMCP_CATALOGS";
/// Approval snapshot path.
pub const ENV_APPROVALS_FILE: &str = "ZKMCP_APPROVALS_FILE";
/// Reconcile interval in seconds.
pub const ENV_RECONCILE_SECS: &str = "ZKMCP_RECONCILE_SECS";
/// Schema nesting limit.
pub const ENV_MAX_DEPTH: &str = "ZKMCP_MAX_DEPTH";
/// Heuristic zero-argument fallback.
pub const ENV_HEURISTIC_FALLBACK: &str = "ZKMCP_HEURISTIC_FALLBACK";

const DEFAULT_RECONCILE_SECS: u64 = 30;

/// Top-level configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Entity name to model type hints for name heuristics.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

/// Configuration for the bridge.
#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfig {
    /// Metadata catalog files.
    #[serde(default)]
    pub catalogs: Vec<String>,
    /// Approval snapshot path.
    pub approvals_file: Option<String>,
    /// Seconds between reconcile passes.
    pub reconcile_secs: Option<u64>,
    /// Schema nesting limit.
    pub max_depth: Option<u64>,
    /// Heuristic zero-argument fallback.
    pub heuristic_fallback: Option<bool>,
}

/// Returns the path to the config file (`ZKMCP_CONFIG` or ~/.zkmcp/config.toml).
fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(ENV_CONFIG) {
        if !explicit.trim().is_empty() {
            return Some(PathBuf::from(explicit));
        }
    }
    zkmcp_state::home_dir()
        .ok()
        .map(|h| h.join(".zkmcp").join("config.toml"))
}

/// Loads the configuration file if it exists.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if the file exists but fails to parse.
pub fn load_config() -> Result<Option<Config>> {
    let Some(path) = config_path() else {
        return Ok(None);
    };

    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;

    tracing::debug!(
        target: "zkmcp::config",
        path = %path.display(),
        "Loaded configuration file"
    );

    Ok(Some(config))
}

/// Applies configuration file settings to environment variables and returns
/// the entity hints from the file.
///
/// Only sets environment variables that are not already set, preserving
/// the precedence: CLI > ENV > config file.
pub fn apply_config_to_env() -> Result<BTreeMap<String, String>> {
    match load_config()? {
        Some(config) => {
            apply_bridge_config_to_env(&config.bridge);
            Ok(config.entities)
        }
        None => Ok(BTreeMap::new()),
    }
}

fn apply_bridge_config_to_env(bridge: &BridgeConfig) {
    fn set_if_absent(key: &str, value: &str) {
        if std::env::var(key).is_err() {
            std::env::set_var(key, value);
            tracing::trace!(
                target: "zkmcp::config",
                key,
                "Set environment variable from config file"
            );
        }
    }

    if !bridge.catalogs.is_empty() {
        set_if_absent(ENV_CATALOGS, &bridge.catalogs.join(","));
    }
    if let Some(ref path) = bridge.approvals_file {
        set_if_absent(ENV_APPROVALS_FILE, path);
    }
    if let Some(secs) = bridge.reconcile_secs {
        set_if_absent(ENV_RECONCILE_SECS, &secs.to_string());
    }
    if let Some(depth) = bridge.max_depth {
        set_if_absent(ENV_MAX_DEPTH, &depth.to_string());
    }
    if let Some(fallback) = bridge.heuristic_fallback {
        set_if_absent(ENV_HEURISTIC_FALLBACK, if fallback { "true" } else { "false" });
    }
}

/// Effective settings after CLI, environment and file are merged.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Catalog files, in load order.
    pub catalogs: Vec<PathBuf>,
    /// Approval snapshot path.
    pub approvals_file: Option<PathBuf>,
    /// Interval between reconcile passes.
    pub reconcile_interval: Duration,
    /// Resolution and schema tunables.
    pub options: BridgeOptions,
    /// Entity hints.
    pub entities: BTreeMap<String, String>,
}

impl Settings {
    /// Reads settings from the environment; CLI values override afterwards.
    pub fn from_env(entities: BTreeMap<String, String>) -> Self {
        let catalogs = std::env::var(ENV_CATALOGS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();
        let approvals_file = std::env::var(ENV_APPROVALS_FILE).ok().map(PathBuf::from);
        let reconcile_interval = Duration::from_secs(
            env_u64(ENV_RECONCILE_SECS)
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_RECONCILE_SECS),
        );
        let mut schema = SchemaOptions::default();
        if let Some(depth) = env_u64(ENV_MAX_DEPTH) {
            schema.max_depth = usize::try_from(depth).unwrap_or(usize::MAX);
        }
        let mut heuristics = HeuristicOptions::default();
        if let Some(fallback) = env_flag(ENV_HEURISTIC_FALLBACK) {
            heuristics.unmatched_as_no_args = fallback;
        }
        Self {
            catalogs,
            approvals_file,
            reconcile_interval,
            options: BridgeOptions { schema, heuristics },
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_guard;
    use zkmcp_test_utils::set_env_var;

    #[test]
    fn config_path_defaults_under_home() {
        let _g = env_guard();
        let _c = set_env_var(ENV_CONFIG, None);
        let path = config_path().unwrap();
        assert!(path.ends_with(".zkmcp/config.toml"));
    }

    #[test]
    fn explicit_config_path_wins() {
        let _g = env_guard();
        let _c = set_env_var(ENV_CONFIG, Some("/tmp/zkmcp-explicit.toml"));
        assert_eq!(config_path(), Some(PathBuf::from("/tmp/zkmcp-explicit.toml")));
    }

    #[test]
    fn parse_minimal_config() {
        let config: Config = toml::from_str("[bridge]\n").unwrap();
        assert!(config.bridge.catalogs.is_empty());
        assert!(config.entities.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [bridge]
            catalogs = ["/a.json", "/b.json"]
            approvals_file = "/var/lib/zkmcp/approvals.json"
            reconcile_secs = 5
            max_depth = 3
            heuristic_fallback = false

            [entities]
            user = "com.example.model.User"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bridge.catalogs, vec!["/a.json", "/b.json"]);
        assert_eq!(config.bridge.reconcile_secs, Some(5));
        assert_eq!(config.bridge.max_depth, Some(3));
        assert_eq!(config.bridge.heuristic_fallback, Some(false));
        assert_eq!(config.entities["user"], "com.example.model.User");
    }

    #[test]
    fn file_values_fill_only_missing_env() {
        let _g = env_guard();
        let _a = set_env_var(ENV_RECONCILE_SECS, Some("7"));
        let _b = set_env_var(ENV_MAX_DEPTH, None);
        let _c = set_env_var(ENV_HEURISTIC_FALLBACK, None);
        let _d = set_env_var(ENV_CATALOGS, None);
        let _e = set_env_var(ENV_APPROVALS_FILE, None);

        apply_bridge_config_to_env(&BridgeConfig {
            catalogs: vec!["/x.json".into()],
            reconcile_secs: Some(60),
            max_depth: Some(2),
            heuristic_fallback: Some(false),
            ..Default::default()
        });

        let settings = Settings::from_env(BTreeMap::new());
        assert_eq!(settings.reconcile_interval, Duration::from_secs(7));
        assert_eq!(settings.options.schema.max_depth, 2);
        assert!(!settings.options.heuristics.unmatched_as_no_args);
        assert_eq!(settings.catalogs, vec![PathBuf::from("/x.json")]);
        assert!(settings.approvals_file.is_none());
    }
}
