//! Configuration module for the indexer.
//!
//! Layered configuration: defaults, then an optional `codegraph.toml`, then
//! environment variables, then CLI argument overrides applied by the caller.
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `CODEGRAPH_` and use double
//! underscores to separate nested levels:
//! - `CODEGRAPH_GRAPH__PORT=7688` sets `graph.port`
//! - `CODEGRAPH_WATCH__DEBOUNCE_SECONDS=1.5` sets `watch.debounce_seconds`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{IndexError, IndexResult};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Graph store connection
    #[serde(default)]
    pub graph: GraphConfig,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Watch-mode configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphConfig {
    /// Graph store host
    #[serde(default = "default_host")]
    pub host: String,

    /// Graph store port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Node/edge batch size before an implicit submit
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Extra ignore patterns on top of the built-in set
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Respect .gitignore files during traversal
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Quiet period before a changed file is re-indexed, in seconds
    #[serde(default = "default_debounce")]
    pub debounce_seconds: f64,

    /// Hard deadline after which a continuously-edited file is re-indexed
    /// anyway, in seconds
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    7687
}
fn default_batch_size() -> usize {
    1000
}
fn default_true() -> bool {
    true
}
fn default_debounce() -> f64 {
    2.0
}
fn default_max_wait() -> f64 {
    30.0
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            respect_gitignore: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce(),
            max_wait_seconds: default_max_wait(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            indexing: IndexingConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> IndexResult<Self> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("codegraph.toml"))
            .merge(Env::prefixed("CODEGRAPH_").split("__"))
            .extract()
            .map_err(|e| IndexError::Config {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.graph.host, "localhost");
        assert_eq!(settings.graph.port, 7687);
        assert!(settings.watch.debounce_seconds > 0.0);
        assert!(settings.watch.max_wait_seconds > settings.watch.debounce_seconds);
    }
}
