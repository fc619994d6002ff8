//! Application configuration.
//!
//! Loaded from an optional YAML file, then overridden from the environment:
//!
//! | Variable                           | Field                             |
//! |------------------------------------|-----------------------------------|
//! | `ENVIRONMENT`                      | `environment`                     |
//! | `API_SERVER_ADDR`                  | `api.addr`                        |
//! | `API_SERVER_REQUEST_TIMEOUT_MS`    | `api.request_timeout_ms`          |
//! | `API_SERVER_METRICS_PATH`          | `api.metrics_path`                |
//! | `API_SERVER_METRICS_SUBSYSTEM`     | `api.metrics_subsystem`           |
//! | `PARSER_CLIENT_RPC_ADDRESS`        | `parser.rpc_address`              |
//! | `PARSER_CLIENT_REQUEST_TIMEOUT_MS` | `parser.request_timeout_ms`       |
//! | `PARSER_INDEX_INTERVAL_MS`         | `parser.indexer.poll_interval_ms` |
//! | `GRACEFUL_SHUTDOWN_TIMEOUT_MS`     | `graceful_shutdown_timeout_ms`    |
//! | `LOG_LEVEL`                        | `log.level`                       |

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use txwatch_api::RouterConfig;
use txwatch_core::indexer::IndexerConfig;
use txwatch_core::store::MAX_TXS_PER_ADDRESS;
use txwatch_evm::DEFAULT_RPC_URL;

use crate::logging::LogConfig;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!("expected development or production, got {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiServerConfig {
    pub addr: String,
    pub request_timeout_ms: u64,
    /// Route serving Prometheus metrics.
    pub metrics_path: String,
    /// Metric name subsystem, e.g. `txwatch_api_requests_total`.
    pub metrics_subsystem: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".into(),
            request_timeout_ms: 10_000,
            metrics_path: "/metrics".into(),
            metrics_subsystem: "api".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub rpc_address: String,
    pub request_timeout_ms: u64,
    pub indexer: IndexerConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            rpc_address: DEFAULT_RPC_URL.into(),
            request_timeout_ms: 30_000,
            indexer: IndexerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiServerConfig,
    pub parser: ParserConfig,
    pub graceful_shutdown_timeout_ms: u64,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiServerConfig::default(),
            parser: ParserConfig::default(),
            graceful_shutdown_timeout_ms: 30_000,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_PATH`]) and the process environment.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Override fields from variables resolved by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ENVIRONMENT") {
            self.environment = v.parse().map_err(|reason| ConfigError::Env {
                var: "ENVIRONMENT",
                value: v.clone(),
                reason,
            })?;
        }
        if let Some(v) = lookup("API_SERVER_ADDR") {
            self.api.addr = v;
        }
        if let Some(v) = lookup("API_SERVER_METRICS_PATH") {
            self.api.metrics_path = v;
        }
        if let Some(v) = lookup("API_SERVER_METRICS_SUBSYSTEM") {
            self.api.metrics_subsystem = v;
        }
        if let Some(v) = lookup("PARSER_CLIENT_RPC_ADDRESS") {
            self.parser.rpc_address = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log.level = v;
        }

        let millis = [
            ("API_SERVER_REQUEST_TIMEOUT_MS", &mut self.api.request_timeout_ms),
            ("PARSER_CLIENT_REQUEST_TIMEOUT_MS", &mut self.parser.request_timeout_ms),
            ("PARSER_INDEX_INTERVAL_MS", &mut self.parser.indexer.poll_interval_ms),
            ("GRACEFUL_SHUTDOWN_TIMEOUT_MS", &mut self.graceful_shutdown_timeout_ms),
        ];
        for (var, field) in millis {
            if let Some(v) = lookup(var) {
                *field = v.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
                    var,
                    value: v.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        if self.environment == Environment::Production {
            self.log.json = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_addr()?;
        if self.parser.rpc_address.trim().is_empty() {
            return Err(ConfigError::Invalid("parser.rpc_address must not be empty".into()));
        }
        for (name, value) in [
            ("api.request_timeout_ms", self.api.request_timeout_ms),
            ("parser.request_timeout_ms", self.parser.request_timeout_ms),
            ("parser.indexer.poll_interval_ms", self.parser.indexer.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        let limit = self.parser.indexer.history_limit;
        if !(1..=MAX_TXS_PER_ADDRESS).contains(&limit) {
            return Err(ConfigError::Invalid(format!(
                "parser.indexer.history_limit must be between 1 and {MAX_TXS_PER_ADDRESS}, got {limit}"
            )));
        }
        let metrics_path = &self.api.metrics_path;
        if !metrics_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "api.metrics_path must start with '/', got {metrics_path:?}"
            )));
        }
        if metrics_path.starts_with("/public/") || metrics_path.starts_with("/-/") {
            return Err(ConfigError::Invalid(format!(
                "api.metrics_path {metrics_path:?} overlaps an API route"
            )));
        }
        Ok(())
    }

    /// API listen address. A bare `:port` binds all interfaces.
    pub fn api_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = &self.api.addr;
        let full = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr.clone()
        };
        full.parse()
            .map_err(|e| ConfigError::Invalid(format!("api.addr {addr:?}: {e}")))
    }

    pub fn api_request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            request_timeout: self.api_request_timeout(),
            metrics_path: self.api.metrics_path.clone(),
            metrics_subsystem: self.api.metrics_subsystem.clone(),
        }
    }

    pub fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.api_addr().unwrap(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.api_request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.parser.rpc_address, "http://127.0.0.1:8545");
        assert_eq!(cfg.parser.request_timeout_ms, 30_000);
        assert_eq!(cfg.parser.indexer.poll_interval_ms, 10_000);
        assert_eq!(cfg.graceful_shutdown_timeout(), Duration::from_secs(30));
        assert!(!cfg.log.json);
        assert_eq!(cfg.api.metrics_path, "/metrics");
        assert_eq!(cfg.api.metrics_subsystem, "api");
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_yaml() {
        let cfg = AppConfig::from_yaml(
            r#"
environment: production
parser:
  rpc_address: https://rpc.example.org
  indexer:
    poll_interval_ms: 12000
    backoff:
      max_elapsed_ms: 5000
log:
  level: debug
  components:
    txwatch-core: trace
"#,
        )
        .unwrap();

        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.parser.rpc_address, "https://rpc.example.org");
        assert_eq!(cfg.parser.request_timeout_ms, 30_000);
        assert_eq!(cfg.parser.indexer.poll_interval_ms, 12_000);
        assert_eq!(cfg.parser.indexer.backoff.max_elapsed_ms, 5_000);
        assert_eq!(cfg.parser.indexer.backoff.initial_interval_ms, 250);
        assert_eq!(cfg.api.addr, "0.0.0.0:8080");
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(env(&[
            ("ENVIRONMENT", "Production"),
            ("API_SERVER_ADDR", ":9090"),
            ("API_SERVER_METRICS_PATH", "/internal/metrics"),
            ("API_SERVER_METRICS_SUBSYSTEM", "public"),
            ("PARSER_CLIENT_RPC_ADDRESS", "http://node:8545"),
            ("PARSER_INDEX_INTERVAL_MS", "2500"),
            ("GRACEFUL_SHUTDOWN_TIMEOUT_MS", "5000"),
            ("LOG_LEVEL", "warn"),
        ]))
        .unwrap();

        assert_eq!(cfg.environment, Environment::Production);
        assert!(cfg.log.json, "production logs as JSON");
        assert_eq!(cfg.api_addr().unwrap(), "0.0.0.0:9090".parse().unwrap());
        assert_eq!(cfg.parser.rpc_address, "http://node:8545");
        assert_eq!(cfg.parser.indexer.poll_interval_ms, 2_500);
        assert_eq!(cfg.graceful_shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.log.level, "warn");

        let router = cfg.router_config();
        assert_eq!(router.metrics_path, "/internal/metrics");
        assert_eq!(router.metrics_subsystem, "public");
    }

    #[test]
    fn bad_env_values_are_reported() {
        let mut cfg = AppConfig::default();
        let err = cfg
            .apply_env(env(&[("PARSER_INDEX_INTERVAL_MS", "10s")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "PARSER_INDEX_INTERVAL_MS", .. }));

        let err = cfg.apply_env(env(&[("ENVIRONMENT", "staging")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "ENVIRONMENT", .. }));
    }

    #[test]
    fn validation() {
        let mut cfg = AppConfig::default();
        cfg.api.addr = "not an addr".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = AppConfig::default();
        cfg.parser.indexer.poll_interval_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = AppConfig::default();
        cfg.api.metrics_path = "metrics".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
        cfg.api.metrics_path = "/-/live".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn history_limit_must_fit_the_store_cap() {
        let cfg = AppConfig::from_yaml("parser:\n  indexer:\n    history_limit: 500\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("history_limit"), "{err}");

        let cfg = AppConfig::from_yaml("parser:\n  indexer:\n    history_limit: 0\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let cfg = AppConfig::from_yaml("parser:\n  indexer:\n    history_limit: 100\n").unwrap();
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/txwatch.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
