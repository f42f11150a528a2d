// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor configuration.
//!
//! Loaded from a TOML file, then overridden by `XJ_*` environment
//! variables, then validated. The admin base URL must be a `http(s)://`
//! URL ending in `/` (the admin client joins relative paths onto it).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("admin_base_url must look like http://localhost:8080/xxl-job-admin/api/, got {0:?}")]
    InvalidAdminBaseUrl(String),
    #[error("app_name is required")]
    MissingAppName,
    #[error("log backend {backend} requires config item {item}")]
    MissingBackendItem {
        backend: LogBackend,
        item: &'static str,
    },
    #[error("invalid value for environment override {var}: {value:?}")]
    InvalidEnvOverride { var: &'static str, value: String },
}

/// Where task logs are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    #[default]
    Disk,
    Redis,
    Sqlite,
}

impl fmt::Display for LogBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogBackend::Disk => write!(f, "disk"),
            LogBackend::Redis => write!(f, "redis"),
            LogBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Configuration for one executor process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Scheduler REST base URL, e.g. `http://localhost:8080/xxl-job-admin/api/`.
    pub admin_base_url: String,
    /// Executor name as defined on the admin side; the registry key.
    pub app_name: String,
    /// Optional scheduler access token, sent as `XXL-JOB-ACCESS-TOKEN`.
    #[serde(default)]
    pub access_token: Option<String>,
    /// URL the scheduler uses to reach this executor. Defaults to
    /// `http://{listen_host}:{listen_port}`.
    #[serde(default)]
    pub advertise_url: Option<String>,
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Blocking worker pool size.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Default per-task timeout in seconds; a positive `executorTimeout`
    /// on the run request wins.
    #[serde(default = "default_task_timeout")]
    pub task_timeout: u64,
    /// Per-job pending queue cap for SERIAL_EXECUTION.
    #[serde(default = "default_task_queue_length")]
    pub task_queue_length: usize,
    /// The executor's own log file (task logs live in the log backend).
    /// Rotated at startup when it has grown too large.
    #[serde(default = "default_executor_log_path")]
    pub executor_log_path: PathBuf,
    /// Drain running and queued work on shutdown instead of cancelling.
    #[serde(default)]
    pub graceful_close: bool,
    /// Seconds to wait for the drain before forcing cancellation.
    #[serde(default = "default_graceful_timeout")]
    pub graceful_timeout: u64,
    #[serde(default)]
    pub log_backend: LogBackend,
    /// Directory for the disk backend, database directory for sqlite.
    #[serde(default = "default_log_local_dir")]
    pub log_local_dir: PathBuf,
    /// Connection URI for the redis backend.
    #[serde(default)]
    pub log_redis_uri: Option<String>,
    /// Task log retention in days.
    #[serde(default = "default_log_expired_days")]
    pub log_expired_days: u32,
    /// Raise log verbosity (task loggers emit DEBUG records).
    #[serde(default)]
    pub debug: bool,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    9999
}

fn default_max_workers() -> usize {
    30
}

fn default_task_timeout() -> u64 {
    600
}

fn default_task_queue_length() -> usize {
    30
}

fn default_graceful_timeout() -> u64 {
    300
}

fn default_executor_log_path() -> PathBuf {
    PathBuf::from("xj.log")
}

fn default_log_local_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_expired_days() -> u32 {
    14
}

impl ExecutorConfig {
    /// Minimal config with defaults for everything optional.
    pub fn new(admin_base_url: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            admin_base_url: admin_base_url.into(),
            app_name: app_name.into(),
            access_token: None,
            advertise_url: None,
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            max_workers: default_max_workers(),
            task_timeout: default_task_timeout(),
            task_queue_length: default_task_queue_length(),
            executor_log_path: default_executor_log_path(),
            graceful_close: false,
            graceful_timeout: default_graceful_timeout(),
            log_backend: LogBackend::default(),
            log_local_dir: default_log_local_dir(),
            log_redis_uri: None,
            log_expired_days: default_log_expired_days(),
            debug: false,
        }
    }

    /// Load from a TOML file, apply `XJ_*` env overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ExecutorConfig =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `XJ_*` environment variables.
    ///
    /// String fields take the value verbatim; numeric and boolean fields
    /// must parse or the override is rejected.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        fn var(name: &'static str) -> Option<(&'static str, String)> {
            std::env::var(name).ok().map(|v| (name, v))
        }

        if let Some((_, v)) = var("XJ_ADMIN_BASE_URL") {
            self.admin_base_url = v;
        }
        if let Some((_, v)) = var("XJ_APP_NAME") {
            self.app_name = v;
        }
        if let Some((_, v)) = var("XJ_ACCESS_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some((_, v)) = var("XJ_ADVERTISE_URL") {
            self.advertise_url = Some(v);
        }
        if let Some((_, v)) = var("XJ_LISTEN_HOST") {
            self.listen_host = v;
        }
        if let Some((name, v)) = var("XJ_LISTEN_PORT") {
            self.listen_port = parse_override(name, &v)?;
        }
        if let Some((name, v)) = var("XJ_MAX_WORKERS") {
            self.max_workers = parse_override(name, &v)?;
        }
        if let Some((name, v)) = var("XJ_TASK_TIMEOUT") {
            self.task_timeout = parse_override(name, &v)?;
        }
        if let Some((name, v)) = var("XJ_TASK_QUEUE_LENGTH") {
            self.task_queue_length = parse_override(name, &v)?;
        }
        if let Some((_, v)) = var("XJ_EXECUTOR_LOG_PATH") {
            self.executor_log_path = PathBuf::from(v);
        }
        if let Some((name, v)) = var("XJ_GRACEFUL_CLOSE") {
            self.graceful_close = parse_override(name, &v)?;
        }
        if let Some((name, v)) = var("XJ_GRACEFUL_TIMEOUT") {
            self.graceful_timeout = parse_override(name, &v)?;
        }
        if let Some((name, v)) = var("XJ_LOG_BACKEND") {
            self.log_backend = match v.as_str() {
                "disk" => LogBackend::Disk,
                "redis" => LogBackend::Redis,
                "sqlite" => LogBackend::Sqlite,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        var: name,
                        value: v,
                    })
                }
            };
        }
        if let Some((_, v)) = var("XJ_LOG_LOCAL_DIR") {
            self.log_local_dir = PathBuf::from(v);
        }
        if let Some((_, v)) = var("XJ_LOG_REDIS_URI") {
            self.log_redis_uri = Some(v);
        }
        if let Some((name, v)) = var("XJ_LOG_EXPIRED_DAYS") {
            self.log_expired_days = parse_override(name, &v)?;
        }
        if let Some((name, v)) = var("XJ_DEBUG") {
            self.debug = parse_override(name, &v)?;
        }
        Ok(())
    }

    /// Check required fields and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.admin_base_url;
        let scheme_ok = url.starts_with("http://") || url.starts_with("https://");
        if !scheme_ok || !url.ends_with('/') {
            return Err(ConfigError::InvalidAdminBaseUrl(url.clone()));
        }
        if self.app_name.is_empty() {
            return Err(ConfigError::MissingAppName);
        }
        match self.log_backend {
            LogBackend::Disk | LogBackend::Sqlite => {
                if self.log_local_dir.as_os_str().is_empty() {
                    return Err(ConfigError::MissingBackendItem {
                        backend: self.log_backend,
                        item: "log_local_dir",
                    });
                }
            }
            LogBackend::Redis => {
                if self.log_redis_uri.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::MissingBackendItem {
                        backend: self.log_backend,
                        item: "log_redis_uri",
                    });
                }
            }
        }
        Ok(())
    }

    /// URL announced to the scheduler in registry heartbeats.
    pub fn advertise_url(&self) -> String {
        match &self.advertise_url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}", self.listen_host, self.listen_port),
        }
    }
}

fn parse_override<T: std::str::FromStr>(
    var: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            var,
            value: value.to_string(),
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
