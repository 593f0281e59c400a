//! Launcher configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Source-control settings for manifest and template retrieval.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RemoteConfig {
    /// Repository URL the manifest and templates are fetched from.
    #[serde(default)]
    pub repo_url: String,
    /// Branch whose head is read.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Path of the versions manifest inside the repository.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Directory inside the repository holding the compose templates.
    #[serde(default = "default_template_dir")]
    pub template_dir: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            branch: default_branch(),
            manifest_path: default_manifest_path(),
            template_dir: default_template_dir(),
        }
    }
}

impl RemoteConfig {
    /// Repository path of the compose template for `composition`.
    #[must_use]
    pub fn template_path_for(&self, composition: &str) -> String {
        format!(
            "{}/docker-compose-{composition}.yml",
            self.template_dir.trim_end_matches('/')
        )
    }
}

fn default_branch() -> String {
    "main".to_owned()
}

fn default_manifest_path() -> String {
    "docker/compose/versions.json".to_owned()
}

fn default_template_dir() -> String {
    "docker/compose".to_owned()
}

fn default_engine_binary() -> String {
    "docker".to_owned()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_discovery_timeout() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    10
}

/// Root configuration structure, loaded from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Development mode: bundled fixtures instead of remote retrieval.
    #[serde(default)]
    pub dev_mode: bool,
    /// Container-engine binary name or path.
    #[serde(default = "default_engine_binary")]
    pub engine_binary: String,
    /// Seconds between container polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Bound, in seconds, applied to auxiliary discovery calls.
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_seconds: u64,
    /// Grace period, in seconds, for the in-flight task at shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Directory for daily activity log files; file logging is disabled
    /// when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Parent directory for ephemeral working directories; the system temp
    /// directory when unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
    /// Remote retrieval settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dev_mode: false,
            engine_binary: default_engine_binary(),
            poll_interval_seconds: default_poll_interval(),
            discovery_timeout_seconds: default_discovery_timeout(),
            shutdown_grace_seconds: default_shutdown_grace(),
            log_dir: None,
            scratch_root: None,
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: from `path` when given, defaults otherwise,
    /// forcing development mode when `force_dev` is set.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the file cannot be read or parsed
    /// or when validation fails.
    pub fn load(path: Option<&Path>, force_dev: bool) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                toml::from_str::<Self>(&raw)?
            }
            None => Self::default(),
        };
        if force_dev {
            config.dev_mode = true;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] on parse or validation failure.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "poll_interval_seconds must be greater than zero".to_owned(),
            ));
        }
        if self.engine_binary.trim().is_empty() {
            return Err(AppError::Config("engine_binary must not be empty".to_owned()));
        }
        if !self.dev_mode && self.remote.repo_url.trim().is_empty() {
            return Err(AppError::Config(
                "remote.repo_url must be set outside development mode".to_owned(),
            ));
        }
        Ok(())
    }

    /// Interval between container polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Bound applied to auxiliary discovery calls.
    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_seconds)
    }

    /// Grace period for the in-flight task at shutdown.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// The scratch root for ephemeral directories, defaulting to the
    /// system temp directory.
    #[must_use]
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
