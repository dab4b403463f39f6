//! Configuration management for SAS Sync
//!
//! This module provides unified configuration with multi-source loading and
//! zero-config defaults. A TOML file with `[paths]`, `[stream]`, `[remote]`,
//! `[access]` and `[logging]` sections is converted into the runtime config
//! structs each component takes in its constructor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::access::AccessConfig;
use crate::app::path::{PreserveEnvVars, ResolverConfig};
use crate::app::remote::RemoteConfig;
use crate::app::stream::StreamConfig;
use crate::constants::{env, remote, stream};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Template store and resolver settings
    pub paths: PathsConfigToml,
    /// Stream scheduling settings
    pub stream: StreamConfigToml,
    /// Remote listing and download settings
    pub remote: RemoteConfigToml,
    /// Transfer backend settings
    pub access: AccessConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `preserve_envvars` as written in TOML: a flag or a list of names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreserveEnvVarsToml {
    Flag(bool),
    Names(Vec<String>),
}

impl Default for PreserveEnvVarsToml {
    fn default() -> Self {
        PreserveEnvVarsToml::Flag(false)
    }
}

impl PreserveEnvVarsToml {
    pub fn to_runtime_config(&self) -> PreserveEnvVars {
        match self {
            PreserveEnvVarsToml::Flag(flag) => PreserveEnvVars::from_flag(*flag),
            PreserveEnvVarsToml::Names(names) => PreserveEnvVars::Only(names.clone()),
        }
    }
}

/// TOML-friendly resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfigToml {
    /// Directory of `<release>.toml` template files
    pub template_dir: Option<PathBuf>,
    /// Release to load (unset: `$TREE_VER`, then the default release)
    pub release: Option<String>,
    /// Force public access
    pub public: bool,
    /// Use the mirror host
    pub mirror: bool,
    /// Local SAS root (unset: `$SAS_BASE_DIR`)
    pub base_dir: Option<PathBuf>,
    /// URL scheme
    pub scheme: String,
    /// Explicit host
    pub netloc: Option<String>,
    /// Directory segment between host and location
    pub sas_dir: String,
    /// Caller variables that survive release definitions
    pub preserve_envvars: PreserveEnvVarsToml,
    /// Environment variables naming alternate product roots
    pub product_roots: Vec<String>,
}

impl Default for PathsConfigToml {
    fn default() -> Self {
        Self {
            template_dir: None,
            release: None,
            public: false,
            mirror: false,
            base_dir: None,
            scheme: remote::SCHEME.to_string(),
            netloc: None,
            sas_dir: remote::SAS_SEGMENT.to_string(),
            preserve_envvars: PreserveEnvVarsToml::default(),
            product_roots: env::PRODUCT_ROOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PathsConfigToml {
    /// Convert to runtime ResolverConfig
    pub fn to_runtime_config(&self) -> ResolverConfig {
        ResolverConfig {
            release: self.release.clone(),
            public: self.public,
            mirror: self.mirror,
            base_dir: self.base_dir.clone(),
            scheme: self.scheme.clone(),
            netloc: self.netloc.clone(),
            sas_dir: self.sas_dir.clone(),
            preserve_envvars: self.preserve_envvars.to_runtime_config(),
            product_roots: self.product_roots.clone(),
        }
    }

    /// Template directory, defaulting to `<config dir>/sas-sync/templates`
    pub fn resolve_template_dir(&self) -> PathBuf {
        self.template_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("sas-sync").join("templates"))
                .unwrap_or_else(|| PathBuf::from("./templates"))
        })
    }
}

/// TOML-friendly stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfigToml {
    /// Requested parallel streams (at most 5)
    pub stream_count: usize,
    /// Interval between liveness polls, e.g. "5s"
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Hang ceiling for probe commands, e.g. "5days 18h"
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Root of run directories (unset: `$SAS_ACCESS_DATA_DIR`, then the temp dir)
    pub data_dir: Option<PathBuf>,
    /// Run label
    pub label: String,
}

impl Default for StreamConfigToml {
    fn default() -> Self {
        Self {
            stream_count: stream::DEFAULT_STREAM_COUNT,
            poll_interval: stream::POLL_INTERVAL,
            probe_timeout: stream::PROBE_TIMEOUT,
            data_dir: None,
            label: stream::DEFAULT_LABEL.to_string(),
        }
    }
}

impl StreamConfigToml {
    /// Convert to runtime StreamConfig
    pub fn to_runtime_config(&self) -> StreamConfig {
        StreamConfig {
            stream_count: self.stream_count,
            poll_interval: self.poll_interval,
            probe_timeout: self.probe_timeout,
            data_dir: self.data_dir.clone(),
            label: self.label.clone(),
        }
    }
}

/// TOML-friendly remote configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfigToml {
    /// Request timeout, e.g. "60s"
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Listing requests per second
    pub rate_limit_rps: u32,
    /// User agent header
    pub user_agent: String,
}

impl Default for RemoteConfigToml {
    fn default() -> Self {
        Self {
            timeout: remote::DEFAULT_TIMEOUT,
            rate_limit_rps: remote::DEFAULT_RATE_LIMIT_RPS,
            user_agent: remote::USER_AGENT.to_string(),
        }
    }
}

impl RemoteConfigToml {
    /// Convert to runtime RemoteConfig
    pub fn to_runtime_config(&self) -> RemoteConfig {
        RemoteConfig {
            timeout: self.timeout,
            rate_limit_rps: self.rate_limit_rps,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (ResolverConfig, StreamConfig, RemoteConfig, AccessConfig) {
        (
            self.paths.to_runtime_config(),
            self.stream.to_runtime_config(),
            self.remote.to_runtime_config(),
            self.access.clone(),
        )
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit, or the first found in the standard locations)
    ///
    /// Environment variables are read later by the components themselves.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would only fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.stream.stream_count == 0 {
            errors.push("stream.stream_count must be at least 1".to_string());
        }
        if self.stream.poll_interval.is_zero() {
            errors.push("stream.poll_interval must be positive".to_string());
        }
        if self.stream.label.is_empty() || self.stream.label.contains('/') {
            errors.push("stream.label must be a non-empty directory name".to_string());
        }
        if self.paths.scheme.is_empty() {
            errors.push("paths.scheme must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors }.into())
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./sas-sync.toml")];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }
        #[cfg(unix)]
        search_paths.push(PathBuf::from("/etc/sas-sync/config.toml"));

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sas-sync").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Default configuration content with comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# SAS Sync Configuration

[paths]
# Directory of <release>.toml template files
# template_dir = "/path/to/templates"
# release = "dr17"
public = false
mirror = false
# base_dir = "/path/to/sas"
scheme = "{scheme}"
sas_dir = "{sas_dir}"
# true, false, or a list of variable names
preserve_envvars = false

[stream]
stream_count = {stream_count}
poll_interval = "{poll}"
# data_dir = "/path/to/runs"
label = "{label}"

[remote]
timeout = "{timeout}"
rate_limit_rps = {rps}

[access]
mode = "auto"  # rsync, curl or auto
follow_symlinks = true
skip_existing = true
inquire = true

[logging]
level = "warn"  # error, warn, info, debug, trace
colored_output = true
"#,
            scheme = remote::SCHEME,
            sas_dir = remote::SAS_SEGMENT,
            stream_count = stream::DEFAULT_STREAM_COUNT,
            poll = humantime_serde::re::humantime::format_duration(stream::POLL_INTERVAL),
            label = stream::DEFAULT_LABEL,
            timeout = humantime_serde::re::humantime::format_duration(remote::DEFAULT_TIMEOUT),
            rps = remote::DEFAULT_RATE_LIMIT_RPS,
        )
    }
}
