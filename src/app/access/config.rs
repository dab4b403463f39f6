//! Transfer backend selection and options

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Transfer tool used for stream transfers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// `rsync` against the data transfer node
    Rsync,
    /// `curl` batch downloads from the web server
    Curl,
    /// rsync on unix, curl elsewhere
    #[default]
    Auto,
}

impl AccessMode {
    /// Concrete mode, `Auto` decided by platform
    pub fn resolve(self) -> AccessMode {
        match self {
            AccessMode::Auto if cfg!(unix) => AccessMode::Rsync,
            AccessMode::Auto => AccessMode::Curl,
            mode => mode,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessMode::Rsync => "rsync",
            AccessMode::Curl => "curl",
            AccessMode::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl FromStr for AccessMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsync" => Ok(AccessMode::Rsync),
            "curl" => Ok(AccessMode::Curl),
            "auto" => Ok(AccessMode::Auto),
            other => Err(ConfigError::InvalidValue {
                field: "access.mode".to_string(),
                value: other.to_string(),
                reason: "Expected rsync, curl or auto".to_string(),
            }),
        }
    }
}

/// Options shared by the transfer backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub mode: AccessMode,
    /// Copy symlink targets instead of links (`rsync -L`)
    pub follow_symlinks: bool,
    /// Skip remote files that already look complete on disk (curl only)
    pub skip_existing: bool,
    /// Prompt for credentials when no other source has them
    pub inquire: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            mode: AccessMode::Auto,
            follow_symlinks: true,
            skip_existing: true,
            inquire: true,
        }
    }
}

/// Window of the stream queue handed to one commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl CommitOptions {
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolves_by_platform() {
        let resolved = AccessMode::Auto.resolve();
        if cfg!(unix) {
            assert_eq!(resolved, AccessMode::Rsync);
        } else {
            assert_eq!(resolved, AccessMode::Curl);
        }
        assert_eq!(AccessMode::Curl.resolve(), AccessMode::Curl);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("RSYNC".parse::<AccessMode>().unwrap(), AccessMode::Rsync);
        assert_eq!(AccessMode::Curl.to_string(), "curl");
        assert!("ftp".parse::<AccessMode>().is_err());
    }
}
