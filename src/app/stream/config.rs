//! Stream scheduling configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{env, stream};

/// Configuration for stream scheduling and supervision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Requested number of parallel slots, clamped to `1..=MAX_STREAM_COUNT`
    pub stream_count: usize,
    /// Interval between liveness polls
    pub poll_interval: Duration,
    /// Hang ceiling for synchronous probe commands
    pub probe_timeout: Duration,
    /// Root for run directories; falls back to `$SAS_ACCESS_DATA_DIR`, then the temp dir
    pub data_dir: Option<PathBuf>,
    /// Run label, the first directory level under the data dir
    pub label: String,
}

impl Default for StreamConfig {
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

impl StreamConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_stream_count(mut self, stream_count: usize) -> Self {
        self.stream_count = stream_count;
        self
    }

    /// Directory that holds the run directories
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        match std::env::var_os(env::DATA_DIR).map(PathBuf::from) {
            Some(dir) if dir.is_dir() => dir,
            _ => std::env::temp_dir(),
        }
    }
}

/// Number of slots actually used for `task_count` tasks
///
/// The request is clamped to `1..=MAX_STREAM_COUNT` and then reduced to the
/// task count so that no slot is ever idle.
pub fn effective_stream_count(requested: usize, task_count: usize) -> usize {
    requested
        .clamp(1, stream::MAX_STREAM_COUNT)
        .min(task_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_stream_count() {
        assert_eq!(effective_stream_count(5, 100), 5);
        assert_eq!(effective_stream_count(12, 100), 5);
        assert_eq!(effective_stream_count(0, 100), 1);
        assert_eq!(effective_stream_count(5, 3), 3);
        assert_eq!(effective_stream_count(5, 0), 0);
    }

    #[test]
    fn test_configured_data_dir_wins() {
        let config = StreamConfig {
            data_dir: Some(PathBuf::from("/var/sas_sync")),
            ..StreamConfig::default()
        };
        assert_eq!(config.resolve_data_dir(), PathBuf::from("/var/sas_sync"));
    }
}
