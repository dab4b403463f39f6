//! Core data structures for the task queue
//!
//! A [`Task`] is one file to transfer: where it lives relative to the SAS
//! root, where to fetch it from and where to put it.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One file transfer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    /// Path relative to the base directory, the unit listed in manifests
    pub location: String,
    /// Remote URI or rsync source
    pub source: String,
    /// Local destination path
    pub destination: PathBuf,
    /// Set by an existence probe, `None` until checked
    pub exists: Option<bool>,
}

impl Task {
    /// Build a task, returning `None` if any field is empty
    pub fn new(
        location: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> Option<Self> {
        let location = location.into();
        let source = source.into();
        let destination = destination.into();
        if location.is_empty() || source.is_empty() || destination.as_os_str().is_empty() {
            return None;
        }
        Some(Self {
            location,
            source,
            destination,
            exists: None,
        })
    }

    /// Record the outcome of an existence probe
    pub fn with_exists(mut self, exists: bool) -> Self {
        self.exists = Some(exists);
        self
    }

    /// Top-level directory of the location, the rsync module
    pub fn module(&self) -> &str {
        self.location
            .split('/')
            .find(|part| !part.is_empty())
            .unwrap_or_default()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination.display())
    }
}

/// Whether a pattern match keeps or drops a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Keep only matching entries
    #[default]
    Include,
    /// Drop matching entries
    Exclude,
}

impl FilterMode {
    /// Whether an entry with the given match outcome survives the filter
    pub fn keeps(self, matched: bool) -> bool {
        match self {
            FilterMode::Include => matched,
            FilterMode::Exclude => !matched,
        }
    }
}

/// Counters describing the queue contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Tasks currently queued
    pub queued: usize,
    /// Appends ignored because a field was empty
    pub ignored: usize,
    /// Tasks whose destination is known to exist
    pub existing: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_requires_all_fields() {
        assert!(Task::new("dr17/a.fits", "https://x/dr17/a.fits", "/sas/dr17/a.fits").is_some());
        assert!(Task::new("", "https://x/a", "/sas/a").is_none());
        assert!(Task::new("a", "", "/sas/a").is_none());
        assert!(Task::new("a", "https://x/a", "").is_none());
    }

    #[test]
    fn test_task_module() {
        let task = Task::new("dr17/manga/a.fits", "src", "/dst").unwrap();
        assert_eq!(task.module(), "dr17");
        let task = Task::new("/dr16/a.fits", "src", "/dst").unwrap();
        assert_eq!(task.module(), "dr16");
    }

    #[test]
    fn test_filter_mode_keeps() {
        assert!(FilterMode::Include.keeps(true));
        assert!(!FilterMode::Include.keeps(false));
        assert!(FilterMode::Exclude.keeps(false));
        assert!(!FilterMode::Exclude.keeps(true));
    }
}
