//! Per-run working directories
//!
//! Each transfer run gets `<data_dir>/<label>/<YYYYMMDD>_<NNN>`, numbered one
//! past the highest existing directory of the same day. Manifests and logs of
//! slot `i` live at `<label>_<i:02>.{txt,log,err}` inside it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::constants::stream::{ERR_SUFFIX, LOG_SUFFIX, MANIFEST_SUFFIX};
use crate::errors::{SubprocessError, SubprocessResult};

const MAX_CREATE_ATTEMPTS: u32 = 1000;

/// Exclusive working directory of one transfer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
    label: String,
}

impl RunDirectory {
    /// Create today's next run directory
    pub async fn create(data_dir: &Path, label: &str) -> SubprocessResult<Self> {
        let today = Local::now().format("%Y%m%d").to_string();
        Self::create_for_date(data_dir, label, &today).await
    }

    /// Create the next run directory for `date`
    pub async fn create_for_date(
        data_dir: &Path,
        label: &str,
        date: &str,
    ) -> SubprocessResult<Self> {
        let label_dir = data_dir.join(label);
        tokio::fs::create_dir_all(&label_dir).await?;

        let mut number = highest_sequence(&label_dir, date).await? + 1;
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let path = label_dir.join(format!("{}_{:03}", date, number));
            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    debug!("Created run directory {}", path.display());
                    return Ok(Self {
                        path,
                        label: label.to_string(),
                    });
                }
                // Another run claimed this number first
                Err(e) if e.kind() == ErrorKind::AlreadyExists => number += 1,
                Err(e) => return Err(SubprocessError::Io(e)),
            }
        }
        Err(SubprocessError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free run directory under {}", label_dir.display()),
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn slot_file(&self, index: usize, suffix: &str) -> PathBuf {
        self.path
            .join(format!("{}_{:02}.{}", self.label, index, suffix))
    }

    pub fn manifest_path(&self, index: usize) -> PathBuf {
        self.slot_file(index, MANIFEST_SUFFIX)
    }

    pub fn log_path(&self, index: usize) -> PathBuf {
        self.slot_file(index, LOG_SUFFIX)
    }

    pub fn err_path(&self, index: usize) -> PathBuf {
        self.slot_file(index, ERR_SUFFIX)
    }
}

/// Highest `NNN` among `<date>_NNN` entries, 0 when there are none
async fn highest_sequence(label_dir: &Path, date: &str) -> SubprocessResult<u32> {
    let prefix = format!("{}_", date);
    let mut highest = 0;
    let mut entries = tokio::fs::read_dir(label_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(number) = name
            .strip_prefix(&prefix)
            .and_then(|suffix| suffix.parse::<u32>().ok())
        {
            highest = highest.max(number);
        }
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sequence_increments_within_a_day() {
        let temp = TempDir::new().unwrap();
        let first = RunDirectory::create_for_date(temp.path(), "sas_rsync", "20240115")
            .await
            .unwrap();
        let second = RunDirectory::create_for_date(temp.path(), "sas_rsync", "20240115")
            .await
            .unwrap();
        let other_day = RunDirectory::create_for_date(temp.path(), "sas_rsync", "20240116")
            .await
            .unwrap();

        assert!(first.path().ends_with("sas_rsync/20240115_001"));
        assert!(second.path().ends_with("sas_rsync/20240115_002"));
        assert!(other_day.path().ends_with("sas_rsync/20240116_001"));
    }

    #[tokio::test]
    async fn test_gaps_continue_from_highest() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("lbl/20240115_007")).unwrap();
        std::fs::create_dir_all(temp.path().join("lbl/20240115_junk")).unwrap();
        let run = RunDirectory::create_for_date(temp.path(), "lbl", "20240115")
            .await
            .unwrap();
        assert!(run.path().ends_with("lbl/20240115_008"));
    }

    #[tokio::test]
    async fn test_slot_file_names() {
        let temp = TempDir::new().unwrap();
        let run = RunDirectory::create(temp.path(), "sas_curl").await.unwrap();
        assert_eq!(
            run.manifest_path(3).file_name().unwrap(),
            "sas_curl_03.txt"
        );
        assert_eq!(run.log_path(0).file_name().unwrap(), "sas_curl_00.log");
        assert_eq!(run.err_path(12).file_name().unwrap(), "sas_curl_12.err");
    }
}
