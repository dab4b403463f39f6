//! Best-effort "already downloaded" check
//!
//! Compares a remote listing's size and modification time against a local
//! file. Listings print times to the minute and in server-local time, so this
//! is only a hint for skipping work, never proof that a file is current.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::constants::listing::{DATE_FORMATS, MTIME_TOLERANCE_SECS};

/// Parse a listing timestamp with any of the known layouts, as UTC
pub fn parse_listing_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Whether `destination` looks like the remote file described by `size` and `modified`
///
/// Missing metadata on either side yields `false`.
pub fn exists_locally_hint(destination: &Path, size: Option<u64>, modified: Option<&str>) -> bool {
    let Ok(metadata) = std::fs::metadata(destination) else {
        return false;
    };
    let (Some(size), Some(remote_time)) = (size, modified.and_then(parse_listing_time)) else {
        return false;
    };
    if metadata.len() != size {
        return false;
    }
    let Ok(local_time) = metadata.modified() else {
        return false;
    };
    let local_time: DateTime<Utc> = DateTime::<Utc>::from(local_time);
    let drift = (local_time - remote_time).num_seconds().abs();
    let hint = drift < MTIME_TOLERANCE_SECS;
    if hint {
        debug!("Already downloaded at {}", destination.display());
    }
    hint
}

/// Set a file's modification time, used to mirror remote timestamps
pub fn set_modified(path: &Path, modified: DateTime<Utc>) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(SystemTime::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_listing_time_formats() {
        let a = parse_listing_time("2021-Jul-12 14:05").unwrap();
        let b = parse_listing_time("12-Jul-2021 14:05").unwrap();
        let c = parse_listing_time(" 2021-07-12 14:05 ").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(parse_listing_time("-").is_none());
    }

    #[test]
    fn test_hint_requires_size_and_time() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.fits");
        std::fs::write(&path, b"12345").unwrap();
        let remote = parse_listing_time("2021-Jul-12 14:05").unwrap();
        set_modified(&path, remote + chrono::Duration::seconds(20)).unwrap();

        assert!(exists_locally_hint(&path, Some(5), Some("2021-Jul-12 14:05")));
        assert!(!exists_locally_hint(&path, Some(6), Some("2021-Jul-12 14:05")));
        assert!(!exists_locally_hint(&path, Some(5), Some("2021-Jul-12 15:05")));
        assert!(!exists_locally_hint(&path, None, Some("2021-Jul-12 14:05")));
        assert!(!exists_locally_hint(&temp.path().join("b.fits"), Some(5), None));
    }
}
