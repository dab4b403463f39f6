//! Application constants for SAS Sync
//!
//! This module centralizes the constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names consumed by the resolver and transfer backends
pub mod env {
    /// Root of the local SAS mirror
    pub const BASE_DIR: &str = "SAS_BASE_DIR";

    /// Overrides the configured release
    pub const RELEASE_OVERRIDE: &str = "TREE_VER";

    /// Root directory for per-run working directories
    pub const DATA_DIR: &str = "SAS_ACCESS_DATA_DIR";

    /// Username for HTTP and rsync access
    pub const USERNAME: &str = "SAS_USERNAME";

    /// Password for HTTP and rsync access
    pub const PASSWORD: &str = "SAS_PASSWORD";

    /// Password variable read by rsync subprocesses
    pub const RSYNC_PASSWORD: &str = "RSYNC_PASSWORD";

    /// Password variable passed to curl subprocesses
    pub const CURL_PASSWORD: &str = "CURL_PASSWORD";

    /// Alternate roots searched, in order, when a path is not under the base directory
    pub const PRODUCT_ROOTS: &[&str] = &["PRODUCT_ROOT", "SAS_SVN_ROOT", "SDSS_GIT_ROOT"];
}

/// Template syntax and release handling
pub mod templates {
    /// Default release when none is configured
    pub const DEFAULT_RELEASE: &str = "sdsswork";

    /// Default file name of the per-release template table
    pub const TEMPLATE_FILE_EXTENSION: &str = "toml";

    /// Maximum depth of nested `$VAR` expansion
    pub const MAX_ENV_EXPANSION_DEPTH: usize = 16;

    /// Compression suffixes recognized on resolved paths, in preference order
    pub const COMPRESSION_SUFFIXES: &[&str] = &[".gz", ".bz2", ".zip", ".fz"];

    /// Regex matching the `tags/` segment in front of a version component
    pub const TAGS_VERSION_PATTERN: &str = r"tags/(v?[0-9]+(?:[._][0-9]+)+[a-z]?/)";

    /// Regex matching a version-like directory component
    pub const VERSION_COMPONENT_PATTERN: &str = r"^v?[0-9]+(?:[._][0-9]+)+[a-z]?$";

    /// Regex matching public data release names
    pub const PUBLIC_RELEASE_PATTERN: &str = r"^(?i)dr[0-9]+$";
}

/// Network locations and URL layout
pub mod remote {
    use super::Duration;

    /// Default URL scheme
    pub const SCHEME: &str = "https";

    /// Primary SAS host
    pub const SAS_NETLOC: &str = "data.sdss.org";

    /// Mirror SAS host
    pub const MIRROR_NETLOC: &str = "data.mirror.sdss.org";

    /// Data transfer node used by rsync
    pub const DTN_NETLOC: &str = "dtn01.sdss.org";

    /// Subversion host serving product roots
    pub const SVN_NETLOC: &str = "svn.sdss.org";

    /// Directory segment that prefixes every SAS location in URLs
    pub const SAS_SEGMENT: &str = "sas";

    /// Default rsync user on the data transfer node
    pub const RSYNC_USER: &str = "sdss";

    /// Default user agent for HTTP requests
    pub const USER_AGENT: &str = "sas-sync/0.1 (SAS data access)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default rate limit for listing requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;
}

/// Stream scheduling and subprocess supervision
pub mod stream {
    use super::Duration;

    /// Hard ceiling on parallel transfer slots
    pub const MAX_STREAM_COUNT: usize = 5;

    /// Default number of slots requested
    pub const DEFAULT_STREAM_COUNT: usize = 5;

    /// Interval between liveness polls of running transfers
    pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// Hang ceiling for synchronous probe commands
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(500_000);

    /// Default run label
    pub const DEFAULT_LABEL: &str = "sas_sync";

    /// Manifest file suffix
    pub const MANIFEST_SUFFIX: &str = "txt";

    /// Stdout log suffix
    pub const LOG_SUFFIX: &str = "log";

    /// Stderr log suffix
    pub const ERR_SUFFIX: &str = "err";
}

/// Remote listing heuristics
pub mod listing {
    /// Maximum drift between remote and local modification times for the skip hint
    pub const MTIME_TOLERANCE_SECS: i64 = 60;

    /// Date layouts seen in autoindex pages
    pub const DATE_FORMATS: &[&str] = &["%Y-%b-%d %H:%M", "%d-%b-%Y %H:%M", "%Y-%m-%d %H:%M"];
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Permissions for manifests carrying credentials (Unix only)
    #[cfg(unix)]
    pub const PRIVATE_FILE_PERMISSIONS: u32 = 0o600;
}

// Flat re-exports of frequently used values
pub use env::{BASE_DIR as ENV_BASE_DIR, PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use remote::{SAS_NETLOC, USER_AGENT};
pub use stream::{DEFAULT_STREAM_COUNT, MAX_STREAM_COUNT};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_limits() {
        assert!(DEFAULT_STREAM_COUNT <= MAX_STREAM_COUNT);
        assert!(stream::PROBE_TIMEOUT > Duration::from_secs(86_400 * 5));
    }

    #[test]
    fn test_patterns_compile() {
        regex::Regex::new(templates::TAGS_VERSION_PATTERN).unwrap();
        let version = regex::Regex::new(templates::VERSION_COMPONENT_PATTERN).unwrap();
        assert!(version.is_match("v2_5"));
        assert!(version.is_match("v5_13_2"));
        assert!(version.is_match("1.0.3"));
        assert!(!version.is_match("1901.fits"));
        assert!(!version.is_match("8485_1901.par"));
        assert!(!version.is_match("trunk"));
        let public = regex::Regex::new(templates::PUBLIC_RELEASE_PATTERN).unwrap();
        assert!(public.is_match("DR17"));
        assert!(!public.is_match("sdsswork"));
    }
}
