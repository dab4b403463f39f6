//! SAS Sync Library
//!
//! Resolves SDSS data file types and keywords into local paths and Science
//! Archive Server URLs, and synchronizes matching files to local disk over
//! parallel rsync or curl streams.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(MAX_STREAM_COUNT, 5);
        assert_eq!(ENV_USERNAME, "SAS_USERNAME");
        assert_eq!(SAS_NETLOC, "data.sdss.org");
    }

    #[test]
    fn test_error_types() {
        let access_error = errors::AccessError::NotConfigured;
        let app_error = AppError::Access(access_error);

        assert_eq!(app_error.category(), "access");
        assert!(app_error.to_string().contains("remote()"));
    }
}
