//! Error types for SAS Sync
//!
//! This module defines the error taxonomy for path resolution, remote discovery,
//! transfer scheduling and subprocess supervision. Errors carry enough context
//! (file type, missing keys, log directory) to be shown to users directly.
//!
//! Soft failures such as an undefined environment variable inside a template are
//! not errors: resolution returns `Ok(None)` and callers decide what to do.

use std::path::PathBuf;
use thiserror::Error;

/// Template resolution and extraction errors
#[derive(Error, Debug)]
pub enum PathError {
    /// No template registered under this name for the active release
    #[error("There is no file with type {name} defined for release {release}")]
    UnknownFileType { name: String, release: String },

    /// One or more required keywords were not supplied
    #[error("Missing required keyword arguments for {name}: {}", keys.join(", "))]
    MissingKeyword { name: String, keys: Vec<String> },

    /// Template references a computed field that does not exist
    #[error("No such capability: computed field @{function}| is not defined")]
    UnknownFunction { function: String },

    /// Malformed `{key:spec}` format specification
    #[error("Invalid format specification '{spec}': {reason}")]
    InvalidFormatSpec { spec: String, reason: String },

    /// A keyword value cannot be used by a placeholder or computed field
    #[error("Invalid value '{value}' for keyword {key}: {reason}")]
    InvalidKeywordValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Template text could not be parsed
    #[error("Invalid template '{template}': {reason}")]
    TemplateSyntax { template: String, reason: String },

    /// More than one compressed variant of a file exists on disk
    #[error("Found more than one compressed variant of {path}: {variants:?}")]
    AmbiguousCompression {
        path: PathBuf,
        variants: Vec<PathBuf>,
    },

    /// Regular expression built from a template or filter failed to compile
    #[error("Invalid regular expression")]
    InvalidPattern(#[from] regex::Error),

    /// Glob pattern built from a resolved path failed to compile
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] glob::PatternError),

    /// Temporary template name contains forbidden characters
    #[error("Name can only consist of letters, numbers, dashes or underscores: {name}")]
    InvalidTemplateName { name: String },

    /// Temporary template does not start with an environment variable
    #[error("Template path must start with an environment variable: {template}")]
    TemplateNotRooted { template: String },

    /// Environment variable required by a temporary template is not defined
    #[error("Template path envvar {var} not defined in local environment")]
    EnvVarUndefined { var: String },

    /// Template store failed to provide a release
    #[error("Failed to load templates for release {release}: {reason}")]
    Store { release: String, reason: String },

    /// File system error while inspecting resolved paths
    #[error("File I/O error")]
    Io(#[from] std::io::Error),
}

/// Remote operation precondition failures
#[derive(Error, Debug)]
pub enum AccessError {
    /// `remote()` was never called on a backend that needs credentials
    #[error("No remote access configured. Please use the remote() method to set up access first")]
    NotConfigured,

    /// Commit requested with nothing queued
    #[error("No files to download")]
    NoTasks,

    /// Resolved path is neither under the base directory nor under a product root
    #[error("Could not determine a relative location for {path}")]
    LocationUnresolvable { path: String },

    /// Transfer class not permitted for this kind of path
    #[error("Transfer not allowed: {reason}")]
    DisallowedTransfer { reason: String },

    /// Every remote candidate for a requested file type was empty
    #[error("No files found for {file_type}")]
    NoFilesFound { file_type: String },

    /// Rsync tasks must come from a single SAS module
    #[error("Tasks span several SAS modules ({modules:?}); only one module per stream is supported")]
    MixedModules { modules: Vec<String> },
}

/// Remote directory listing errors
#[derive(Error, Debug)]
pub enum RemoteListingError {
    /// HTTP transport failure
    #[error("Remote listing request failed")]
    Http(#[from] reqwest::Error),

    /// Server refused the supplied credentials
    #[error("Unauthorized access to {url}. Check your credentials")]
    Unauthorized { url: String },

    /// Server returned an unexpected status
    #[error("Remote listing of {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Listing page did not have the expected layout
    #[error("Malformed remote listing at {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// URL could not be parsed or joined
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },
}

/// Subprocess launch and supervision errors
#[derive(Error, Debug)]
pub enum SubprocessError {
    /// Program could not be started
    #[error("Failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Probe or transfer exited unsuccessfully
    #[error("{program} exited with status {code:?}")]
    NonZeroExit { program: String, code: Option<i32> },

    /// Probe command exceeded the hang ceiling and was killed
    #[error("Process {program} still running after {seconds} seconds and was killed")]
    Timeout { program: String, seconds: u64 },

    /// Log, manifest or run directory I/O failure
    #[error("Subprocess I/O error")]
    Io(#[from] std::io::Error),
}

/// Task queue and stream scheduling errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Transfer run lifecycle violated
    #[error("Invalid transfer run state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Filter pattern failed to compile
    #[error("Invalid filter pattern")]
    InvalidPattern(#[from] regex::Error),
}

/// Credential lookup errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No provider produced credentials for this net location
    #[error("Missing credentials for {netloc}. Set SAS_USERNAME and SAS_PASSWORD, add a ~/.netrc entry, or run interactively")]
    MissingCredentials { netloc: String },

    /// Netrc file present but unreadable or malformed
    #[error("Invalid netrc file {path}: {reason}")]
    Netrc { path: PathBuf, reason: String },

    /// Interactive prompt failed
    #[error("Failed to read credentials from terminal")]
    Prompt(#[from] std::io::Error),

    /// Username failed validation
    #[error("Invalid username format: {reason}")]
    InvalidUsername { reason: String },
}

/// Single-file HTTP download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// File already exists and force flag not set
    #[error("File already exists: {path}. Use --force to overwrite")]
    FileExists { path: String },

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Server returned error status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { url: String, status: u16 },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Incomplete download
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Path resolution error
    #[error(transparent)]
    Path(#[from] PathError),

    /// Remote access precondition error
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Remote listing error
    #[error(transparent)]
    RemoteListing(#[from] RemoteListingError),

    /// Subprocess error
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the failure is a soft "nothing to do" condition rather than a fault
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            AppError::Access(AccessError::NoTasks) | AppError::Access(AccessError::NoFilesFound { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Path(_) => "path",
            AppError::Access(_) => "access",
            AppError::RemoteListing(_) => "listing",
            AppError::Subprocess(_) => "subprocess",
            AppError::Queue(_) => "queue",
            AppError::Auth(_) => "authentication",
            AppError::Download(_) => "download",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Path resolution result type alias
pub type PathResult<T> = std::result::Result<T, PathError>;

/// Access result type alias
pub type AccessResult<T> = std::result::Result<T, AccessError>;

/// Remote listing result type alias
pub type ListingResult<T> = std::result::Result<T, RemoteListingError>;

/// Subprocess result type alias
pub type SubprocessResult<T> = std::result::Result<T, SubprocessError>;

/// Queue result type alias
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;
