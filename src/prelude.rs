//! Prelude module for SAS Sync
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use sas_sync::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sas_sync::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(TomlTemplateStore::new("./templates"));
//!     let resolver = PathResolver::new(store, ResolverConfig::default(), Environment::from_process())?;
//!     let mut access = open_backend(
//!         resolver,
//!         StreamConfig::default(),
//!         AccessConfig::default(),
//!         RemoteConfig::default(),
//!     );
//!     access.remote(&CredentialChain::standard(None, false))?;
//!     // Continue with add / set_stream / commit...
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    open_backend,
    AccessConfig,
    AccessMode,
    CommitOptions,
    // Path resolution
    Environment,
    FilterMode,
    HttpAccess,
    InMemoryTemplateStore,
    Keywords,
    NoopProgress,
    PathResolver,
    ProgressSink,
    RemoteConfig,
    ResolverConfig,
    RunReport,
    StreamConfig,
    StreamScheduler,
    // Queue and scheduling
    Task,
    TaskQueue,
    TemplateStore,
    TomlTemplateStore,
    TransferBackend,
};

// Authentication
pub use crate::auth::{get_auth_status, AuthStatus, CredentialChain, Credentials};

// Commonly used constants
pub use crate::constants::{ENV_BASE_DIR, ENV_PASSWORD, ENV_USERNAME, MAX_STREAM_COUNT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
