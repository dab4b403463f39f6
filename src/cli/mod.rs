//! Command-line interface components
//!
//! This module contains CLI-specific code for the SAS Sync application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{AuthAction, AuthArgs, Cli, Commands, GetArgs, GlobalArgs, ResolveArgs, SyncArgs};
pub use commands::{
    build_resolver, handle_auth, handle_changelog, handle_extract, handle_get, handle_keys,
    handle_names, handle_resolve, handle_sync, load_config,
};
pub use progress::{IndicatifProgress, ProgressConfig};
