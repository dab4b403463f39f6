//! Command-line argument parsing for SAS Sync
//!
//! This module defines the CLI structure using clap derive macros: path
//! resolution commands that work offline, bulk synchronization over parallel
//! streams, single-file downloads and credential management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::access::{AccessMode, CommitOptions};
use crate::app::path::Keywords;
use crate::app::queue::FilterMode;
use crate::constants::MAX_STREAM_COUNT;
use crate::errors::PathResult;

/// SAS Sync - Resolve and transfer SDSS Science Archive Server files
#[derive(Parser, Debug)]
#[command(
    name = "sas_sync",
    version,
    about = "Resolve SDSS data file paths and mirror them from the Science Archive Server",
    long_about = "Builds local paths, SAS locations and URLs for named SDSS file types from per-release
path templates, and transfers matching files with rsync or curl over parallel streams."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Release whose templates are loaded (e.g. "dr17", "sdsswork")
    #[arg(short, long, global = true)]
    pub release: Option<String>,

    /// Local SAS root, overriding $SAS_BASE_DIR
    #[arg(long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Force public access
    #[arg(long, global = true)]
    pub public: bool,

    /// Use the mirror host
    #[arg(long, global = true)]
    pub mirror: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the file types defined for the release
    Names,

    /// Show the keywords a file type needs
    Keys {
        /// File type name
        file_type: String,
    },

    /// Resolve a file type to a local path, SAS location or URL
    Resolve(ResolveArgs),

    /// Recover keywords from an example path
    Extract {
        /// File type name
        file_type: String,

        /// Example path or URL
        path: String,

        /// Print the keywords as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mirror matching files from the SAS
    Sync(SyncArgs),

    /// Download a single resolved file over HTTP
    Get(GetArgs),

    /// Show path templates added or changed between two releases
    Changelog {
        /// Newer release
        new: String,

        /// Older release
        old: String,
    },

    /// Manage SAS credentials
    Auth(AuthArgs),
}

/// Arguments for the resolve command
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// File type name
    pub file_type: String,

    /// Keywords as key=value pairs
    #[arg(value_name = "KEY=VALUE")]
    pub keywords: Vec<String>,

    /// Print the remote URL instead of the local path
    #[arg(long, conflicts_with = "location")]
    pub url: bool,

    /// Print the SAS location instead of the local path
    #[arg(long)]
    pub location: bool,

    /// Print path, location and URL as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the sync command
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// File type name
    pub file_type: String,

    /// Keywords as key=value pairs; values may contain `*` wildcards
    #[arg(value_name = "KEY=VALUE")]
    pub keywords: Vec<String>,

    /// Transfer program (defaults to the configured mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<AccessMode>,

    /// Number of parallel streams
    #[arg(short, long)]
    pub streams: Option<usize>,

    /// Keep only files whose location matches this regular expression
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Drop matching files instead of keeping them
    #[arg(long, requires = "filter")]
    pub exclude: bool,

    /// Randomize the transfer order
    #[arg(long)]
    pub shuffle: bool,

    /// Skip this many files of the stream
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Transfer at most this many files
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// List the files that would be transferred without transferring them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the get command
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// File type name
    pub file_type: String,

    /// Keywords as key=value pairs
    #[arg(value_name = "KEY=VALUE")]
    pub keywords: Vec<String>,

    /// Overwrite an existing local file
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Prompt for SAS credentials and save them to .env
    Setup {
        /// Force setup even if credentials exist
        #[arg(short, long)]
        force: bool,
    },

    /// Show authentication status
    Status,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether any of -v, --very-verbose or -q was given
    pub fn has_verbosity_flag(&self) -> bool {
        self.global.verbose || self.global.very_verbose || self.global.quiet
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl ResolveArgs {
    pub fn keywords(&self) -> PathResult<Keywords> {
        Keywords::parse_pairs(&self.keywords)
    }
}

impl GetArgs {
    pub fn keywords(&self) -> PathResult<Keywords> {
        Keywords::parse_pairs(&self.keywords)
    }
}

impl SyncArgs {
    pub fn keywords(&self) -> PathResult<Keywords> {
        Keywords::parse_pairs(&self.keywords)
    }

    /// Check argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        match self.streams {
            Some(0) => Err("Number of streams must be greater than 0".to_string()),
            Some(n) if n > MAX_STREAM_COUNT => Err(format!(
                "At most {} streams are allowed, got {}",
                MAX_STREAM_COUNT, n
            )),
            _ => Ok(()),
        }
    }

    pub fn filter_mode(&self) -> FilterMode {
        if self.exclude {
            FilterMode::Exclude
        } else {
            FilterMode::Include
        }
    }

    pub fn commit_options(&self) -> CommitOptions {
        CommitOptions::new(self.offset, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_args() -> SyncArgs {
        SyncArgs {
            file_type: "spec-lite".to_string(),
            keywords: vec!["plateid=3606".to_string(), "fiberid=*".to_string()],
            mode: None,
            streams: Some(3),
            filter: None,
            exclude: false,
            shuffle: false,
            offset: 0,
            limit: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_sync_args_validation() {
        let mut args = sync_args();
        assert!(args.validate().is_ok());

        args.streams = Some(0);
        assert!(args.validate().is_err());

        args.streams = Some(MAX_STREAM_COUNT + 1);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_sync_keywords_and_filter_mode() {
        let mut args = sync_args();
        let keywords = args.keywords().unwrap();
        assert_eq!(keywords.get_str("plateid").as_deref(), Some("3606"));
        assert!(keywords.get("fiberid").unwrap().is_wildcard());
        assert_eq!(args.filter_mode(), FilterMode::Include);

        args.exclude = true;
        assert_eq!(args.filter_mode(), FilterMode::Exclude);
    }

    #[test]
    fn test_parse_sync_command() {
        let cli = Cli::try_parse_from([
            "sas_sync", "-r", "dr17", "sync", "spec-lite", "plateid=3606", "--mode", "curl",
            "--limit", "10",
        ])
        .unwrap();
        assert_eq!(cli.global.release.as_deref(), Some("dr17"));
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.mode, Some(AccessMode::Curl));
                assert_eq!(args.commit_options(), CommitOptions::new(0, Some(10)));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_exclude_requires_filter() {
        let result = Cli::try_parse_from(["sas_sync", "sync", "spec", "--exclude"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli {
            global: GlobalArgs {
                quiet: true,
                ..GlobalArgs::default()
            },
            command: Commands::Names,
        };
        let cli_verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                ..GlobalArgs::default()
            },
            command: Commands::Auth(AuthArgs {
                action: AuthAction::Status,
            }),
        };

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
        assert!(cli_verbose.has_verbosity_flag());

        let cli_default = Cli {
            global: GlobalArgs::default(),
            command: Commands::Names,
        };
        assert!(!cli_default.has_verbosity_flag());
    }
}
