//! SAS Sync CLI application
//!
//! Command-line interface for resolving SDSS file paths and mirroring files
//! from the Science Archive Server over parallel rsync or curl streams.

use std::process;

use tracing::info;
use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

use sas_sync::cli::{
    handle_auth, handle_changelog, handle_extract, handle_get, handle_keys, handle_names,
    handle_resolve, handle_sync, load_config, Cli, Commands,
};
use sas_sync::config::LoggingConfig;
use sas_sync::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = load_config(&cli.global).await?;
    init_logging(&cli, &config.logging);

    info!("SAS Sync v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Names => handle_names(&config),
        Commands::Keys { file_type } => handle_keys(&config, &file_type),
        Commands::Resolve(args) => handle_resolve(&config, args),
        Commands::Extract {
            file_type,
            path,
            json,
        } => handle_extract(&config, &file_type, &path, json),
        Commands::Sync(args) => {
            info!("Executing sync command");
            handle_sync(&config, args).await
        }
        Commands::Get(args) => {
            info!("Executing get command");
            handle_get(&config, args).await
        }
        Commands::Changelog { new, old } => handle_changelog(&config, &new, &old),
        Commands::Auth(args) => handle_auth(&config, args).await,
    }
}

/// Initialize logging from the CLI verbosity flags, else the configured level
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let log_level = if cli.has_verbosity_flag() {
        cli.log_level().to_string().to_lowercase()
    } else {
        logging.level.clone()
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("sas_sync={}", log_level).parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(logging.colored_output)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
