//! Command handlers for the SAS Sync CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! to the resolver, the transfer backends and credential management.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::app::access::{open_backend, HttpAccess};
use crate::app::path::changelog::compute_changelog;
use crate::app::path::{Environment, PathResolver};
use crate::app::templates::TomlTemplateStore;
use crate::auth::{get_auth_status, prompt_credentials, save_credentials, CredentialChain};
use crate::cli::{AuthAction, AuthArgs, GetArgs, GlobalArgs, ResolveArgs, SyncArgs};
use crate::cli::{IndicatifProgress, ProgressConfig};
use crate::config::AppConfig;
use crate::constants::remote;
use crate::errors::{AppError, Result};

/// Load configuration and apply the global command-line overrides
pub async fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(global.config.clone()).await?;
    if let Some(release) = &global.release {
        config.paths.release = Some(release.clone());
    }
    if let Some(base_dir) = &global.base_dir {
        config.paths.base_dir = Some(base_dir.clone());
    }
    config.paths.public |= global.public;
    config.paths.mirror |= global.mirror;
    Ok(config)
}

/// Resolver over the configured template directory and the process environment
pub fn build_resolver(config: &AppConfig) -> Result<PathResolver> {
    let template_dir = config.paths.resolve_template_dir();
    debug!("Loading templates from {}", template_dir.display());
    let store = Arc::new(TomlTemplateStore::new(template_dir));
    let resolver = PathResolver::new(
        store,
        config.paths.to_runtime_config(),
        Environment::from_process(),
    )?;
    Ok(resolver)
}

/// Handle the names command
pub fn handle_names(config: &AppConfig) -> Result<()> {
    let resolver = build_resolver(config)?;
    for name in resolver.lookup_names() {
        println!("{}", name);
    }
    Ok(())
}

/// Handle the keys command
pub fn handle_keys(config: &AppConfig, file_type: &str) -> Result<()> {
    let resolver = build_resolver(config)?;
    let keys = resolver.lookup_keys(file_type)?;
    if keys.is_empty() {
        println!("{} needs no keywords", file_type);
    } else {
        println!("{}", keys.into_iter().collect::<Vec<_>>().join(" "));
    }
    Ok(())
}

/// Handle the resolve command
pub fn handle_resolve(config: &AppConfig, args: ResolveArgs) -> Result<()> {
    let resolver = build_resolver(config)?;
    let keywords = args.keywords()?;

    let Some(full) = resolver.full(&args.file_type, &keywords)? else {
        warn!("{} references an undefined environment variable", args.file_type);
        println!("No path: an environment variable used by {} is undefined", args.file_type);
        return Ok(());
    };

    if args.json {
        let value = serde_json::json!({
            "file_type": args.file_type,
            "release": resolver.release(),
            "path": full,
            "location": resolver.location_for_path(&full, None),
            "url": resolver.url_for_path(&full).ok(),
        });
        println!("{}", to_json(&value)?);
    } else if args.url {
        println!("{}", resolver.url_for_path(&full)?);
    } else if args.location {
        match resolver.location_for_path(&full, None) {
            Some(location) => println!("{}", location),
            None => {
                return Err(AppError::generic(format!(
                    "{} is not under the base directory or a product root",
                    full
                )))
            }
        }
    } else {
        println!("{}", full);
    }
    Ok(())
}

/// Handle the extract command
pub fn handle_extract(config: &AppConfig, file_type: &str, path: &str, json: bool) -> Result<()> {
    let resolver = build_resolver(config)?;
    let Some(keywords) = resolver.extract(file_type, path)? else {
        println!("{} does not match the {} template", path, file_type);
        return Ok(());
    };

    if json {
        println!("{}", to_json(&keywords)?);
    } else {
        for (key, value) in keywords.iter() {
            println!("{}={}", key, value);
        }
    }
    Ok(())
}

/// Handle the sync command
///
/// Resolves credentials, expands the request against the server, then runs
/// the transfers over parallel streams with a progress bar.
pub async fn handle_sync(config: &AppConfig, args: SyncArgs) -> Result<()> {
    let start_time = Instant::now();
    args.validate().map_err(AppError::generic)?;
    let keywords = args.keywords()?;

    let (_, mut stream_config, remote_config, mut access_config) = config.to_runtime_config();
    if let Some(mode) = args.mode {
        access_config.mode = mode;
    }
    if let Some(streams) = args.streams {
        stream_config.stream_count = streams;
    }
    let inquire = access_config.inquire;

    let resolver = build_resolver(config)?;
    let mut backend = open_backend(resolver, stream_config, access_config, remote_config);
    info!("Syncing {} with {}", args.file_type, backend.mode());

    backend.remote(&CredentialChain::standard(None, inquire))?;
    backend.add(&args.file_type, &keywords)?;

    let count = match backend.set_stream().await {
        Ok(count) => count,
        Err(e) if e.is_empty_result() => {
            println!("Nothing to transfer: {}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    if count == 0 {
        println!("Nothing to transfer: every matched file is already present locally");
        return Ok(());
    }
    info!("{} files to transfer", count);

    if let Some(pattern) = &args.filter {
        let removed = backend.refine_task(pattern, args.filter_mode())?;
        info!("Filter {} removed {} files", pattern, removed);
    }
    if args.shuffle {
        backend.shuffle();
    }

    let options = args.commit_options();
    if args.dry_run {
        let locations = backend.locations(options.offset, options.limit);
        let paths = backend.paths(options.offset, options.limit);
        for (location, path) in locations.iter().zip(&paths) {
            println!("{} -> {}", location, path.display());
        }
        println!("{} files would be transferred", locations.len());
        return Ok(());
    }

    let mut progress = IndicatifProgress::new(ProgressConfig {
        label: backend.mode().to_string(),
        ..ProgressConfig::default()
    });
    let report = backend.commit(options, &mut progress).await?;
    info!("Sync finished in {:?}", start_time.elapsed());

    if report.is_success() {
        println!("{}", report.summary());
        Ok(())
    } else {
        eprintln!("{}", report.summary());
        Err(AppError::generic(format!(
            "{} of {} streams failed",
            report.failed_slots().len(),
            report.return_codes.len()
        )))
    }
}

/// Handle the get command
pub async fn handle_get(config: &AppConfig, args: GetArgs) -> Result<()> {
    let resolver = build_resolver(config)?;
    let keywords = args.keywords()?;

    let credentials = CredentialChain::standard(None, config.access.inquire)
        .resolve(resolver.netloc(), resolver.is_public())?;
    let http = HttpAccess::new(&config.remote.to_runtime_config(), credentials)?;

    match http.get(&resolver, &args.file_type, &keywords, args.force).await? {
        Some(path) => println!("✅ Downloaded {}", path.display()),
        None => println!("No path: an environment variable used by {} is undefined", args.file_type),
    }
    Ok(())
}

/// Handle the changelog command
pub fn handle_changelog(config: &AppConfig, new: &str, old: &str) -> Result<()> {
    let store = TomlTemplateStore::new(config.paths.resolve_template_dir());
    let changelog = compute_changelog(&store, new, old)?;
    print!("{}", changelog);
    Ok(())
}

/// Handle authentication commands
pub async fn handle_auth(config: &AppConfig, args: AuthArgs) -> Result<()> {
    let netloc = auth_netloc(config);
    match args.action {
        AuthAction::Setup { force } => {
            if !force && get_auth_status(&netloc).has_credentials() {
                println!("✅ Credentials already configured. Use --force to update.");
                return Ok(());
            }
            let credentials = prompt_credentials()?;
            let env_path = Path::new(".env");
            save_credentials(env_path, &credentials)?;
            println!(
                "✅ Saved credentials for {} to {}",
                credentials.username,
                env_path.display()
            );
        }
        AuthAction::Status => {
            let status = get_auth_status(&netloc);
            println!("Host: {}", status.netloc);
            println!("{}", status.status_message());
            println!("  SAS_USERNAME set: {}", status.username_set);
            println!("  SAS_PASSWORD set: {}", status.password_set);
            println!("  ~/.netrc entry: {}", status.netrc_entry);
            println!("  .env file present: {}", status.dotenv_file_exists);
        }
    }
    Ok(())
}

/// Host credentials are looked up for, without loading any templates
fn auth_netloc(config: &AppConfig) -> String {
    match &config.paths.netloc {
        Some(netloc) => netloc.clone(),
        None if config.paths.mirror => remote::MIRROR_NETLOC.to_string(),
        None => remote::SAS_NETLOC.to_string(),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::generic(format!("Failed to serialize output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_templates(dir: &Path, base_dir: &Path) -> AppConfig {
        std::fs::write(
            dir.join("dr17.toml"),
            "[paths]\nspec = \"$SAS_BASE_DIR/dr17/spectro/{plate}/spec-{plate:04d}.fits\"\n",
        )
        .unwrap();
        let mut config = AppConfig::default();
        config.paths.template_dir = Some(dir.to_path_buf());
        config.paths.release = Some("dr17".to_string());
        config.paths.base_dir = Some(base_dir.to_path_buf());
        config
    }

    #[tokio::test]
    async fn test_load_config_applies_overrides() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("sas-sync.toml");
        std::fs::write(&config_path, "[paths]\nrelease = \"dr16\"\n").unwrap();

        let global = GlobalArgs {
            config: Some(config_path),
            release: Some("dr17".to_string()),
            mirror: true,
            ..GlobalArgs::default()
        };
        let config = load_config(&global).await.unwrap();
        assert_eq!(config.paths.release.as_deref(), Some("dr17"));
        assert!(config.paths.mirror);
        assert_eq!(auth_netloc(&config), remote::MIRROR_NETLOC);
    }

    #[test]
    fn test_build_resolver_from_template_dir() {
        let temp = TempDir::new().unwrap();
        let config = config_with_templates(temp.path(), Path::new("/data/sas"));
        let resolver = build_resolver(&config).unwrap();

        assert_eq!(resolver.release(), "dr17");
        assert_eq!(resolver.lookup_names(), vec!["spec"]);
        let keywords = crate::app::path::Keywords::new().with("plate", 42);
        assert_eq!(
            resolver.full("spec", &keywords).unwrap().as_deref(),
            Some("/data/sas/dr17/spectro/42/spec-0042.fits")
        );
    }

    #[test]
    fn test_resolve_command_outputs() {
        let temp = TempDir::new().unwrap();
        let config = config_with_templates(temp.path(), Path::new("/data/sas"));
        let args = ResolveArgs {
            file_type: "spec".to_string(),
            keywords: vec!["plate=42".to_string()],
            url: false,
            location: false,
            json: true,
        };
        assert!(handle_resolve(&config, args.clone()).is_ok());

        let missing = ResolveArgs {
            keywords: Vec::new(),
            ..args
        };
        assert!(matches!(
            handle_resolve(&config, missing),
            Err(AppError::Path(_))
        ));
    }

    #[test]
    fn test_changelog_command() {
        let temp = TempDir::new().unwrap();
        let config = config_with_templates(temp.path(), Path::new("/data/sas"));
        std::fs::write(
            temp.path().join("dr16.toml"),
            "[paths]\nspec = \"$SAS_BASE_DIR/dr16/spec.fits\"\n",
        )
        .unwrap();
        assert!(handle_changelog(&config, "dr17", "dr16").is_ok());
        assert!(handle_changelog(&config, "dr17", "dr99").is_err());
    }
}
