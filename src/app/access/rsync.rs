//! rsync transfers from the SDSS data transfer node
//!
//! Requested files are expanded with a dry-run listing
//! (`rsync -Rin --out-format=...`), then every stream runs
//! `rsync -avRK[L] --files-from=<manifest>` against a single SAS module.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::app::path::Keywords;
use crate::app::queue::Task;
use crate::app::stream::{CommandTemplate, CommitSpec, ManifestFormat};
use crate::auth::CredentialChain;
use crate::constants::{env, remote};
use crate::errors::{AccessError, Result};

use super::backend::{AccessCore, TransferBackend};
use super::config::AccessMode;

const RSYNC: &str = "rsync";
const PROBE_FORMAT: &str = "--out-format=%B%16l %t %f";

fn listing_location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^.*\s{1,3}(.+)$").expect("static listing pattern"))
}

/// Split a location into its SAS module and the path below it
pub fn split_module(location: &str) -> (&str, &str) {
    let location = location.trim_start_matches('/');
    match location.split_once('/') {
        Some((module, rest)) => (module, rest.trim_start_matches('/')),
        None => (location, ""),
    }
}

/// Paths in `rsync -Rin` output that sit at `depth` slashes
///
/// Only entries whose permission string marks a directory, file or link are
/// considered; implied parent directories are dropped by the depth check.
pub fn candidate_locations<S: AsRef<str>>(lines: &[S], depth: usize) -> Vec<String> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| line.starts_with(['d', '-', 'l']))
        .filter_map(|line| {
            listing_location_pattern()
                .captures(line)
                .and_then(|captures| captures.get(1))
                .map(|location| location.as_str().to_string())
        })
        .filter(|location| location.matches('/').count() == depth)
        .collect()
}

/// rsync backend
#[derive(Debug)]
pub struct RsyncAccess {
    core: AccessCore,
    source_base: Option<String>,
}

impl RsyncAccess {
    pub fn new(core: AccessCore) -> Self {
        Self {
            core,
            source_base: None,
        }
    }

    /// `rsync://[user@]host`, set by `remote()`
    pub fn source_base(&self) -> Option<&str> {
        self.source_base.as_deref()
    }

    /// Distinct SAS modules in the stream queue
    pub fn modules(&self) -> BTreeSet<String> {
        self.core
            .stream()
            .iter()
            .map(|task| task.module().to_string())
            .collect()
    }

    fn require_source_base(&self) -> Result<&str> {
        Ok(self
            .source_base
            .as_deref()
            .ok_or(AccessError::NotConfigured)?)
    }
}

#[async_trait]
impl TransferBackend for RsyncAccess {
    fn mode(&self) -> AccessMode {
        AccessMode::Rsync
    }

    fn core(&self) -> &AccessCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AccessCore {
        &mut self.core
    }

    fn remote(&mut self, credentials: &CredentialChain) -> Result<()> {
        let netloc = self.core.resolver().netloc().to_string();
        self.core.configure(credentials, &netloc)?;

        let user = self
            .core
            .credentials()
            .map(|credentials| format!("{}@", credentials.username));
        let password = self
            .core
            .credentials()
            .map(|credentials| credentials.password().to_string());
        if let Some(password) = password {
            self.core.add_probe_env(env::RSYNC_PASSWORD, &password);
        }

        let base = format!(
            "rsync://{}{}",
            user.unwrap_or_default(),
            remote::DTN_NETLOC
        );
        debug!("rsync source {}", base);
        self.source_base = Some(base);
        Ok(())
    }

    fn add(&mut self, name: &str, keywords: &Keywords) -> Result<bool> {
        let task = match self.core.resolve(name, keywords)? {
            Some((location, full)) => {
                let source = match &self.source_base {
                    Some(base) => format!("{}/{}", base, location),
                    None => format!("rsync://{}/{}", remote::DTN_NETLOC, location),
                };
                Task::new(location, source, full)
            }
            None => None,
        };
        Ok(self.core.request(name, task))
    }

    async fn set_stream(&mut self) -> Result<usize> {
        self.core.require_ready()?;
        let base = self.require_source_base()?.to_string();
        let base_dir = self.core.base_dir()?;
        let requested = self.core.requested().tasks().to_vec();

        self.core.begin_stream();
        let mut matched = 0;
        for task in &requested {
            let (module, relative) = split_module(&task.location);
            let source = format!("{}/{}/{}", base, module, relative);
            let args = vec![
                "-Rin".to_string(),
                PROBE_FORMAT.to_string(),
                format!("{}*", source),
            ];
            let output = self.core.probe().run(RSYNC, &args).await?;
            if !output.success() {
                warn!(
                    "Listing {} exited with status {:?}, skipping",
                    task.location, output.code
                );
                continue;
            }

            let found = candidate_locations(&output.lines(), relative.matches('/').count());
            if found.is_empty() {
                warn!("No remote files match {}", task.location);
                continue;
            }
            for path in found {
                let location = format!("{}/{}", module, path);
                let source = format!("{}/{}", base, location);
                let destination = Path::new(&base_dir).join(module).join(&path);
                if let Some(task) = Task::new(location, source, destination) {
                    matched += 1;
                    self.core.push_stream(task);
                }
            }
        }
        Ok(self.core.finish_stream(matched)?)
    }

    fn commit_spec(&self) -> Result<CommitSpec> {
        let base = self.require_source_base()?;
        let base_dir = self.core.base_dir()?;
        let modules = self.modules();
        let module = match modules.len() {
            0 => return Err(AccessError::NoTasks.into()),
            1 => modules.into_iter().next().unwrap_or_default(),
            _ => {
                return Err(AccessError::MixedModules {
                    modules: modules.into_iter().collect(),
                }
                .into())
            }
        };

        let flags = if self.core.config().follow_symlinks {
            "-avRKL"
        } else {
            "-avRK"
        };
        let env = self
            .core
            .credentials()
            .map(|credentials| {
                vec![(
                    env::RSYNC_PASSWORD.to_string(),
                    credentials.password().to_string(),
                )]
            })
            .unwrap_or_default();

        Ok(CommitSpec {
            command: CommandTemplate::new(
                RSYNC,
                [flags, "--files-from={path}", "{source}", "{destination}"],
            ),
            format: ManifestFormat::ModuleLocations {
                module: module.clone(),
            },
            source: format!("{}/{}", base, module),
            destination: format!("{}/{}/", base_dir.trim_end_matches('/'), module),
            env,
        })
    }
}
