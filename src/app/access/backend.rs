//! Shared state and contract of the transfer backends
//!
//! A backend is driven in four steps: [`TransferBackend::remote`] resolves
//! credentials, [`TransferBackend::add`] queues requested files (which may
//! contain wildcards), [`TransferBackend::set_stream`] expands them into
//! concrete transfers and [`TransferBackend::commit`] runs the transfers over
//! parallel streams.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::app::path::location::{join_url, relative_to};
use crate::app::path::{Keywords, PathResolver};
use crate::app::queue::{FilterMode, Task, TaskQueue};
use crate::app::stream::{CommitSpec, StreamConfig, StreamScheduler};
use crate::app::supervisor::{ProbeRunner, ProcessSupervisor, ProgressSink, RunReport};
use crate::auth::{CredentialChain, Credentials};
use crate::constants::env;
use crate::errors::{AccessError, AccessResult, Result};

use super::config::{AccessConfig, AccessMode, CommitOptions};

/// State common to every backend
#[derive(Debug)]
pub struct AccessCore {
    resolver: PathResolver,
    config: AccessConfig,
    requested: TaskQueue,
    file_types: Vec<String>,
    stream: TaskQueue,
    scheduler: StreamScheduler,
    supervisor: ProcessSupervisor,
    probe: ProbeRunner,
    credentials: Option<Credentials>,
    configured: bool,
}

impl AccessCore {
    pub fn new(resolver: PathResolver, stream_config: StreamConfig, config: AccessConfig) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(stream_config.poll_interval),
            probe: ProbeRunner::new(stream_config.probe_timeout),
            scheduler: StreamScheduler::new(stream_config),
            resolver,
            config,
            requested: TaskQueue::new(),
            file_types: Vec::new(),
            stream: TaskQueue::new(),
            credentials: None,
            configured: false,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut PathResolver {
        &mut self.resolver
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Files queued by `add`, possibly with wildcards
    pub fn requested(&self) -> &TaskQueue {
        &self.requested
    }

    /// Concrete transfers produced by `set_stream`
    pub fn stream(&self) -> &TaskQueue {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TaskQueue {
        &mut self.stream
    }

    pub fn scheduler(&self) -> &StreamScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut StreamScheduler {
        &mut self.scheduler
    }

    pub fn probe(&self) -> &ProbeRunner {
        &self.probe
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Resolve credentials for `netloc` and mark remote access as set up
    ///
    /// Public releases resolve to no credentials.
    pub fn configure(&mut self, chain: &CredentialChain, netloc: &str) -> Result<()> {
        self.credentials = chain.resolve(netloc, self.resolver.is_public())?;
        self.configured = true;
        match &self.credentials {
            Some(credentials) => info!(
                "Remote access to {} as user {}",
                netloc, credentials.username
            ),
            None => info!("Public remote access to {}", netloc),
        }
        Ok(())
    }

    /// Add an environment variable to every probe command
    pub fn add_probe_env(&mut self, key: &str, value: &str) {
        let probe = std::mem::take(&mut self.probe);
        self.probe = probe.with_env(key, value);
    }

    /// Local SAS root, required by every stream transfer
    pub fn base_dir(&self) -> AccessResult<String> {
        self.resolver
            .base_dir()
            .ok_or_else(|| AccessError::LocationUnresolvable {
                path: format!("${}", env::BASE_DIR),
            })
    }

    /// Resolve a request into `(location, full path)`
    ///
    /// `Ok(None)` when the template does not resolve. Paths under a product
    /// root rather than the SAS base directory cannot be streamed.
    pub fn resolve(&self, name: &str, keywords: &Keywords) -> Result<Option<(String, String)>> {
        let Some(full) = self.resolver.full(name, keywords)? else {
            return Ok(None);
        };
        let under_base = self
            .resolver
            .base_dir()
            .and_then(|base| relative_to(&full, &base));
        match under_base {
            Some(location) => Ok(Some((location, full))),
            None if self.resolver.location_for_path(&full, None).is_some() => {
                Err(AccessError::DisallowedTransfer {
                    reason: format!(
                        "{} lies under a product root; fetch it with a single-file download",
                        full
                    ),
                }
                .into())
            }
            None => Ok(None),
        }
    }

    /// Queue a requested file, logging when nothing resolved
    pub fn request(&mut self, name: &str, task: Option<Task>) -> bool {
        match task {
            Some(task) => {
                debug!("Requested {}", task.location);
                self.requested.push(task);
                if !self.file_types.iter().any(|known| known == name) {
                    self.file_types.push(name.to_string());
                }
                true
            }
            None => {
                warn!(
                    "There is no file with filetype={} to access in the tree module loaded",
                    name
                );
                false
            }
        }
    }

    /// Preconditions of `set_stream`
    pub fn require_ready(&self) -> AccessResult<()> {
        if !self.configured {
            return Err(AccessError::NotConfigured);
        }
        if self.requested.is_empty() {
            return Err(AccessError::NoTasks);
        }
        Ok(())
    }

    /// Clear the stream queue ahead of a new expansion
    pub fn begin_stream(&mut self) {
        self.stream.reset();
        self.scheduler.reset();
    }

    pub fn push_stream(&mut self, task: Task) {
        self.stream.push(task);
    }

    /// Close an expansion that found `matched` remote files
    ///
    /// Files skipped as already present still count as matched.
    pub fn finish_stream(&self, matched: usize) -> AccessResult<usize> {
        if matched == 0 {
            return Err(AccessError::NoFilesFound {
                file_type: self.file_types.join(", "),
            });
        }
        if self.stream.is_empty() {
            info!("stream has nothing to do");
        } else {
            info!("Stream holds {} transfers", self.stream.len());
        }
        Ok(self.stream.len())
    }

    /// Commit a window of the stream queue and supervise it to completion
    pub async fn run(
        &mut self,
        spec: &CommitSpec,
        options: CommitOptions,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunReport> {
        let tasks = self.stream.slice(options.offset, options.limit).to_vec();
        if tasks.is_empty() {
            return Err(AccessError::NoTasks.into());
        }

        self.scheduler.reset();
        self.scheduler.populate(&tasks)?;
        let plan = self.scheduler.commit(spec).await?;
        let result = self
            .scheduler
            .run(&plan, &self.supervisor, progress)
            .await;
        self.scheduler.reset();

        let report = result?;
        if report.is_success() {
            info!("{}", report.summary());
        } else {
            error!("{}", report.summary());
        }
        Ok(report)
    }

    /// Discard requested files, stream tasks and slots
    pub fn reset(&mut self) {
        self.requested.reset();
        self.file_types.clear();
        self.stream.reset();
        self.scheduler.reset();
    }

    pub fn locations(&self, offset: usize, limit: Option<usize>) -> Vec<String> {
        self.stream
            .slice(offset, limit)
            .iter()
            .map(|task| task.location.clone())
            .collect()
    }

    /// Local paths of the stream window under the base directory
    pub fn paths(&self, offset: usize, limit: Option<usize>) -> Vec<PathBuf> {
        let Some(base_dir) = self.resolver.base_dir() else {
            return Vec::new();
        };
        self.locations(offset, limit)
            .into_iter()
            .map(|location| Path::new(&base_dir).join(location))
            .collect()
    }

    /// Web URLs of the stream window
    pub fn urls(&self, offset: usize, limit: Option<usize>) -> Vec<String> {
        let remote_base = self.resolver.remote_base();
        let sas_dir = self.resolver.config().sas_dir.clone();
        self.locations(offset, limit)
            .iter()
            .map(|location| join_url(&remote_base, &[&sas_dir, location]))
            .collect()
    }
}

/// One transfer tool behind the common access workflow
#[async_trait]
pub trait TransferBackend: Send + Sync {
    fn mode(&self) -> AccessMode;

    fn core(&self) -> &AccessCore;

    fn core_mut(&mut self) -> &mut AccessCore;

    /// Resolve credentials and the remote endpoint
    fn remote(&mut self, credentials: &CredentialChain) -> Result<()>;

    /// Queue the file (or wildcard pattern) of `name` with `keywords`
    ///
    /// Returns `false` when the template does not resolve.
    fn add(&mut self, name: &str, keywords: &Keywords) -> Result<bool>;

    /// Expand every requested file into concrete transfers
    ///
    /// # Returns
    ///
    /// The number of transfers in the stream queue
    async fn set_stream(&mut self) -> Result<usize>;

    /// Command, manifest layout and environment for a commit
    fn commit_spec(&self) -> Result<CommitSpec>;

    /// Run a window of the stream queue over parallel streams
    ///
    /// An empty stream queue, where every matched file is already present,
    /// is a successful run with no slots.
    async fn commit(
        &mut self,
        options: CommitOptions,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunReport> {
        if self.core().stream().is_empty() {
            info!("Nothing to transfer");
            return Ok(RunReport::empty());
        }
        let spec = self.commit_spec()?;
        self.core_mut().run(&spec, options, progress).await
    }

    fn reset(&mut self) {
        self.core_mut().reset();
    }

    fn shuffle(&mut self) {
        self.core_mut().stream_mut().shuffle();
    }

    /// Keep or drop stream tasks whose location matches `pattern`
    fn refine_task(&mut self, pattern: &str, mode: FilterMode) -> Result<usize> {
        Ok(self.core_mut().stream_mut().filter(pattern, mode)?)
    }

    fn locations(&self, offset: usize, limit: Option<usize>) -> Vec<String> {
        self.core().locations(offset, limit)
    }

    fn paths(&self, offset: usize, limit: Option<usize>) -> Vec<PathBuf> {
        self.core().paths(offset, limit)
    }

    fn urls(&self, offset: usize, limit: Option<usize>) -> Vec<String> {
        self.core().urls(offset, limit)
    }
}
