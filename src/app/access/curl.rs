//! curl batch transfers from the SAS web server
//!
//! Wildcards in requested URLs are expanded by walking the server's directory
//! listings; each stream then runs `curl -K <manifest>` over a config file of
//! `url`/`output` pairs.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app::path::location::join_url;
use crate::app::path::Keywords;
use crate::app::queue::Task;
use crate::app::remote::{exists_locally_hint, QueryWalker, RemoteConfig, RemoteLister};
use crate::app::stream::{CommandTemplate, CommitSpec, ManifestFormat};
use crate::auth::CredentialChain;
use crate::constants::env;
use crate::errors::{AccessError, Result};

use super::backend::{AccessCore, TransferBackend};
use super::config::AccessMode;

const CURL: &str = "curl";

/// curl backend
#[derive(Debug)]
pub struct CurlAccess {
    core: AccessCore,
    remote_config: RemoteConfig,
    lister: Option<Arc<RemoteLister>>,
}

impl CurlAccess {
    pub fn new(core: AccessCore, remote_config: RemoteConfig) -> Self {
        Self {
            core,
            remote_config,
            lister: None,
        }
    }

    /// Use a preconfigured lister instead of building one in `remote()`
    pub fn with_lister(mut self, lister: RemoteLister) -> Self {
        self.lister = Some(Arc::new(lister));
        self
    }

    /// URL prefix in front of every SAS location
    fn sas_root(&self) -> String {
        let resolver = self.core.resolver();
        join_url(&resolver.remote_base(), &[&resolver.config().sas_dir])
    }

    /// Location of a listed URL relative to the SAS root
    pub fn location_of(&self, url: &str) -> Option<String> {
        let root = format!("{}/", self.sas_root());
        url.strip_prefix(&root)
            .map(|location| location.trim_start_matches('/').to_string())
            .filter(|location| !location.is_empty())
    }
}

#[async_trait]
impl TransferBackend for CurlAccess {
    fn mode(&self) -> AccessMode {
        AccessMode::Curl
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
        if self.lister.is_none() {
            let lister = RemoteLister::new(&self.remote_config, self.core.credentials().cloned())?;
            self.lister = Some(Arc::new(lister));
        }
        Ok(())
    }

    fn add(&mut self, name: &str, keywords: &Keywords) -> Result<bool> {
        let task = match self.core.resolve(name, keywords)? {
            Some((location, full)) => {
                let source = join_url(&self.sas_root(), &[&location]);
                Task::new(location, source, full)
            }
            None => None,
        };
        Ok(self.core.request(name, task))
    }

    async fn set_stream(&mut self) -> Result<usize> {
        self.core.require_ready()?;
        let lister = self.lister.clone().ok_or(AccessError::NotConfigured)?;
        let base_dir = self.core.base_dir()?;
        let skip_existing = self.core.config().skip_existing;
        let requested = self.core.requested().tasks().to_vec();

        self.core.begin_stream();
        let mut matched = 0;
        for task in &requested {
            let mut walker = QueryWalker::new(Arc::clone(&lister), &task.source)?;
            let mut found = 0;
            while let Some(entry) = walker.next().await {
                let entry = entry?;
                let Some(location) = self.location_of(&entry.url) else {
                    warn!("Listed URL {} is outside the SAS root", entry.url);
                    continue;
                };
                found += 1;
                let destination = Path::new(&base_dir).join(&location);
                if skip_existing
                    && exists_locally_hint(&destination, entry.size, entry.modified.as_deref())
                {
                    debug!("Skipping {}, already on disk", location);
                    continue;
                }
                if let Some(task) = Task::new(location, entry.url, destination) {
                    self.core.push_stream(task);
                }
            }
            if found == 0 {
                warn!("No remote files match {}", task.location);
            }
            matched += found;
        }
        Ok(self.core.finish_stream(matched)?)
    }

    fn commit_spec(&self) -> Result<CommitSpec> {
        if !self.core.is_configured() {
            return Err(AccessError::NotConfigured.into());
        }
        let credentials = self.core.credentials().cloned();
        let env = credentials
            .as_ref()
            .map(|credentials| {
                vec![(
                    env::CURL_PASSWORD.to_string(),
                    credentials.password().to_string(),
                )]
            })
            .unwrap_or_default();

        Ok(CommitSpec {
            command: CommandTemplate::new(CURL, ["--create-dirs", "--fail", "-sSRLK", "{path}"]),
            format: ManifestFormat::CurlConfig { credentials },
            source: self.sas_root(),
            destination: self.core.base_dir()?,
            env,
        })
    }
}
