//! Remote access to the SAS
//!
//! - [`RsyncAccess`] and [`CurlAccess`] implement [`TransferBackend`]: queue
//!   requested files, expand wildcards against the server and run the
//!   transfers over parallel streams
//! - [`HttpAccess`] downloads a single resolved file
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sas_sync::app::access::{open_backend, AccessConfig, CommitOptions};
//! use sas_sync::app::path::{Environment, Keywords, PathResolver, ResolverConfig};
//! use sas_sync::app::remote::RemoteConfig;
//! use sas_sync::app::stream::StreamConfig;
//! use sas_sync::app::supervisor::NoopProgress;
//! use sas_sync::app::templates::TomlTemplateStore;
//! use sas_sync::auth::CredentialChain;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(TomlTemplateStore::new("/etc/sas-sync/templates"));
//! let resolver = PathResolver::new(store, ResolverConfig::default(), Environment::from_process())?;
//! let mut access = open_backend(
//!     resolver,
//!     StreamConfig::default(),
//!     AccessConfig::default(),
//!     RemoteConfig::default(),
//! );
//!
//! access.remote(&CredentialChain::standard(None, true))?;
//! access.add("spec-lite", &Keywords::new().with("run2d", "v5_13_2").with("plateid", 3606).with("mjd", 55182).with("fiberid", "*"))?;
//! access.set_stream().await?;
//! let report = access.commit(CommitOptions::default(), &mut NoopProgress).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod curl;
pub mod http;
pub mod rsync;

pub use backend::{AccessCore, TransferBackend};
pub use config::{AccessConfig, AccessMode, CommitOptions};
pub use curl::CurlAccess;
pub use http::HttpAccess;
pub use rsync::RsyncAccess;

use crate::app::path::PathResolver;
use crate::app::remote::RemoteConfig;
use crate::app::stream::StreamConfig;

/// Build the backend selected by `config.mode`
pub fn open_backend(
    resolver: PathResolver,
    stream_config: StreamConfig,
    config: AccessConfig,
    remote_config: RemoteConfig,
) -> Box<dyn TransferBackend> {
    let mode = config.mode.resolve();
    let core = AccessCore::new(resolver, stream_config, config);
    match mode {
        AccessMode::Curl => Box::new(CurlAccess::new(core, remote_config)),
        _ => Box::new(RsyncAccess::new(core)),
    }
}
