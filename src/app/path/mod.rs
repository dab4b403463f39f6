//! Path templating and resolution
//!
//! This module turns logical file types plus keyword arguments into concrete
//! local paths, relative SAS locations and remote URLs, and recovers keyword
//! values from example paths.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use sas_sync::app::path::{Environment, Keywords, PathResolver, ResolverConfig};
//! use sas_sync::app::templates::InMemoryTemplateStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryTemplateStore::new().with_release(
//!     "dr17",
//!     [("mangacube", "$SAS_BASE_DIR/dr17/manga/{drpver}/{plate}/manga-{plate}-{ifu}-LOGCUBE.fits.gz")],
//! );
//! let env = Environment::isolated().with_var("SAS_BASE_DIR", "/sas");
//! let config = ResolverConfig {
//!     release: Some("dr17".to_string()),
//!     ..ResolverConfig::default()
//! };
//! let resolver = PathResolver::new(Arc::new(store), config, env)?;
//!
//! let kw = Keywords::new().with("drpver", "v3_1_1").with("plate", 8485).with("ifu", 1901);
//! let url = resolver.url("mangacube", &kw)?;
//! assert_eq!(
//!     url.as_deref(),
//!     Some("https://data.sdss.org/sas/dr17/manga/v3_1_1/8485/manga-8485-1901-LOGCUBE.fits.gz")
//! );
//!
//! let recovered = resolver.extract("mangacube", "/sas/dr17/manga/v3_1_1/8485/manga-8485-1901-LOGCUBE.fits.gz")?;
//! assert_eq!(recovered, Some(kw));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod changelog;
pub mod compression;
pub mod environment;
pub mod extract;
pub mod format;
pub mod functions;
pub mod keywords;
pub mod location;
pub mod resolver;
pub mod template;

pub use changelog::{compute_changelog, templates_by_release, Changelog, PathChange};
pub use environment::{Environment, PreserveEnvVars};
pub use extract::{ExtractPattern, ExtractPiece};
pub use format::FormatSpec;
pub use functions::ComputedField;
pub use keywords::{KeywordValue, Keywords};
pub use resolver::{is_public_release, PathResolver, ResolverConfig};
pub use template::{Segment, Template};
