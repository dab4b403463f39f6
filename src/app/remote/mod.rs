//! Remote discovery on the SAS web server
//!
//! - [`RemoteLister`]: rate-limited, optionally authenticated index page fetches
//! - [`ListingParser`]: pluggable index page parsing ([`AutoindexParser`],
//!   [`HtmlTableParser`])
//! - [`QueryWalker`]: depth-first expansion of wildcard URLs into files
//! - [`exists_locally_hint`]: best-effort skip check for files already on disk

pub mod client;
pub mod exists;
pub mod listing;
pub mod query;

pub use client::{directory_url, RemoteConfig, RemoteLister};
pub use exists::{exists_locally_hint, parse_listing_time};
pub use listing::{AutoindexParser, HtmlTableParser, ListingEntry, ListingParser};
pub use query::{segment_pattern, QueryWalker, RemoteEntry};
