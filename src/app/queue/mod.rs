//! Task queue for file transfers
//!
//! Resolved files are appended to a [`TaskQueue`] as `(location, source,
//! destination)` triples before being partitioned into streams. The queue
//! supports in-place shuffling, regex filtering on locations and bounded
//! windows for partial commits.
//!
//! # Basic Usage
//!
//! ```rust
//! use sas_sync::app::queue::{FilterMode, TaskQueue};
//!
//! let mut queue = TaskQueue::new();
//! queue.append(
//!     "dr17/manga/spectro/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz",
//!     "https://data.sdss.org/sas/dr17/manga/spectro/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz",
//!     "/data/sas/dr17/manga/spectro/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz",
//! );
//!
//! // Empty fields are ignored rather than reported
//! assert!(!queue.append("", "https://data.sdss.org/sas/x", "/data/x"));
//! assert_eq!(queue.len(), 1);
//!
//! queue.filter(r"LOGCUBE", FilterMode::Exclude).unwrap();
//! assert!(queue.is_empty());
//! ```

pub mod core;
pub mod types;

#[cfg(test)]
mod tests;

pub use core::TaskQueue;
pub use types::{FilterMode, QueueStats, Task};
