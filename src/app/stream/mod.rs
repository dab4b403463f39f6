//! Parallel transfer streams
//!
//! The [`StreamScheduler`] partitions queued tasks into at most
//! [`MAX_STREAM_COUNT`](crate::constants::MAX_STREAM_COUNT) slots, writes one
//! manifest per slot into a fresh [`RunDirectory`] and hands the resulting
//! [`TransferPlan`] to the process supervisor.
//!
//! # Lifecycle
//!
//! ```text
//! EMPTY -> POPULATED -> COMMITTED -> RUNNING -> DONE
//! ```
//!
//! Every step must follow the previous one; populating again requires a
//! [`StreamScheduler::reset`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use sas_sync::app::queue::TaskQueue;
//! use sas_sync::app::stream::{CommandTemplate, CommitSpec, ManifestFormat, StreamConfig, StreamScheduler};
//! use sas_sync::app::supervisor::{NoopProgress, ProcessSupervisor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut queue = TaskQueue::new();
//! queue.append("dr17/a.fits", "https://data.sdss.org/sas/dr17/a.fits", "/sas/dr17/a.fits");
//!
//! let mut scheduler = StreamScheduler::new(StreamConfig::default());
//! scheduler.populate(queue.tasks())?;
//!
//! let spec = CommitSpec {
//!     command: CommandTemplate::new("curl", ["--create-dirs", "--fail", "-sSRLK", "{path}"]),
//!     format: ManifestFormat::CurlConfig { credentials: None },
//!     source: String::new(),
//!     destination: String::new(),
//!     env: Vec::new(),
//! };
//! let plan = scheduler.commit(&spec).await?;
//! let report = scheduler
//!     .run(&plan, &ProcessSupervisor::default(), &mut NoopProgress)
//!     .await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod manifest;
pub mod run_dir;
pub mod scheduler;
pub mod slot;
pub mod state;

pub use command::{CommandContext, CommandTemplate, RenderedCommand};
pub use config::{effective_stream_count, StreamConfig};
pub use manifest::ManifestFormat;
pub use run_dir::RunDirectory;
pub use scheduler::{CommitSpec, SlotLaunch, StreamScheduler, TransferPlan};
pub use slot::StreamSlot;
pub use state::RunState;
