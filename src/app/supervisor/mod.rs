//! Subprocess supervision
//!
//! [`ProcessSupervisor`] launches one transfer subprocess per stream slot and
//! polls them until all have exited, reporting aggregate progress through a
//! [`ProgressSink`]. [`ProbeRunner`] runs single foreground commands with a
//! hang ceiling.

pub mod probe;
pub mod process;
pub mod progress;

pub use probe::{ProbeOutput, ProbeRunner};
pub use process::{ProcessSupervisor, RunReport};
pub use progress::{NoopProgress, ProgressAggregator, ProgressSink};
