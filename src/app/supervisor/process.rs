//! Concurrent slot subprocesses
//!
//! Each slot runs as its own OS process with stdout and stderr redirected to
//! the slot's `.log` and `.err` files. The supervisor polls liveness at a
//! fixed interval from a single task; a failing slot never cancels its
//! siblings.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use crate::app::stream::{SlotLaunch, TransferPlan};
use crate::constants::stream::POLL_INTERVAL;
use crate::errors::SubprocessResult;

use super::progress::{ProgressAggregator, ProgressSink};

/// Outcome of a supervised transfer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Exit code per slot; `None` if the slot never started or died by signal
    pub return_codes: Vec<Option<i32>>,
    /// Directory holding manifests and logs
    pub run_dir: PathBuf,
    /// Wall time spent waiting for the slots
    pub elapsed: Duration,
}

impl RunReport {
    /// Report of a run that had nothing to transfer
    pub fn empty() -> Self {
        Self {
            return_codes: Vec::new(),
            run_dir: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.return_codes.iter().all(|code| *code == Some(0))
    }

    /// Indices of slots that did not exit cleanly
    pub fn failed_slots(&self) -> Vec<usize> {
        self.return_codes
            .iter()
            .enumerate()
            .filter(|(_, code)| **code != Some(0))
            .map(|(index, _)| index)
            .collect()
    }

    /// One-line user-facing outcome
    pub fn summary(&self) -> String {
        if self.is_success() {
            "Done!".to_string()
        } else {
            format!("Failed! See error logs in {}", self.run_dir.display())
        }
    }
}

/// Launches and polls the subprocesses of a transfer plan
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    poll_interval: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}

struct RunningSlot {
    child: Option<Child>,
    code: Option<i32>,
}

impl RunningSlot {
    fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl ProcessSupervisor {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run every slot of `plan` to completion
    pub async fn run(
        &self,
        plan: &TransferPlan,
        progress: &mut dyn ProgressSink,
    ) -> SubprocessResult<RunReport> {
        let started = Instant::now();
        let mut slots = Vec::with_capacity(plan.launches.len());
        for launch in &plan.launches {
            slots.push(self.launch(launch));
        }

        let mut aggregator =
            ProgressAggregator::new(plan.launches.iter().map(|l| l.task_count).collect());
        progress.start(aggregator.total(), slots.len());

        let mut polls: u64 = 0;
        loop {
            for (index, slot) in slots.iter_mut().enumerate() {
                poll_slot(index, slot).await;
            }
            let running: Vec<bool> = slots.iter().map(RunningSlot::is_running).collect();
            let delta = aggregator.update(&running);
            if delta > 0 {
                progress.advance(delta);
            }

            let running_count = running.iter().filter(|r| **r).count();
            if running_count == 0 {
                break;
            }
            let waiting = aggregator.total() - aggregator.finished(&running);
            let status = format!(
                "syncing... waiting for {} streams ({} files) [running for {} seconds]",
                running_count,
                waiting,
                started.elapsed().as_secs()
            );
            debug!("{}", status);
            progress.message(&status);

            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
        }

        let report = RunReport {
            return_codes: slots.iter().map(|slot| slot.code).collect(),
            run_dir: plan.run_dir.path().to_path_buf(),
            elapsed: started.elapsed(),
        };
        progress.finish(report.is_success());

        if report.is_success() {
            info!(
                "All {} streams finished after {} polls",
                report.return_codes.len(),
                polls
            );
        } else {
            error!(
                "Streams {:?} failed with return codes {:?}",
                report.failed_slots(),
                report.return_codes
            );
        }
        Ok(report)
    }

    /// Start one slot; any failure is recorded on the slot instead of aborting the run
    fn launch(&self, launch: &SlotLaunch) -> RunningSlot {
        let not_started = RunningSlot {
            child: None,
            code: None,
        };
        let (log, err) = match open_outputs(launch) {
            Ok(files) => files,
            Err(e) => {
                warn!("Stream {} cannot open its log files: {}", launch.index, e);
                record_start_failure(&launch.err_path, &launch.command.program, &e);
                return not_started;
            }
        };

        let mut command = Command::new(&launch.command.program);
        command
            .args(&launch.command.args)
            .envs(launch.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err))
            .kill_on_drop(true);

        debug!("[background]$ {}", launch.command);
        match command.spawn() {
            Ok(child) => {
                debug!(
                    "Stream {} logging to {}",
                    launch.index,
                    launch.log_path.display()
                );
                RunningSlot {
                    child: Some(child),
                    code: None,
                }
            }
            Err(e) => {
                warn!(
                    "Stream {} failed to start {}: {}",
                    launch.index, launch.command.program, e
                );
                record_start_failure(&launch.err_path, &launch.command.program, &e);
                not_started
            }
        }
    }
}

fn open_outputs(launch: &SlotLaunch) -> std::io::Result<(File, File)> {
    Ok((File::create(&launch.log_path)?, File::create(&launch.err_path)?))
}

/// Collect the exit status of a finished slot
///
/// A slot whose status cannot be read is killed and reported without a code.
async fn poll_slot(index: usize, slot: &mut RunningSlot) {
    let Some(child) = slot.child.as_mut() else {
        return;
    };
    match child.try_wait() {
        Ok(Some(status)) => {
            slot.code = status.code();
            slot.child = None;
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Lost track of stream {}: {}", index, e);
            if let Err(e) = child.kill().await {
                warn!("Could not stop stream {}: {}", index, e);
            }
            slot.code = None;
            slot.child = None;
        }
    }
}

fn record_start_failure(err_path: &Path, program: &str, error: &std::io::Error) {
    if let Err(e) = std::fs::write(err_path, format!("failed to start {}: {}\n", program, error)) {
        warn!("Could not write {}: {}", err_path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(codes: Vec<Option<i32>>) -> RunReport {
        RunReport {
            return_codes: codes,
            run_dir: PathBuf::from("/tmp/sas_sync/20240115_001"),
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_report_success_requires_all_zero() {
        assert!(report(vec![Some(0), Some(0)]).is_success());
        assert_eq!(report(vec![Some(0), Some(0)]).summary(), "Done!");

        let failed = report(vec![Some(0), Some(23), None]);
        assert!(!failed.is_success());
        assert_eq!(failed.failed_slots(), vec![1, 2]);
        assert_eq!(
            failed.summary(),
            "Failed! See error logs in /tmp/sas_sync/20240115_001"
        );
    }

    #[test]
    fn test_empty_report_is_success() {
        let empty = RunReport::empty();
        assert!(empty.is_success());
        assert!(empty.failed_slots().is_empty());
        assert_eq!(empty.summary(), "Done!");
    }
}
