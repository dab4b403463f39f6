//! Round-robin distribution of tasks over parallel slots

use std::path::PathBuf;

use tracing::{debug, info};

use crate::app::queue::Task;
use crate::app::supervisor::{ProcessSupervisor, ProgressSink, RunReport};
use crate::errors::Result;

use super::command::{CommandContext, CommandTemplate, RenderedCommand};
use super::config::{effective_stream_count, StreamConfig};
use super::manifest::ManifestFormat;
use super::run_dir::RunDirectory;
use super::slot::StreamSlot;
use super::state::RunState;

/// Everything needed to launch one slot's subprocess
#[derive(Debug, Clone)]
pub struct SlotLaunch {
    pub index: usize,
    pub command: RenderedCommand,
    pub env: Vec<(String, String)>,
    pub manifest_path: PathBuf,
    pub log_path: PathBuf,
    pub err_path: PathBuf,
    pub task_count: usize,
}

/// Committed transfer run, ready for the supervisor
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub run_dir: RunDirectory,
    pub launches: Vec<SlotLaunch>,
}

impl TransferPlan {
    pub fn total_tasks(&self) -> usize {
        self.launches.iter().map(|launch| launch.task_count).sum()
    }
}

/// What a commit writes and runs
#[derive(Debug, Clone)]
pub struct CommitSpec {
    pub command: CommandTemplate,
    pub format: ManifestFormat,
    pub source: String,
    pub destination: String,
    pub env: Vec<(String, String)>,
}

/// Owner and sole mutator of the stream slots of one transfer run
#[derive(Debug)]
pub struct StreamScheduler {
    config: StreamConfig,
    slots: Vec<StreamSlot>,
    state: RunState,
}

impl StreamScheduler {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            state: RunState::Empty,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn set_stream_count(&mut self, stream_count: usize) {
        self.config.stream_count = stream_count;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn slots(&self) -> &[StreamSlot] {
        &self.slots
    }

    pub fn total_tasks(&self) -> usize {
        self.slots.iter().map(StreamSlot::len).sum()
    }

    /// Distribute `tasks` over the slots, task `i` going to slot `i mod K`
    ///
    /// # Returns
    ///
    /// The number of slots in use
    pub fn populate(&mut self, tasks: &[Task]) -> Result<usize> {
        self.state.advance(RunState::Populated)?;

        let count = effective_stream_count(self.config.stream_count, tasks.len());
        if count < self.config.stream_count {
            debug!(
                "Reducing the number of streams from {} to {}, the number of tasks",
                self.config.stream_count, count
            );
        }
        self.slots = (0..count).map(StreamSlot::new).collect();
        for (position, task) in tasks.iter().enumerate() {
            self.slots[position % count].push(task.clone());
        }
        info!("Distributed {} tasks over {} streams", tasks.len(), count);
        Ok(count)
    }

    /// Write every slot manifest into a fresh run directory
    pub async fn commit(&mut self, spec: &CommitSpec) -> Result<TransferPlan> {
        if self.state != RunState::Populated {
            // Surface the same error advance() would give
            self.state.advance(RunState::Committed)?;
        }

        let data_dir = self.config.resolve_data_dir();
        let run_dir = RunDirectory::create(&data_dir, &self.config.label).await?;

        let mut launches = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let manifest_path = run_dir.manifest_path(slot.index());
            spec.format.write(&manifest_path, slot).await?;
            let command = spec.command.render(&CommandContext {
                path: manifest_path.to_string_lossy().into_owned(),
                source: spec.source.clone(),
                destination: spec.destination.clone(),
            });
            launches.push(SlotLaunch {
                index: slot.index(),
                command,
                env: spec.env.clone(),
                manifest_path,
                log_path: run_dir.log_path(slot.index()),
                err_path: run_dir.err_path(slot.index()),
                task_count: slot.len(),
            });
        }

        self.state.advance(RunState::Committed)?;
        info!("Streams added to {}", run_dir.path().display());
        Ok(TransferPlan { run_dir, launches })
    }

    /// Launch and supervise a committed plan until every slot exits
    pub async fn run(
        &mut self,
        plan: &TransferPlan,
        supervisor: &ProcessSupervisor,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunReport> {
        self.state.advance(RunState::Running)?;
        let report = supervisor.run(plan, progress).await?;
        self.state.advance(RunState::Done)?;
        Ok(report)
    }

    /// Discard slots and return to `Empty`
    pub fn reset(&mut self) {
        self.slots.clear();
        self.state = RunState::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn tasks(count: usize) -> Vec<Task> {
        (0..count)
            .map(|i| {
                Task::new(
                    format!("dr17/f{}.fits", i),
                    format!("https://data.sdss.org/sas/dr17/f{}.fits", i),
                    format!("/sas/dr17/f{}.fits", i),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_round_robin_fairness() {
        for (task_count, requested) in [(17, 5), (5, 5), (3, 5), (10, 3), (1, 5), (11, 0)] {
            let mut scheduler =
                StreamScheduler::new(StreamConfig::default().with_stream_count(requested));
            let input = tasks(task_count);
            let k = scheduler.populate(&input).unwrap();

            let min = task_count / k;
            let max = (task_count + k - 1) / k;
            for slot in scheduler.slots() {
                assert!(slot.len() >= min && slot.len() <= max);
            }

            let union: Vec<&str> = scheduler
                .slots()
                .iter()
                .flat_map(|slot| slot.locations())
                .collect();
            let unique: HashSet<&str> = union.iter().copied().collect();
            assert_eq!(union.len(), task_count);
            assert_eq!(unique.len(), task_count);
        }
    }

    #[test]
    fn test_assignment_is_positional() {
        let mut scheduler = StreamScheduler::new(StreamConfig::default().with_stream_count(3));
        scheduler.populate(&tasks(7)).unwrap();
        assert_eq!(
            scheduler.slots()[0].locations(),
            vec!["dr17/f0.fits", "dr17/f3.fits", "dr17/f6.fits"]
        );
        assert_eq!(scheduler.slots()[2].locations(), vec!["dr17/f2.fits", "dr17/f5.fits"]);
    }

    #[test]
    fn test_slot_count_never_exceeds_tasks() {
        let mut scheduler = StreamScheduler::new(StreamConfig::default());
        assert_eq!(scheduler.populate(&tasks(2)).unwrap(), 2);
        assert_eq!(scheduler.slots().len(), 2);
    }

    #[test]
    fn test_repopulate_requires_reset() {
        let mut scheduler = StreamScheduler::new(StreamConfig::default());
        scheduler.populate(&tasks(4)).unwrap();
        assert!(scheduler.populate(&tasks(4)).is_err());

        scheduler.reset();
        assert_eq!(scheduler.state(), RunState::Empty);
        assert!(scheduler.slots().is_empty());
        scheduler.populate(&tasks(2)).unwrap();
        assert_eq!(scheduler.total_tasks(), 2);
    }

    #[tokio::test]
    async fn test_commit_writes_manifests() {
        let temp = TempDir::new().unwrap();
        let config = StreamConfig {
            data_dir: Some(temp.path().to_path_buf()),
            stream_count: 2,
            ..StreamConfig::default()
        };
        let mut scheduler = StreamScheduler::new(config.with_label("sas_rsync"));

        let spec = CommitSpec {
            command: CommandTemplate::parse("rsync -avRK --files-from={path} {source} {destination}")
                .unwrap(),
            format: ManifestFormat::Locations,
            source: "rsync://dtn01.sdss.org/dr17".to_string(),
            destination: "/sas/dr17/".to_string(),
            env: Vec::new(),
        };
        assert!(scheduler.commit(&spec).await.is_err());

        scheduler.populate(&tasks(3)).unwrap();
        let plan = scheduler.commit(&spec).await.unwrap();
        assert_eq!(scheduler.state(), RunState::Committed);
        assert_eq!(plan.launches.len(), 2);
        assert_eq!(plan.total_tasks(), 3);

        let manifest = std::fs::read_to_string(&plan.launches[0].manifest_path).unwrap();
        assert_eq!(manifest, "dr17/f0.fits\ndr17/f2.fits\n");
        assert!(plan.launches[1]
            .command
            .args
            .iter()
            .any(|arg| arg.ends_with("sas_rsync_01.txt")));
        assert!(plan.run_dir.path().starts_with(temp.path().join("sas_rsync")));
    }
}
