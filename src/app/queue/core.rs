//! Core task queue implementation

use std::path::PathBuf;

use rand::seq::SliceRandom;
use regex::Regex;
use tracing::debug;

use crate::errors::QueueResult;

use super::types::{FilterMode, QueueStats, Task};

/// Ordered list of pending transfers
///
/// The queue owns its tasks. Appending with an empty field is silently
/// ignored so that speculative resolution failures never abort a batch.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    ignored: usize,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transfer
    ///
    /// # Returns
    ///
    /// `true` if the task was queued, `false` if a field was empty
    pub fn append(
        &mut self,
        location: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> bool {
        match Task::new(location, source, destination) {
            Some(task) => {
                self.push(task);
                true
            }
            None => {
                self.ignored += 1;
                debug!("Ignoring task with an empty field");
                false
            }
        }
    }

    /// Append an already constructed task
    pub fn push(&mut self, task: Task) {
        debug!("Queued {}", task.location);
        self.tasks.push(task);
    }

    /// Randomize the order in place
    pub fn shuffle(&mut self) {
        self.tasks.shuffle(&mut rand::thread_rng());
    }

    /// Keep or drop tasks whose location matches `pattern`
    ///
    /// # Returns
    ///
    /// Number of tasks removed
    pub fn filter(&mut self, pattern: &str, mode: FilterMode) -> QueueResult<usize> {
        let regex = Regex::new(pattern)?;
        let before = self.tasks.len();
        self.tasks
            .retain(|task| mode.keeps(regex.is_match(&task.location)));
        let removed = before - self.tasks.len();
        debug!("Filter {:?} {} removed {} tasks", mode, pattern, removed);
        Ok(removed)
    }

    /// Bounded view starting at `offset`, at most `limit` tasks
    pub fn slice(&self, offset: usize, limit: Option<usize>) -> &[Task] {
        let start = offset.min(self.tasks.len());
        let end = match limit {
            Some(limit) => start.saturating_add(limit).min(self.tasks.len()),
            None => self.tasks.len(),
        };
        &self.tasks[start..end]
    }

    /// Restrict the queue to a bounded window
    pub fn truncate_to(&mut self, offset: usize, limit: Option<usize>) {
        let kept = self.slice(offset, limit).to_vec();
        self.tasks = kept;
    }

    /// Empty the queue
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.ignored = 0;
    }

    /// Mutable access for existence probes
    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn locations(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.location.as_str()).collect()
    }

    pub fn sources(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.source.as_str()).collect()
    }

    pub fn destinations(&self) -> Vec<&PathBuf> {
        self.tasks.iter().map(|task| &task.destination).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.tasks.len(),
            ignored: self.ignored,
            existing: self
                .tasks
                .iter()
                .filter(|task| task.exists == Some(true))
                .count(),
        }
    }
}

impl<'a> IntoIterator for &'a TaskQueue {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

impl Extend<Task> for TaskQueue {
    fn extend<I: IntoIterator<Item = Task>>(&mut self, iter: I) {
        for task in iter {
            self.push(task);
        }
    }
}
