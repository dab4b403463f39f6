//! Stream slots ("streamlets")

use std::path::PathBuf;

use crate::app::queue::Task;

/// One parallel worker's share of a transfer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSlot {
    index: usize,
    tasks: Vec<Task>,
}

impl StreamSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            tasks: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
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

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
