//! Aggregate progress across transfer slots
//!
//! A slot's tasks count as finished only once its subprocess exits, so
//! progress advances in per-slot steps.

/// Receiver of aggregate progress updates
pub trait ProgressSink: Send {
    /// Run started with `total` tasks spread over `streams` slots
    fn start(&mut self, total: usize, streams: usize);

    /// `count` more tasks finished
    fn advance(&mut self, count: usize);

    /// Status line while waiting
    fn message(&mut self, _message: &str) {}

    /// All slots exited
    fn finish(&mut self, success: bool);
}

/// Sink that discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn start(&mut self, _total: usize, _streams: usize) {}
    fn advance(&mut self, _count: usize) {}
    fn finish(&mut self, _success: bool) {}
}

/// Finished-task accounting between polls
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    tasks_per_slot: Vec<usize>,
    reported: usize,
}

impl ProgressAggregator {
    pub fn new(tasks_per_slot: Vec<usize>) -> Self {
        Self {
            tasks_per_slot,
            reported: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.tasks_per_slot.iter().sum()
    }

    /// Tasks belonging to slots that are no longer running
    pub fn finished(&self, running: &[bool]) -> usize {
        self.tasks_per_slot
            .iter()
            .zip(running)
            .filter(|(_, running)| !**running)
            .map(|(count, _)| count)
            .sum()
    }

    /// New finished tasks since the previous call
    pub fn update(&mut self, running: &[bool]) -> usize {
        let finished = self.finished(running);
        let delta = finished.saturating_sub(self.reported);
        self.reported = self.reported.max(finished);
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deltas_follow_slot_exits() {
        let mut aggregator = ProgressAggregator::new(vec![4, 4, 3]);
        assert_eq!(aggregator.total(), 11);
        assert_eq!(aggregator.update(&[true, true, true]), 0);
        assert_eq!(aggregator.update(&[true, false, true]), 4);
        assert_eq!(aggregator.update(&[true, false, true]), 0);
        assert_eq!(aggregator.update(&[false, false, false]), 7);
        assert_eq!(aggregator.finished(&[false, false, false]), 11);
    }
}
