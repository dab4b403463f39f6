//! Terminal progress display for stream transfers
//!
//! Progress advances when a slot's subprocess exits, so the bar moves in
//! per-slot steps. The bar is hidden when stderr is not a terminal.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::app::supervisor::ProgressSink;

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Draw the bar at all
    pub enable_progress_bars: bool,
    /// Spinner tick interval
    pub tick_interval: Duration,
    /// Prefix shown in front of the bar
    pub label: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: atty::is(atty::Stream::Stderr),
            tick_interval: Duration::from_millis(120),
            label: "sync".to_string(),
        }
    }
}

impl ProgressConfig {
    /// Configuration that never draws
    pub fn hidden() -> Self {
        Self {
            enable_progress_bars: false,
            ..Self::default()
        }
    }
}

/// indicatif bar counting finished files across all streams
#[derive(Debug)]
pub struct IndicatifProgress {
    config: ProgressConfig,
    bar: Option<ProgressBar>,
    finished: u64,
}

impl IndicatifProgress {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            bar: None,
            finished: 0,
        }
    }

    /// Files reported finished so far
    pub fn finished(&self) -> u64 {
        self.finished
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl ProgressSink for IndicatifProgress {
    fn start(&mut self, total: usize, streams: usize) {
        debug!("Progress started: {} files over {} streams", total, streams);
        let bar = if self.config.enable_progress_bars {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden())
        };
        bar.set_style(Self::style());
        bar.set_prefix(format!("{} ({} streams)", self.config.label, streams));
        bar.enable_steady_tick(self.config.tick_interval);
        self.finished = 0;
        self.bar = Some(bar);
    }

    fn advance(&mut self, count: usize) {
        self.finished += count as u64;
        if let Some(bar) = &self.bar {
            bar.inc(count as u64);
        }
    }

    fn message(&mut self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    fn finish(&mut self, success: bool) {
        if let Some(bar) = self.bar.take() {
            if success {
                bar.finish_with_message("done");
            } else {
                bar.abandon_with_message("failed");
            }
        }
    }
}
