//! Progress reporting abstraction so the core never depends on a terminal.

use indicatif::{ProgressBar, ProgressStyle};

/// Sink for long-running operation progress (scans, Pass-3 hashing).
pub trait ProgressSink: Send + Sync {
    fn start(&self, total: u64, message: &str);
    fn set_current(&self, current: &str);
    fn advance(&self, delta: u64);
    fn finish(&self);
}

/// Renders a terminal bar via `indicatif`.
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifProgress {
    fn start(&self, total: u64, message: &str) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_message(message.to_string());
    }

    fn set_current(&self, current: &str) {
        self.bar.set_message(current.to_string());
    }

    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Swallows every call — used by tests and non-interactive pipes.
#[derive(Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn start(&self, _total: u64, _message: &str) {}
    fn set_current(&self, _current: &str) {}
    fn advance(&self, _delta: u64) {}
    fn finish(&self) {}
}
