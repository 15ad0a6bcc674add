use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const DONE_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Progress over the filings of one run.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        let pb = ProgressBar::new(total);
        pb.set_style(style(TEMPLATE));
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { progress_bar: pb }
    }

    /// Tracker that draws nothing, for `--no-progress` and tests.
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
        }
    }

    pub fn update_message(&self, entity_name: &str) {
        self.progress_bar.set_message(format!("Processing [{}]", entity_name));
    }

    pub fn increment(&self) {
        self.progress_bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    pub fn finish(&self, stored: usize) {
        self.progress_bar.set_style(style(DONE_TEMPLATE));
        self.progress_bar.finish_with_message(format!("Complete [{} stored]", stored));
    }

    pub fn abandon(&self, reason: &str) {
        self.progress_bar.abandon_with_message(format!("Aborted [{}]", reason));
    }
}
