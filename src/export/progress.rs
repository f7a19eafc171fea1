//! Progress tracking for export operations
//!
//! Shows how many entities of the current kind have been processed.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress tracker over the entities of one kind
pub struct ProgressTracker {
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `total` - Number of entities to process
    /// * `label` - What is being processed, e.g. "datasets"
    /// * `enable_bar` - Whether to display a progress bar
    pub fn new(total: u64, label: &str, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} {} [{{bar:30.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                    label
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar
        });

        Self { bar }
    }

    /// Show which entity is being processed
    pub fn start_entity(&self, name: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(name.to_string());
        }
    }

    /// Mark one entity as done
    pub fn entity_done(&self) {
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
