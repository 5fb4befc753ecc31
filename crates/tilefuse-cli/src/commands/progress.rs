use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tilefuse_core::pipeline::{PipelineStage, ProgressReporter};

/// Drives one indicatif bar per pipeline stage.
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let pb = match total_items {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg:28} [{bar:40}] {pos}/{len}")
                        .expect("static template")
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                pb
            }
        };
        pb.set_message(stage.to_string());
        *self.bar.lock().expect("reporter lock") = Some(pb);
    }

    fn advance(&self, items_done: usize) {
        if let Some(pb) = self.bar.lock().expect("reporter lock").as_ref() {
            pb.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        if let Some(pb) = self.bar.lock().expect("reporter lock").take() {
            pb.finish_and_clear();
        }
    }
}

/// Standalone bar for single-phase commands.
pub fn phase_bar(message: &'static str, total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:28} [{bar:40}] {pos}/{len}")
            .expect("static template")
            .progress_chars("=> "),
    );
    pb.set_message(message);
    pb
}
