//! Terminal rendering of job events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use purify::{JobEvent, JobObserver, Phase, Stage};

/// Draws the controller's progress as a single bar on stderr.
pub struct TerminalObserver {
    bar: ProgressBar,
}

impl TerminalObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos:>3}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Observer that renders nothing, for `--no-progress` and non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl JobObserver for TerminalObserver {
    fn report(&self, event: &JobEvent) {
        let snapshot = event.snapshot();
        match event {
            JobEvent::Completed(_) => {
                self.bar.set_position(100);
                self.bar
                    .finish_with_message("Watermark removal completed successfully");
            }
            JobEvent::Failed(s) => {
                let message = s
                    .failure
                    .as_ref()
                    .map(|f| format!("{}: {}", f.kind, f.message))
                    .unwrap_or_default();
                self.bar.abandon_with_message(message);
            }
            JobEvent::Phase(_) | JobEvent::Progress(_) => {
                if snapshot.phase == Phase::Idle {
                    self.bar.abandon_with_message("Cancelled");
                    return;
                }
                if let Some(progress) = snapshot.progress {
                    self.bar.set_position(u64::from(progress.value()));
                }
                let stage = snapshot.stage.unwrap_or(Stage::Uploading);
                self.bar.set_message(format!(
                    "Step {}/{}: {}",
                    stage.index() + 1,
                    Stage::ALL.len(),
                    stage.description()
                ));
            }
        }
    }
}
