//! Terminal progress for apply runs, rendered with `indicatif`.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::apply::ApplyEvent;

pub struct ApplyProgress {
    bar: ProgressBar,
}

impl ApplyProgress {
    /// A bar sized to `total` actions. Hidden when `visible` is false.
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = ProgressBar::new(total as u64);
        if visible {
            let bar_style = ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░");
            bar.set_style(bar_style);
            bar.set_prefix("Apply");
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    pub fn observe(&self, event: &ApplyEvent) {
        match event {
            ApplyEvent::Started { destination, .. } => {
                self.bar.set_message(destination.display().to_string());
            }
            ApplyEvent::FileCompleted { path, warnings, .. } => {
                self.bar.inc(1);
                self.bar.set_message(path.clone());
                for warning in warnings {
                    self.println(format!("{} {}: {}", style("warning").yellow(), path, warning));
                }
            }
            ApplyEvent::FileFailed { path, error, .. } => {
                self.bar.inc(1);
                self.println(format!("{} {}: {}", style("failed").red(), path, error));
            }
            ApplyEvent::Cancelled { completed, skipped } => {
                self.println(format!(
                    "{} after {} files; {} skipped",
                    style("Cancelled").yellow().bold(),
                    completed,
                    skipped
                ));
            }
            ApplyEvent::Aborted { kind, message } => {
                self.println(format!("{} ({}): {}", style("Aborted").red().bold(), kind, message));
            }
            ApplyEvent::Finished { .. } => {}
        }
    }

    /// Print above the bar, or to stderr when the bar is hidden.
    pub fn println(&self, line: String) {
        if self.bar.is_hidden() {
            eprintln!("{line}");
        } else {
            self.bar.println(line);
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
