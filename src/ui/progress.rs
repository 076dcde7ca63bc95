use crate::findings::FileStatus;
use crate::orchestrator::{BatchEvent, BatchProgress, format_eta};
use crate::ui::icons::{CHECK, CLOCK, CROSS, FILE, SPARKLE};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Terminal progress for one analysis batch, rendered via `indicatif`.
///
/// Two bars are stacked vertically:
/// - Batch bar: completed files out of the total, with the ETA
/// - File bar: spinner naming the file currently being analyzed
///
/// The UI only reads [`BatchEvent`]s; it never touches the reports.
pub struct BatchUI {
    multi: MultiProgress,
    batch_bar: ProgressBar,
    file_bar: ProgressBar,
    verbose: bool,
}

impl BatchUI {
    /// Create the UI with both bars. `total_files` sizes the batch bar.
    pub fn new(total_files: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let batch_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let batch_bar = multi.add(ProgressBar::new(total_files));
        batch_bar.set_style(batch_style);
        batch_bar.set_prefix("Files");

        let file_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let file_bar = multi.add(ProgressBar::new_spinner());
        file_bar.set_style(file_style);
        file_bar.set_prefix("  Now");

        Self {
            multi,
            batch_bar,
            file_bar,
            verbose,
        }
    }

    /// Print a line above the bars, falling back to `eprintln!` if the
    /// terminal is unavailable.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Apply one orchestrator event to the display.
    pub fn handle(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Notice(msg) => {
                self.print_line(format!("{}{}", SPARKLE, style(msg).dim()));
            }
            BatchEvent::Started(progress) => {
                self.batch_bar.set_length(progress.total_files as u64);
                self.batch_bar.set_position(0);
                self.batch_bar.set_message(eta_message(progress));
            }
            BatchEvent::FileStarted { path, .. } => {
                self.file_bar
                    .set_message(format!("{}{}", FILE, style(path).yellow()));
                self.file_bar.enable_steady_tick(Duration::from_millis(100));
            }
            BatchEvent::FileFinished {
                report, progress, ..
            } => {
                self.batch_bar.set_position(progress.completed_files as u64);
                self.batch_bar.set_message(eta_message(progress));

                match report.status() {
                    FileStatus::Failed => self.print_line(format!(
                        "  {}{} {}",
                        CROSS,
                        report.file_path(),
                        style(report.error_message().unwrap_or("failed")).red()
                    )),
                    _ if self.verbose || !report.findings().is_empty() => {
                        self.print_line(format!(
                            "  {}{} {}",
                            CHECK,
                            report.file_path(),
                            style(findings_label(report.findings().len())).dim()
                        ))
                    }
                    _ => {}
                }
            }
            BatchEvent::Completed(summary) => {
                self.file_bar.finish_and_clear();
                self.batch_bar.finish_with_message(format!(
                    "{} analyzed, {} failed, {} in {}",
                    style(summary.analyzed).green(),
                    style(summary.failed).red(),
                    findings_label(summary.total_findings),
                    format_eta(summary.elapsed.as_secs())
                ));
            }
        }
    }

    /// Render events from `rx` until the batch completes or the sender is
    /// dropped.
    pub async fn follow(self, mut rx: UnboundedReceiver<BatchEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(&event);
            if matches!(event, BatchEvent::Completed(_)) {
                break;
            }
        }
        self.finish();
    }

    /// Stop all bars, leaving the batch bar's final message visible.
    pub fn finish(&self) {
        self.file_bar.finish_and_clear();
        if !self.batch_bar.is_finished() {
            self.batch_bar.abandon();
        }
    }
}

/// Status text shown next to the batch bar.
pub fn eta_message(progress: &BatchProgress) -> String {
    match progress.estimated_seconds_remaining {
        Some(secs) => format!("{}~{} remaining", CLOCK, format_eta(secs)),
        None if progress.is_complete() => "done".to_string(),
        None => "estimating...".to_string(),
    }
}

fn findings_label(count: usize) -> String {
    match count {
        1 => "1 finding".to_string(),
        n => format!("{} findings", n),
    }
}
