//! Live terminal display for load test progress.
//!
//! Renders a single in-place updating spinner line showing completed
//! requests, in-flight count, requests per second, errors, and elapsed time.
//! Fed by the orchestrator's [`RunProgress`] watch channel.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::loadtest::engine::RunProgress;

/// Spinner line rendered on stderr while a run is in progress.
pub struct LiveDisplay {
    status_bar: ProgressBar,
}

impl LiveDisplay {
    /// Create a new live display.
    ///
    /// If `no_color` is true or stderr is not a terminal (piped),
    /// color output is disabled.
    pub fn new(no_color: bool) -> Self {
        if no_color || !std::io::stderr().is_terminal() {
            colored::control::set_override(false);
        }

        let status_bar = ProgressBar::new_spinner();
        status_bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        status_bar.enable_steady_tick(Duration::from_millis(100));

        Self { status_bar }
    }

    /// Format a single line of live status.
    ///
    /// Errors are shown in red once any request has failed.
    pub fn format_status(progress: &RunProgress, elapsed: Duration, concurrency: usize) -> String {
        let elapsed_secs = elapsed.as_secs_f64();
        let rps = if elapsed_secs > 0.0 {
            progress.completed as f64 / elapsed_secs
        } else {
            0.0
        };

        let done_str = format!("{}/{}", progress.completed, progress.total);
        let in_flight_str = format!("{}/{}", progress.in_flight, concurrency);
        let rps_str = format!("{rps:.1}");
        let errors_str = progress.failed.to_string();
        let errors_display = if progress.failed > 0 {
            errors_str.red().to_string()
        } else {
            errors_str
        };

        format!(
            "  done: {}  |  in-flight: {}  |  rps: {}  |  errors: {}  |  elapsed: {}s",
            done_str.green(),
            in_flight_str.green(),
            rps_str.green(),
            errors_display,
            elapsed.as_secs()
        )
    }

    pub fn update(&self, progress: &RunProgress, elapsed: Duration, concurrency: usize) {
        self.status_bar
            .set_message(Self::format_status(progress, elapsed, concurrency));
    }

    /// Stop the display and clear the spinner.
    pub fn finish(&self) {
        self.status_bar.finish_and_clear();
    }
}

/// Run the live display loop until `cancel` fires or the sender is dropped.
pub async fn display_loop(
    mut progress_rx: watch::Receiver<RunProgress>,
    concurrency: usize,
    cancel: CancellationToken,
    no_color: bool,
    test_start: Instant,
) {
    let display = LiveDisplay::new(no_color);

    eprintln!();
    eprintln!("  Running load test...");
    eprintln!();

    loop {
        tokio::select! {
            changed = progress_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let progress = *progress_rx.borrow_and_update();
                display.update(&progress, test_start.elapsed(), concurrency);
            }
            _ = cancel.cancelled() => {
                let progress = *progress_rx.borrow();
                display.update(&progress, test_start.elapsed(), concurrency);
                break;
            }
        }
    }

    display.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status_zero_state() {
        let status = LiveDisplay::format_status(
            &RunProgress {
                total: 100,
                ..RunProgress::default()
            },
            Duration::ZERO,
            10,
        );
        assert!(status.contains("0/100"), "got: {status}");
        assert!(status.contains("0/10"), "got: {status}");
        assert!(status.contains("rps:"), "got: {status}");
        assert!(status.contains("0.0"), "got: {status}");
    }

    #[test]
    fn test_format_status_mid_run() {
        let progress = RunProgress {
            total: 100,
            completed: 40,
            failed: 3,
            in_flight: 8,
        };
        let status = LiveDisplay::format_status(&progress, Duration::from_secs(4), 8);
        assert!(status.contains("40/100"), "got: {status}");
        assert!(status.contains("8/8"), "got: {status}");
        assert!(status.contains("10.0"), "got: {status}");
        assert!(status.contains("errors:"), "got: {status}");
        assert!(status.contains("elapsed: 4s"), "got: {status}");
    }

    #[test]
    fn test_live_display_new_does_not_panic() {
        let display = LiveDisplay::new(true);
        display.finish();
    }

    #[tokio::test]
    async fn test_display_loop_stops_on_cancel() {
        let (_tx, rx) = watch::channel(RunProgress::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        display_loop(rx, 4, cancel, true, Instant::now()).await;
    }
}
