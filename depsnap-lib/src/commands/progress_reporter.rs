use crate::ingest::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

const TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {msg}";
const TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {msg}";

struct DelayedProgressState {
    visible_after: Instant,
    visible: AtomicBool,
    phase_start_time: Mutex<Instant>,
    unit: Mutex<&'static str>,
}

impl Debug for DelayedProgressState {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DelayedProgressState")
            .field("visible_after", &self.visible_after)
            .field("visible", &self.visible)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// A progress bar that stays hidden until work has been running for a while.
///
/// Short runs never draw anything, so piping `generate` output stays clean.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<DelayedProgressState>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Create a reporter that becomes visible once `delay` has elapsed.
    ///
    /// When `use_colors` is false, the bar is rendered without ANSI styling.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_draw_target(ProgressDrawTarget::hidden());

        Self {
            bar,
            state: Arc::new(DelayedProgressState {
                visible_after: Instant::now() + delay,
                visible: AtomicBool::new(false),
                phase_start_time: Mutex::new(Instant::now()),
                unit: Mutex::new(unit_for("")),
            }),
            use_colors,
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.visible.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    fn reveal_if_due(&self) {
        if !self.state.visible.load(Ordering::Relaxed) && Instant::now() >= self.state.visible_after {
            self.state.visible.store(true, Ordering::Relaxed);
            self.bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }
    }

    fn refresh_message(&self) {
        let elapsed = self.state.phase_start_time.lock().unwrap_or_else(PoisonError::into_inner).elapsed();
        let unit = *self.state.unit.lock().unwrap_or_else(PoisonError::into_inner);
        let total = self.bar.length().unwrap_or_default();
        self.bar
            .set_message(format!("{}/{total} {unit}, {}s", self.bar.position(), elapsed.as_secs()));
    }
}

/// What one step of the bar counts during `phase`
fn unit_for(phase: &str) -> &'static str {
    match phase {
        "Generating" => "snapshots",
        _ => "manifests",
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.reset();
        self.bar.set_prefix(phase.to_string());

        let template = if self.use_colors { TEMPLATE } else { TEMPLATE_NO_COLOR };
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .expect("could not create progress bar style")
                .progress_chars("=> "),
        );

        *self.state.unit.lock().unwrap_or_else(PoisonError::into_inner) = unit_for(phase);
        *self.state.phase_start_time.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.refresh_message();
    }

    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
        self.reveal_if_due();
        self.refresh_message();
    }

    fn done(&self) {
        if self.is_visible() {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("use_colors", &self.use_colors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_hidden_before_the_delay() {
        let reporter = ProgressReporter::new(Duration::from_secs(3600), false);
        reporter.set_phase("Ingesting");
        reporter.set_total(4);
        reporter.advance(1);
        reporter.advance(2);

        assert!(!reporter.is_visible());
        assert_eq!(reporter.position(), 3);
        reporter.done();
    }

    #[test]
    fn new_phase_restarts_the_count() {
        let reporter = ProgressReporter::new(Duration::from_secs(3600), true);
        reporter.set_phase("Ingesting");
        reporter.set_total(2);
        reporter.advance(2);
        reporter.done();

        reporter.set_phase("Ingesting");
        reporter.set_total(5);
        assert_eq!(reporter.position(), 0);
    }

    #[test]
    fn message_counts_what_the_phase_produces() {
        let reporter = ProgressReporter::new(Duration::from_secs(3600), false);
        reporter.set_phase("Generating");
        reporter.set_total(3);
        reporter.advance(1);
        assert!(reporter.bar.message().starts_with("1/3 snapshots, "));

        reporter.set_phase("Ingesting");
        reporter.set_total(20);
        reporter.advance(4);
        assert!(reporter.bar.message().starts_with("4/20 manifests, "));
        reporter.done();
    }
}
