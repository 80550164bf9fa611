/// Reports the progress of long-running operations.
pub trait Progress: Send + Sync {
    /// Set the label of the current phase (e.g., "Generating", "Ingesting").
    fn set_phase(&self, phase: &str);

    /// Set the number of work units in the current phase.
    fn set_total(&self, total: u64);

    /// Record `delta` more completed work units.
    fn advance(&self, delta: u64);

    /// Finish and clear the indicator.
    fn done(&self);
}

/// A [`Progress`] that reports nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_phase(&self, _phase: &str) {}

    fn set_total(&self, _total: u64) {}

    fn advance(&self, _delta: u64) {}

    fn done(&self) {}
}
