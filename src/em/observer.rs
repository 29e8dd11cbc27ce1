//! Per-iteration progress side channel.

/// What the engine reports after each completed iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Total log-likelihood computed in this iteration's E-step.
    pub log_likelihood: f64,
    /// Change from the previous iteration (`None` on the first).
    pub delta: Option<f64>,
}

/// Receives one [`IterationReport`] per iteration.
///
/// Observers only see numbers; they cannot influence the fit.
pub trait ProgressObserver {
    /// Called after the iteration's M-step and convergence bookkeeping.
    fn on_iteration(&mut self, report: &IterationReport);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&IterationReport),
{
    fn on_iteration(&mut self, report: &IterationReport) {
        self(report)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_iteration(&mut self, _report: &IterationReport) {}
}
