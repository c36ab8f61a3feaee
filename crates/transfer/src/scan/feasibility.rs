/// Whether `delta_v` is a transfer the vessel can fly.
pub fn is_feasible(delta_v: f64, max_delta_v: f64) -> bool {
    delta_v.is_finite() && delta_v > 0.0 && delta_v < max_delta_v
}

/// Run-wide OR of per-column feasibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeasibilityTracker {
    feasible: bool,
}

impl FeasibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.feasible = false;
    }

    /// Fold one column in; returns that column's own feasibility.
    pub fn record_column(&mut self, delta_vs: &[f64], max_delta_v: f64) -> bool {
        let column = delta_vs.iter().any(|&dv| is_feasible(dv, max_delta_v));
        self.feasible |= column;
        column
    }

    pub fn is_feasible(&self) -> bool {
        self.feasible
    }
}
