use std::fmt;

use window_core::time::{DayOffset, days_to_seconds};
use window_impulsive::solve_cost;

use super::request::GridRequest;

/// Generation counter identifying one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunToken(pub u64);

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Costs for every time of flight at one departure delay.
///
/// `delta_vs[i]` is evaluated at `min_tof + i`; zero or non-finite means no transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResult {
    pub run: RunToken,
    pub delay: DayOffset,
    pub delta_vs: Vec<f64>,
}

impl ColumnResult {
    /// Column with no transfer anywhere.
    pub fn infeasible(run: RunToken, delay: DayOffset, rows: usize) -> Self {
        Self {
            run,
            delay,
            delta_vs: vec![f64::INFINITY; rows],
        }
    }
}

/// Column worker: Δv for each time of flight departing at `delay`.
pub fn compute_column(request: &GridRequest, delay: DayOffset) -> Vec<f64> {
    let Some(origin) = request.origin.get(delay) else {
        return vec![f64::INFINITY; request.height()];
    };

    (request.min_tof..=request.max_tof)
        .map(|tof| {
            let Some(destination) = delay
                .checked_add(tof)
                .and_then(|arrival| request.destination.get(arrival))
            else {
                return f64::INFINITY;
            };
            solve_cost(
                request.gm_km3_s2,
                &origin.position_km,
                &destination.position_km,
                days_to_seconds(f64::from(tof)),
                &origin.velocity_km_s,
                &destination.velocity_km_s,
            )
        })
        .collect()
}
