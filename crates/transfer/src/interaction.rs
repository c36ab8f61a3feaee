//! Pointer queries over the porkchop grid.
//!
//! Normalised pointer coordinates run `0..=1` left to right and top to bottom; the
//! delay axis is horizontal and time of flight grows upward. Hover updates are
//! throttled and only report grid cells; a commit solves the exact transfer for the
//! cell and publishes it as the current selection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use window_core::time::{DayOffset, days_to_seconds};
use window_core::vector::Vector3;
use window_impulsive::solve_exact;
use window_propulsion::Vessel;

use crate::scan::GridRequest;

/// Default hover refresh rate.
pub const HOVER_RATE_HZ: f64 = 30.0;

/// One cell of the grid, in absolute day offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GridCoord {
    pub delay: DayOffset,
    pub tof: DayOffset,
}

/// Grid axis ranges in day offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridAxes {
    pub min_delay: DayOffset,
    pub max_delay: DayOffset,
    pub min_tof: DayOffset,
    pub max_tof: DayOffset,
}

impl From<&GridRequest> for GridAxes {
    fn from(request: &GridRequest) -> Self {
        Self {
            min_delay: request.min_delay,
            max_delay: request.max_delay,
            min_tof: request.min_tof,
            max_tof: request.max_tof,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn lerp_day(min: DayOffset, max: DayOffset, t: f64) -> DayOffset {
    let span = f64::from(max.saturating_sub(min));
    let offset = (span * t).round() as DayOffset;
    min + offset.min(max.saturating_sub(min))
}

fn unlerp_day(min: DayOffset, max: DayOffset, value: DayOffset) -> f64 {
    let span = max.saturating_sub(min);
    if span == 0 {
        return 0.0;
    }
    let clamped = value.clamp(min, max);
    f64::from(clamped - min) / f64::from(span)
}

impl GridAxes {
    /// Grid cell under the normalised pointer `(x, y)`; out-of-range input is clamped.
    pub fn to_grid_coord(&self, x: f64, y: f64) -> GridCoord {
        GridCoord {
            delay: lerp_day(self.min_delay, self.max_delay, clamp_unit(x)),
            tof: lerp_day(self.min_tof, self.max_tof, 1.0 - clamp_unit(y)),
        }
    }

    /// Normalised pointer position of a grid cell.
    pub fn to_norm_coord(&self, coord: GridCoord) -> (f64, f64) {
        (
            unlerp_day(self.min_delay, self.max_delay, coord.delay),
            1.0 - unlerp_day(self.min_tof, self.max_tof, coord.tof),
        )
    }
}

/// Admits at most one event per interval.
#[derive(Debug, Clone)]
pub struct HoverThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl HoverThrottle {
    pub fn new(rate_hz: f64) -> Self {
        let interval = if rate_hz.is_finite() && rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / rate_hz)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for HoverThrottle {
    fn default() -> Self {
        Self::new(HOVER_RATE_HZ)
    }
}

/// Maps pointer events onto the grid of one request.
#[derive(Debug, Clone)]
pub struct InteractionMapper {
    axes: GridAxes,
    throttle: HoverThrottle,
    hovered: Option<GridCoord>,
}

impl InteractionMapper {
    pub fn new(axes: GridAxes, hover_rate_hz: f64) -> Self {
        Self {
            axes,
            throttle: HoverThrottle::new(hover_rate_hz),
            hovered: None,
        }
    }

    pub fn axes(&self) -> GridAxes {
        self.axes
    }

    /// Switch to a new grid; the hover reticule is dropped.
    pub fn set_axes(&mut self, axes: GridAxes) {
        if axes != self.axes {
            self.axes = axes;
            self.hovered = None;
        }
    }

    /// Throttled hover update; `Some` when the reticule should move.
    pub fn hover(&mut self, x: f64, y: f64, now: Instant) -> Option<GridCoord> {
        if !self.throttle.admit(now) {
            return None;
        }
        let coord = self.axes.to_grid_coord(x, y);
        self.hovered = Some(coord);
        Some(coord)
    }

    /// Last admitted hover cell.
    pub fn hovered(&self) -> Option<GridCoord> {
        self.hovered
    }

    /// Resolve the pointer against `request`'s grid, solve the cell, and publish it.
    ///
    /// Returns `None` when the request changed while the cell was being solved; the
    /// stale result is dropped instead of replacing the cleared selection.
    pub fn commit(
        &mut self,
        x: f64,
        y: f64,
        request: &GridRequest,
        vessel: &Vessel,
        selection: &SelectionCell,
    ) -> Option<Arc<TravelSolution>> {
        let generation = selection.generation();
        self.set_axes(GridAxes::from(request));
        let solution = solve_cell(request, vessel, self.axes.to_grid_coord(x, y));
        selection.publish(generation, solution)
    }
}

/// Exact transfer for one committed cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelSolution {
    /// Departure day offset from the base epoch.
    pub departure_day: DayOffset,
    pub arrival_day: DayOffset,
    pub tof_days: DayOffset,
    /// Total Δv (km/s); infinite when no transfer was found.
    pub delta_v: f64,
    pub used_propellant_percent: f64,
    pub origin_position: Vector3,
    pub origin_velocity: Vector3,
    pub destination_position: Vector3,
    pub destination_velocity: Vector3,
    /// Transfer-orbit velocity right after departure.
    pub departure_velocity: Vector3,
    /// Transfer-orbit velocity on arrival.
    pub arrival_velocity: Vector3,
    pub revolutions: u32,
    pub solutions: usize,
    pub invalid: bool,
}

/// Solve the exact transfer for `coord`. Failures yield an invalid solution, never an error.
pub fn solve_cell(request: &GridRequest, vessel: &Vessel, coord: GridCoord) -> TravelSolution {
    let arrival_day = coord.delay.saturating_add(coord.tof);
    let origin = request.origin.get(coord.delay).copied();
    let destination = request.destination.get(arrival_day).copied();

    let mut solution = TravelSolution {
        departure_day: coord.delay,
        arrival_day,
        tof_days: coord.tof,
        delta_v: f64::INFINITY,
        used_propellant_percent: f64::INFINITY,
        origin_position: origin.map(|s| s.position_km).unwrap_or_default(),
        origin_velocity: origin.map(|s| s.velocity_km_s).unwrap_or_default(),
        destination_position: destination.map(|s| s.position_km).unwrap_or_default(),
        destination_velocity: destination.map(|s| s.velocity_km_s).unwrap_or_default(),
        departure_velocity: [0.0; 3],
        arrival_velocity: [0.0; 3],
        revolutions: 0,
        solutions: 0,
        invalid: true,
    };

    let (Some(origin), Some(destination)) = (origin, destination) else {
        warn!(
            delay = coord.delay,
            tof = coord.tof,
            "committed cell lies outside the ephemeris"
        );
        return solution;
    };

    match solve_exact(
        request.gm_km3_s2,
        &origin.position_km,
        &destination.position_km,
        days_to_seconds(f64::from(coord.tof)),
        &origin.velocity_km_s,
        &destination.velocity_km_s,
    ) {
        Ok(transfer) => {
            solution.delta_v = transfer.delta_v;
            solution.used_propellant_percent = vessel.used_propellant_percent(transfer.delta_v);
            solution.departure_velocity = transfer.orbit.departure_velocity;
            solution.arrival_velocity = transfer.orbit.arrival_velocity;
            solution.revolutions = transfer.orbit.revolutions;
            solution.solutions = transfer.solutions;
            solution.invalid = transfer.delta_v > request.max_delta_v;
            info!(
                delay = coord.delay,
                tof = coord.tof,
                delta_v = transfer.delta_v,
                revolutions = transfer.orbit.revolutions,
                invalid = solution.invalid,
                "transfer committed"
            );
        }
        Err(err) => {
            warn!(delay = coord.delay, tof = coord.tof, error = %err, "exact solve failed");
        }
    }
    solution
}

#[derive(Debug, Default)]
struct Selection {
    generation: u64,
    current: Option<Arc<TravelSolution>>,
}

/// Current selection; replaced wholesale on every commit.
///
/// Every [`SelectionCell::clear`] starts a new generation. A solution is only
/// published under the generation that was current when its solve began.
#[derive(Debug, Default)]
pub struct SelectionCell {
    state: Mutex<Selection>,
}

impl SelectionCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation to capture before solving a cell.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Publish `solution` unless the selection was cleared after `generation`.
    pub fn publish(
        &self,
        generation: u64,
        solution: TravelSolution,
    ) -> Option<Arc<TravelSolution>> {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                departure_day = solution.departure_day,
                "stale selection dropped"
            );
            return None;
        }
        let solution = Arc::new(solution);
        state.current = Some(Arc::clone(&solution));
        Some(solution)
    }

    pub fn current(&self) -> Option<Arc<TravelSolution>> {
        self.state.lock().current.clone()
    }

    /// Drop the selection and invalidate solves still in flight.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.current = None;
    }
}
