use std::sync::Arc;

use thiserror::Error;
use window_core::time::DayOffset;
use window_orbits::OrbitalPath;

/// Immutable parameter set for one porkchop scan.
///
/// Two requests are the same scan when they compare equal; paths compare by value.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRequest {
    pub origin: Arc<OrbitalPath>,
    pub destination: Arc<OrbitalPath>,
    /// Central body gravitational parameter (km³/s²).
    pub gm_km3_s2: f64,
    pub min_delay: DayOffset,
    pub max_delay: DayOffset,
    pub min_tof: DayOffset,
    pub max_tof: DayOffset,
    /// Vessel Δv budget (km/s).
    pub max_delta_v: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("delay range is inverted ({min}..={max} days)")]
    InvertedDelayRange { min: DayOffset, max: DayOffset },
    #[error("time-of-flight range is inverted ({min}..={max} days)")]
    InvertedTofRange { min: DayOffset, max: DayOffset },
    #[error("{body} ephemeris ends before day {required} ({available} samples)")]
    EphemerisCoverage {
        body: &'static str,
        required: u64,
        available: usize,
    },
    #[error("gravitational parameter must be positive (got {0})")]
    InvalidGravitationalParameter(f64),
    #[error("Δv budget must be a non-negative number (got {0})")]
    InvalidBudget(f64),
}

impl GridRequest {
    /// Number of columns (delay values).
    pub fn width(&self) -> usize {
        (self.max_delay.saturating_sub(self.min_delay)) as usize + 1
    }

    /// Number of rows (time-of-flight values).
    pub fn height(&self) -> usize {
        (self.max_tof.saturating_sub(self.min_tof)) as usize + 1
    }

    /// Delay of grid column `col`.
    pub fn delay_at(&self, col: usize) -> DayOffset {
        self.min_delay + col as DayOffset
    }

    /// Time of flight of grid row `row`.
    pub fn tof_at(&self, row: usize) -> DayOffset {
        self.min_tof + row as DayOffset
    }

    /// Column index for `delay`, if inside the range.
    pub fn column_of(&self, delay: DayOffset) -> Option<usize> {
        (self.min_delay..=self.max_delay)
            .contains(&delay)
            .then(|| (delay - self.min_delay) as usize)
    }

    /// Last day offset the destination ephemeris must cover.
    pub fn last_arrival_day(&self) -> u64 {
        u64::from(self.max_delay) + u64::from(self.max_tof)
    }

    /// Reject ranges the scan cannot run.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.max_delay < self.min_delay {
            return Err(ScanError::InvertedDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.max_tof < self.min_tof {
            return Err(ScanError::InvertedTofRange {
                min: self.min_tof,
                max: self.max_tof,
            });
        }
        if !(self.gm_km3_s2.is_finite() && self.gm_km3_s2 > 0.0) {
            return Err(ScanError::InvalidGravitationalParameter(self.gm_km3_s2));
        }
        if self.max_delta_v.is_nan() || self.max_delta_v < 0.0 {
            return Err(ScanError::InvalidBudget(self.max_delta_v));
        }
        check_coverage("origin", &self.origin, u64::from(self.max_delay))?;
        check_coverage("destination", &self.destination, self.last_arrival_day())?;
        Ok(())
    }
}

fn check_coverage(body: &'static str, path: &OrbitalPath, required: u64) -> Result<(), ScanError> {
    if required < path.len() as u64 {
        Ok(())
    } else {
        Err(ScanError::EphemerisCoverage {
            body,
            required,
            available: path.len(),
        })
    }
}
