//! Day-sampled orbital paths consumed by the porkchop scan.
//!
//! An [`OrbitalPath`] is the ephemeris handed over by an orbit propagator: one state
//! per integer day offset from the scenario base epoch. Two sources ship with the
//! workspace: an analytic [`CircularOrbit`] sampler and CSV sample files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use window_core::time::{DayOffset, days_to_seconds};
use window_core::vector::Vector3;

/// Heliocentric (or parent-centric) state of a body at one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSample {
    pub position_km: Vector3,
    pub velocity_km_s: Vector3,
}

/// Errors raised while building or loading an orbital path.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("failed to read samples: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse samples: {0}")]
    Csv(#[from] csv::Error),
    #[error("sample rows must start at day 0 and be contiguous (expected day {expected}, found {found})")]
    NonContiguous { expected: DayOffset, found: DayOffset },
    #[error("orbit radius must be positive (got {0} km)")]
    InvalidRadius(f64),
    #[error("gravitational parameter must be positive (got {0})")]
    InvalidGravitationalParameter(f64),
}

/// Ordered per-day samples indexed by day offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbitalPath {
    samples: Vec<StateSample>,
}

impl OrbitalPath {
    pub fn new(samples: Vec<StateSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// State at `day`, if sampled.
    pub fn get(&self, day: DayOffset) -> Option<&StateSample> {
        self.samples.get(day as usize)
    }

    /// Whether every day offset in `0..=last_day` is sampled.
    pub fn covers(&self, last_day: DayOffset) -> bool {
        (last_day as usize) < self.samples.len()
    }

    /// Load samples from a CSV file with a `day,x_km,y_km,z_km,vx_km_s,vy_km_s,vz_km_s` header.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, PathError> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, PathError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut samples = Vec::new();
        for record in rdr.deserialize() {
            let row: SampleRow = record?;
            let expected = samples.len() as DayOffset;
            if row.day != expected {
                return Err(PathError::NonContiguous {
                    expected,
                    found: row.day,
                });
            }
            samples.push(StateSample {
                position_km: [row.x_km, row.y_km, row.z_km],
                velocity_km_s: [row.vx_km_s, row.vy_km_s, row.vz_km_s],
            });
        }
        Ok(Self { samples })
    }
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    day: DayOffset,
    x_km: f64,
    y_km: f64,
    z_km: f64,
    vx_km_s: f64,
    vy_km_s: f64,
    vz_km_s: f64,
}

/// Circular Keplerian orbit about the central body, inclined about the x axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularOrbit {
    pub radius_km: f64,
    /// Argument of latitude at the base epoch.
    pub phase_deg: f64,
    pub inclination_deg: f64,
}

impl CircularOrbit {
    pub fn coplanar(radius_km: f64, phase_deg: f64) -> Self {
        Self {
            radius_km,
            phase_deg,
            inclination_deg: 0.0,
        }
    }

    /// State `days` after the base epoch.
    pub fn state_at(&self, gm_km3_s2: f64, days: f64) -> StateSample {
        let r = self.radius_km;
        let speed = (gm_km3_s2 / r).sqrt();
        let mean_motion = speed / r;
        let theta = self.phase_deg.to_radians() + mean_motion * days_to_seconds(days);
        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_i, cos_i) = self.inclination_deg.to_radians().sin_cos();

        StateSample {
            position_km: [r * cos_t, r * sin_t * cos_i, r * sin_t * sin_i],
            velocity_km_s: [
                -speed * sin_t,
                speed * cos_t * cos_i,
                speed * cos_t * sin_i,
            ],
        }
    }

    /// Sample day offsets `0..=last_day`.
    pub fn sample(&self, gm_km3_s2: f64, last_day: DayOffset) -> Result<OrbitalPath, PathError> {
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(PathError::InvalidRadius(self.radius_km));
        }
        if !(gm_km3_s2.is_finite() && gm_km3_s2 > 0.0) {
            return Err(PathError::InvalidGravitationalParameter(gm_km3_s2));
        }
        let samples = (0..=last_day)
            .map(|day| self.state_at(gm_km3_s2, f64::from(day)))
            .collect();
        Ok(OrbitalPath::new(samples))
    }
}
