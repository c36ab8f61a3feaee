//! Scenario manifests for the launch window planner.
//!
//! A scenario names the central body, the two ephemeris sources, the porkchop grid
//! ranges, the vessel, and scheduler tuning. Manifests are YAML or TOML, chosen by
//! file extension; a directory loads every `*.toml` in name order.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_GM_KM3_S2: f64 = 1.327_124_400_18e11;
const DEFAULT_COLUMN_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_HOVER_RATE_HZ: f64 = 30.0;

/// Top-level scenario manifest.
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    /// Central body gravitational parameter (km³/s²); heliocentric by default.
    #[serde(default = "default_gm")]
    pub gm_km3_s2: f64,
    /// Calendar date of day offset zero, `YYYY-MM-DDTHH:MM:SS` (UTC).
    pub base_epoch: String,
    pub origin: BodyConfig,
    pub destination: BodyConfig,
    pub grid: GridConfig,
    pub vessel: VesselConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Named body and where its day-sampled ephemeris comes from.
#[derive(Debug, Deserialize, Clone)]
pub struct BodyConfig {
    pub name: String,
    pub ephemeris: EphemerisSource,
}

/// Ephemeris source for one body.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum EphemerisSource {
    #[serde(rename = "circular")]
    Circular {
        radius_km: f64,
        #[serde(default)]
        phase_deg: f64,
        #[serde(default)]
        inclination_deg: f64,
    },
    #[serde(rename = "samples")]
    Samples { path: PathBuf },
}

/// Porkchop grid ranges in whole days.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    pub min_delay_days: u32,
    pub max_delay_days: u32,
    pub min_tof_days: u32,
    pub max_tof_days: u32,
}

/// Vessel budget; either an explicit Δv or full stage mass data.
#[derive(Debug, Deserialize, Clone)]
pub struct VesselConfig {
    pub name: String,
    #[serde(default)]
    pub max_delta_v_km_s: Option<f64>,
    #[serde(default)]
    pub dry_mass_kg: Option<f64>,
    #[serde(default)]
    pub propellant_mass_kg: Option<f64>,
    #[serde(default)]
    pub isp_seconds: Option<f64>,
}

/// Background scan tuning.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Worker threads for the column pool; `None` lets the pool size itself.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Deadline per column before it is forced infeasible; `null` waits forever.
    #[serde(default = "default_column_timeout")]
    pub column_timeout_ms: Option<u64>,
    #[serde(default = "default_hover_rate")]
    pub hover_rate_hz: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            column_timeout_ms: default_column_timeout(),
            hover_rate_hz: DEFAULT_HOVER_RATE_HZ,
        }
    }
}

fn default_gm() -> f64 {
    DEFAULT_GM_KM3_S2
}

fn default_column_timeout() -> Option<u64> {
    Some(DEFAULT_COLUMN_TIMEOUT_MS)
}

fn default_hover_rate() -> f64 {
    DEFAULT_HOVER_RATE_HZ
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid scenario '{scenario}': {reason}")]
    Invalid { scenario: String, reason: String },
}

impl ScenarioConfig {
    /// Check ranges and budgets that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            scenario: self.name.clone(),
            reason,
        };

        if !(self.gm_km3_s2.is_finite() && self.gm_km3_s2 > 0.0) {
            return Err(invalid(format!(
                "gm_km3_s2 must be positive (got {})",
                self.gm_km3_s2
            )));
        }
        if self.grid.max_delay_days < self.grid.min_delay_days {
            return Err(invalid("max_delay_days is below min_delay_days".into()));
        }
        if self.grid.max_tof_days < self.grid.min_tof_days {
            return Err(invalid("max_tof_days is below min_tof_days".into()));
        }
        if self.grid.min_tof_days == 0 {
            return Err(invalid("min_tof_days must be at least one day".into()));
        }
        for body in [&self.origin, &self.destination] {
            if let EphemerisSource::Circular { radius_km, .. } = body.ephemeris {
                if !(radius_km.is_finite() && radius_km > 0.0) {
                    return Err(invalid(format!(
                        "body '{}' has a non-positive orbit radius",
                        body.name
                    )));
                }
            }
        }

        let vessel = &self.vessel;
        let has_stage = vessel.dry_mass_kg.is_some()
            && vessel.propellant_mass_kg.is_some()
            && vessel.isp_seconds.is_some();
        match vessel.max_delta_v_km_s {
            Some(budget) if !(budget.is_finite() && budget > 0.0) => {
                return Err(invalid(format!(
                    "vessel '{}' max_delta_v_km_s must be positive",
                    vessel.name
                )));
            }
            None if !has_stage => {
                return Err(invalid(format!(
                    "vessel '{}' needs max_delta_v_km_s or dry/propellant mass and isp",
                    vessel.name
                )));
            }
            _ => {}
        }
        if self.scheduler.hover_rate_hz <= 0.0 {
            return Err(invalid("hover_rate_hz must be positive".into()));
        }
        Ok(())
    }

    /// Resolve relative sample paths against the directory holding the manifest.
    fn resolve_paths(&mut self, base: &Path) {
        for body in [&mut self.origin, &mut self.destination] {
            if let EphemerisSource::Samples { path } = &mut body.ephemeris {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

/// Load and validate a single scenario manifest.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioConfig, ConfigError> {
    let path = path.as_ref();
    let mut scenario: ScenarioConfig = read_record(path)?;
    if let Some(parent) = path.parent() {
        scenario.resolve_paths(parent);
    }
    scenario.validate()?;
    Ok(scenario)
}

/// Load every `*.toml` scenario in a directory, sorted by file name.
pub fn load_scenarios<P: AsRef<Path>>(dir: P) -> Result<Vec<ScenarioConfig>, ConfigError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    entries.sort();
    entries.iter().map(load_scenario).collect()
}

fn read_record<T>(path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}
