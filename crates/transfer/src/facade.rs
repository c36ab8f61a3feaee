//! Re-exported APIs for consumers of the transfer crate.

pub use crate::interaction::{
    GridAxes, GridCoord, HoverThrottle, InteractionMapper, SelectionCell, TravelSolution,
    solve_cell,
};
pub use crate::scan::{
    BestCell, ColumnResult, Delivery, GridRequest, GridScan, RunToken, ScanError, ScanProgress,
    ScanState,
};
pub use window_propulsion::Vessel;

pub mod vessel {
    use window_config::VesselConfig;
    use window_propulsion::{StageMass, Vessel};

    /// Convert a `VesselConfig` into the runtime `Vessel` representation.
    pub fn from_config(config: &VesselConfig) -> Vessel {
        let stage = match (
            config.dry_mass_kg,
            config.propellant_mass_kg,
            config.isp_seconds,
        ) {
            (Some(dry_mass_kg), Some(propellant_mass_kg), Some(isp_seconds)) => Some(StageMass {
                dry_mass_kg,
                propellant_mass_kg,
                isp_seconds,
            }),
            _ => None,
        };
        Vessel {
            name: config.name.clone(),
            max_delta_v_km_s: config.max_delta_v_km_s,
            stage,
        }
    }
}

pub mod ephemeris {
    use std::sync::Arc;

    use thiserror::Error;
    use window_config::{BodyConfig, EphemerisSource, ScenarioConfig};
    use window_core::time::DayOffset;
    use window_orbits::{CircularOrbit, OrbitalPath, PathError};

    use crate::scan::GridRequest;

    /// Errors raised while turning a scenario into a grid request.
    #[derive(Debug, Error)]
    pub enum ScenarioError {
        #[error("ephemeris for '{body}': {source}")]
        Path {
            body: String,
            #[source]
            source: PathError,
        },
        #[error("grid end day overflows the day counter")]
        DayOverflow,
    }

    /// Day-sampled path for `body`, covering at least `0..=last_day`.
    pub fn build_path(
        body: &BodyConfig,
        gm_km3_s2: f64,
        last_day: DayOffset,
    ) -> Result<OrbitalPath, ScenarioError> {
        let path = match &body.ephemeris {
            EphemerisSource::Circular {
                radius_km,
                phase_deg,
                inclination_deg,
            } => CircularOrbit {
                radius_km: *radius_km,
                phase_deg: *phase_deg,
                inclination_deg: *inclination_deg,
            }
            .sample(gm_km3_s2, last_day),
            EphemerisSource::Samples { path } => OrbitalPath::from_csv_path(path),
        };
        path.map_err(|source| ScenarioError::Path {
            body: body.name.clone(),
            source,
        })
    }

    /// Grid request described by a scenario, with a Δv budget from its vessel.
    pub fn request_from_scenario(
        scenario: &ScenarioConfig,
        max_delta_v: f64,
    ) -> Result<GridRequest, ScenarioError> {
        let grid = scenario.grid;
        let last_arrival = grid
            .max_delay_days
            .checked_add(grid.max_tof_days)
            .ok_or(ScenarioError::DayOverflow)?;
        let origin = build_path(&scenario.origin, scenario.gm_km3_s2, grid.max_delay_days)?;
        let destination = build_path(&scenario.destination, scenario.gm_km3_s2, last_arrival)?;
        Ok(GridRequest {
            origin: Arc::new(origin),
            destination: Arc::new(destination),
            gm_km3_s2: scenario.gm_km3_s2,
            min_delay: grid.min_delay_days,
            max_delay: grid.max_delay_days,
            min_tof: grid.min_tof_days,
            max_tof: grid.max_tof_days,
            max_delta_v,
        })
    }
}
