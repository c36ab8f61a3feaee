//! Launch window planner.
//!
//! Scans a porkchop grid of departure delay against time of flight, paints the
//! costs into a raster, and answers pointer queries with exact transfers. The
//! member crates are re-exported here so front-ends depend on a single crate.

pub use window_compute as compute;
pub use window_config as config;
pub use window_core as common;
pub use window_export as export;
pub use window_impulsive as impulsive;
pub use window_orbits as orbits;
pub use window_propulsion as propulsion;
pub use window_raster as raster;
pub use window_transfer as transfer;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
