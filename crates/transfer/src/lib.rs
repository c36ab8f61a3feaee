//! Porkchop scanning and pointer queries, plus helpers that turn scenario manifests
//! into runtime inputs.

pub mod interaction;
pub mod scan;

pub use facade::*;
pub use window_impulsive as impulsive;
pub use window_propulsion as propulsion;

mod facade;
