//! Porkchop grid scan: requests, the column worker, and the run scheduler.

mod column;
mod feasibility;
mod request;
mod scheduler;

pub use column::{ColumnResult, RunToken, compute_column};
pub use feasibility::{FeasibilityTracker, is_feasible};
pub use request::{GridRequest, ScanError};
pub use scheduler::{BestCell, Delivery, GridScan, SCAN_TOPIC, ScanProgress, ScanState};
