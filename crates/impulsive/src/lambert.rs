//! Lambert's problem in Izzo's formulation, including multi-revolution branches.
//!
//! Every branch is expressed through the non-dimensional variable `x` and the
//! geometry parameter `lambda`; the time-of-flight equation `T(x)` is inverted with
//! Householder iterations. The zero-revolution branch always exists for valid
//! geometry; for `N >= 1` revolutions two branches (left and right of the minimum
//! time `T_min(N)`) exist whenever the requested time exceeds that minimum.
//!
//! Inputs are in any consistent unit system (the workspace uses km, km/s, km³/s²).

use std::f64::consts::PI;

use thiserror::Error;
use window_core::vector::{self, Vector3};

/// Upper bound on the revolution count searched by [`solve_cost`] and [`solve_exact`].
pub const DEFAULT_MAX_REVOLUTIONS: u32 = 4;

const HOUSEHOLDER_TOLERANCE: f64 = 1e-12;
const HOUSEHOLDER_MAX_ITER: usize = 30;
const HALLEY_MAX_ITER: usize = 12;
const TOF_RESIDUAL_TOLERANCE: f64 = 1e-8;
const BATTIN_THRESHOLD: f64 = 0.01;
const LAGRANGE_THRESHOLD: f64 = 0.2;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LambertSolverError {
    #[error("time of flight must be positive (got {0})")]
    NonPositiveTimeOfFlight(f64),
    #[error("gravitational parameter must be positive (got {0})")]
    NonPositiveGravitationalParameter(f64),
    #[error("position vectors must be finite and non-zero")]
    DegeneratePosition,
    #[error("positions are collinear; the transfer plane is undefined")]
    Collinear,
    #[error("no branch converged for the requested time of flight")]
    NoConvergence,
}

/// Sense of motion of the transfer about the +z pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Prograde,
    Retrograde,
}

/// One converged solution of Lambert's problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertBranch {
    pub revolutions: u32,
    pub direction: TransferDirection,
    /// Velocity on the transfer orbit at the first position.
    pub departure_velocity: Vector3,
    /// Velocity on the transfer orbit at the second position.
    pub arrival_velocity: Vector3,
}

impl LambertBranch {
    /// Departure plus rendezvous impulse against the given boundary velocities.
    pub fn rendezvous_delta_v(
        &self,
        origin_velocity: &Vector3,
        destination_velocity: &Vector3,
    ) -> f64 {
        let departure = vector::sub(&self.departure_velocity, origin_velocity);
        let arrival = vector::sub(destination_velocity, &self.arrival_velocity);
        vector::norm(&departure) + vector::norm(&arrival)
    }
}

/// Minimum-cost transfer returned by the interactive query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExactTransfer {
    pub delta_v: f64,
    pub orbit: LambertBranch,
    /// Number of converged branches compared to pick `orbit`.
    pub solutions: usize,
    /// Highest revolution count that admitted a solution in either direction.
    pub max_revolutions: u32,
}

/// Solve every branch of Lambert's problem up to `max_revolutions` in one direction.
pub fn solve_branches(
    mu: f64,
    r1: &Vector3,
    r2: &Vector3,
    time_of_flight_s: f64,
    direction: TransferDirection,
    max_revolutions: u32,
) -> Result<Vec<LambertBranch>, LambertSolverError> {
    let geometry = Geometry::new(mu, r1, r2, time_of_flight_s, direction)?;
    let n_max = geometry.max_revolutions().min(max_revolutions);

    let mut branches = Vec::with_capacity(1 + 2 * n_max as usize);
    if let Some(x) = geometry.solve_zero_revolution() {
        branches.push(geometry.branch(x, 0));
    }
    for revs in 1..=n_max {
        let (left, right) = geometry.solve_multi_revolution(revs);
        branches.extend(left.map(|x| geometry.branch(x, revs)));
        branches.extend(right.map(|x| geometry.branch(x, revs)));
    }

    if branches.is_empty() {
        return Err(LambertSolverError::NoConvergence);
    }
    Ok(branches)
}

/// Exact query: search both directions and all revolution counts, return the cheapest branch.
pub fn solve_exact(
    gm: f64,
    origin_position: &Vector3,
    destination_position: &Vector3,
    time_of_flight_s: f64,
    origin_velocity: &Vector3,
    destination_velocity: &Vector3,
) -> Result<ExactTransfer, LambertSolverError> {
    let mut best: Option<(f64, LambertBranch)> = None;
    let mut solutions = 0;
    let mut max_revolutions = 0;
    let mut last_error = LambertSolverError::NoConvergence;

    for direction in [TransferDirection::Prograde, TransferDirection::Retrograde] {
        let branches = match solve_branches(
            gm,
            origin_position,
            destination_position,
            time_of_flight_s,
            direction,
            DEFAULT_MAX_REVOLUTIONS,
        ) {
            Ok(branches) => branches,
            Err(err) => {
                last_error = err;
                continue;
            }
        };
        for branch in branches {
            let delta_v = branch.rendezvous_delta_v(origin_velocity, destination_velocity);
            if !delta_v.is_finite() {
                continue;
            }
            solutions += 1;
            max_revolutions = max_revolutions.max(branch.revolutions);
            // Strict comparison keeps the first (lowest revolution, prograde) branch on ties.
            if best.map_or(true, |(current, _)| delta_v < current) {
                best = Some((delta_v, branch));
            }
        }
    }

    let (delta_v, orbit) = best.ok_or(last_error)?;
    Ok(ExactTransfer {
        delta_v,
        orbit,
        solutions,
        max_revolutions,
    })
}

/// Grid-scan cost: Δv of the cheapest branch, or `f64::INFINITY` when no transfer exists.
pub fn solve_cost(
    gm: f64,
    origin_position: &Vector3,
    destination_position: &Vector3,
    time_of_flight_s: f64,
    origin_velocity: &Vector3,
    destination_velocity: &Vector3,
) -> f64 {
    solve_exact(
        gm,
        origin_position,
        destination_position,
        time_of_flight_s,
        origin_velocity,
        destination_velocity,
    )
    .map(|transfer| transfer.delta_v)
    .unwrap_or(f64::INFINITY)
}

/// Non-dimensional description of one Lambert problem.
struct Geometry {
    lambda: f64,
    lambda2: f64,
    lambda3: f64,
    /// Non-dimensional time of flight.
    t: f64,
    r1_mag: f64,
    r2_mag: f64,
    chord: f64,
    semi_perimeter: f64,
    mu: f64,
    direction: TransferDirection,
    ir1: Vector3,
    ir2: Vector3,
    it1: Vector3,
    it2: Vector3,
}

impl Geometry {
    fn new(
        mu: f64,
        r1: &Vector3,
        r2: &Vector3,
        time_of_flight_s: f64,
        direction: TransferDirection,
    ) -> Result<Self, LambertSolverError> {
        if !(time_of_flight_s.is_finite() && time_of_flight_s > 0.0) {
            return Err(LambertSolverError::NonPositiveTimeOfFlight(time_of_flight_s));
        }
        if !(mu.is_finite() && mu > 0.0) {
            return Err(LambertSolverError::NonPositiveGravitationalParameter(mu));
        }
        let ir1 = vector::normalize(r1).ok_or(LambertSolverError::DegeneratePosition)?;
        let ir2 = vector::normalize(r2).ok_or(LambertSolverError::DegeneratePosition)?;
        let r1_mag = vector::norm(r1);
        let r2_mag = vector::norm(r2);

        let chord = vector::norm(&vector::sub(r2, r1));
        let semi_perimeter = 0.5 * (chord + r1_mag + r2_mag);

        let h = vector::cross(&ir1, &ir2);
        if vector::norm(&h) < 1e-12 {
            return Err(LambertSolverError::Collinear);
        }
        let ih = vector::normalize(&h).ok_or(LambertSolverError::Collinear)?;

        let lambda2 = 1.0 - chord / semi_perimeter;
        let mut lambda = lambda2.max(0.0).sqrt();
        let (mut it1, mut it2) = if ih[2] < 0.0 {
            // Transfer angle beyond 180 degrees for prograde motion.
            lambda = -lambda;
            (vector::cross(&ir1, &ih), vector::cross(&ir2, &ih))
        } else {
            (vector::cross(&ih, &ir1), vector::cross(&ih, &ir2))
        };
        if direction == TransferDirection::Retrograde {
            lambda = -lambda;
            it1 = vector::scale(&it1, -1.0);
            it2 = vector::scale(&it2, -1.0);
        }
        let it1 = vector::normalize(&it1).ok_or(LambertSolverError::Collinear)?;
        let it2 = vector::normalize(&it2).ok_or(LambertSolverError::Collinear)?;

        let t = (2.0 * mu / semi_perimeter.powi(3)).sqrt() * time_of_flight_s;

        Ok(Self {
            lambda,
            lambda2,
            lambda3: lambda * lambda2,
            t,
            r1_mag,
            r2_mag,
            chord,
            semi_perimeter,
            mu,
            direction,
            ir1,
            ir2,
            it1,
            it2,
        })
    }

    /// Largest revolution count whose minimum time of flight does not exceed `t`.
    fn max_revolutions(&self) -> u32 {
        let mut n_max = (self.t / PI).floor();
        if !n_max.is_finite() || n_max < 1.0 {
            return 0;
        }
        let t00 = self.lambda.acos() + self.lambda * (1.0 - self.lambda2).sqrt();
        let t0 = t00 + n_max * PI;
        if self.t < t0 {
            let mut x_old: f64 = 0.0;
            let mut t_min = t0;
            for _ in 0..HALLEY_MAX_ITER {
                let (dt, ddt, dddt) = self.derivatives(x_old, t_min);
                if dt == 0.0 {
                    break;
                }
                let x_new = x_old - dt * ddt / (ddt * ddt - dt * dddt / 2.0);
                if !x_new.is_finite() {
                    break;
                }
                let err = (x_old - x_new).abs();
                t_min = self.time_of_flight(x_new, n_max as u32);
                x_old = x_new;
                if err < 1e-13 {
                    break;
                }
            }
            if t_min > self.t {
                n_max -= 1.0;
            }
        }
        n_max.max(0.0) as u32
    }

    fn solve_zero_revolution(&self) -> Option<f64> {
        let t00 = self.lambda.acos() + self.lambda * (1.0 - self.lambda2).sqrt();
        let t1 = 2.0 / 3.0 * (1.0 - self.lambda3);
        let x0 = if self.t >= t00 {
            -(self.t - t00) / (self.t - t00 + 4.0)
        } else if self.t <= t1 {
            t1 * (t1 - self.t) / (0.4 * (1.0 - self.lambda2 * self.lambda3) * self.t) + 1.0
        } else {
            (self.t / t00).powf(std::f64::consts::LN_2 / (t1 / t00).ln()) - 1.0
        };
        self.householder(x0, 0)
    }

    fn solve_multi_revolution(&self, revs: u32) -> (Option<f64>, Option<f64>) {
        let n = f64::from(revs);
        let left = {
            let tmp = ((n * PI + PI) / (8.0 * self.t)).powf(2.0 / 3.0);
            self.householder((tmp - 1.0) / (tmp + 1.0), revs)
        };
        let right = {
            let tmp = ((8.0 * self.t) / (n * PI)).powf(2.0 / 3.0);
            self.householder((tmp - 1.0) / (tmp + 1.0), revs)
        };
        // Both iterations can collapse onto the same root near T_min.
        let right = match (left, right) {
            (Some(l), Some(r)) if (l - r).abs() < 1e-9 => None,
            (_, r) => r,
        };
        (left, right)
    }

    fn householder(&self, mut x: f64, revs: u32) -> Option<f64> {
        for _ in 0..HOUSEHOLDER_MAX_ITER {
            let tof = self.time_of_flight(x, revs);
            let (dt, ddt, dddt) = self.derivatives(x, tof);
            let delta = tof - self.t;
            let dt2 = dt * dt;
            let x_new = x
                - delta * (dt2 - delta * ddt / 2.0)
                    / (dt * (dt2 - delta * ddt) + dddt * delta * delta / 6.0);
            if !x_new.is_finite() {
                return None;
            }
            let err = (x - x_new).abs();
            x = x_new;
            if err < HOUSEHOLDER_TOLERANCE {
                break;
            }
        }
        let residual = (self.time_of_flight(x, revs) - self.t).abs();
        if x > -1.0 && residual <= TOF_RESIDUAL_TOLERANCE * self.t.max(1.0) {
            Some(x)
        } else {
            None
        }
    }

    /// First three derivatives of `T(x)`.
    fn derivatives(&self, x: f64, t: f64) -> (f64, f64, f64) {
        let l2 = self.lambda2;
        let l3 = self.lambda3;
        let umx2 = 1.0 - x * x;
        let y = (1.0 - l2 * umx2).sqrt();
        let y2 = y * y;
        let y3 = y2 * y;
        let dt = (3.0 * t * x - 2.0 + 2.0 * l3 * x / y) / umx2;
        let ddt = (3.0 * t + 5.0 * x * dt + 2.0 * (1.0 - l2) * l3 / y3) / umx2;
        let dddt = (7.0 * x * ddt + 8.0 * dt - 6.0 * (1.0 - l2) * l2 * l3 * x / y3 / y2) / umx2;
        (dt, ddt, dddt)
    }

    /// Non-dimensional time of flight for `x` and `revs` complete revolutions.
    fn time_of_flight(&self, x: f64, revs: u32) -> f64 {
        let n = f64::from(revs);
        let dist = (x - 1.0).abs();
        if dist < LAGRANGE_THRESHOLD && dist > BATTIN_THRESHOLD {
            return self.time_of_flight_lagrange(x, n);
        }

        let lambda = self.lambda;
        let e = x * x - 1.0;
        let rho = e.abs();
        let z = (1.0 + self.lambda2 * e).sqrt();

        if dist < BATTIN_THRESHOLD {
            let eta = z - lambda * x;
            let s1 = 0.5 * (1.0 - lambda - x * eta);
            let q = 4.0 / 3.0 * hypergeometric_f(s1, 1e-11);
            (eta.powi(3) * q + 4.0 * lambda * eta) / 2.0 + n * PI / rho.powf(1.5)
        } else {
            let y = rho.sqrt();
            let g = x * z - lambda * e;
            let d = if e < 0.0 {
                n * PI + g.clamp(-1.0, 1.0).acos()
            } else {
                let f = y * (z - lambda * x);
                (f + g).ln()
            };
            (x - lambda * z - d / y) / e
        }
    }

    fn time_of_flight_lagrange(&self, x: f64, n: f64) -> f64 {
        let a = 1.0 / (1.0 - x * x);
        if a > 0.0 {
            let alpha = 2.0 * x.acos();
            let mut beta = 2.0 * (self.lambda2 / a).sqrt().min(1.0).asin();
            if self.lambda < 0.0 {
                beta = -beta;
            }
            a * a.sqrt() * ((alpha - alpha.sin()) - (beta - beta.sin()) + 2.0 * PI * n) / 2.0
        } else {
            let alpha = 2.0 * x.acosh();
            let mut beta = 2.0 * (-self.lambda2 / a).sqrt().asinh();
            if self.lambda < 0.0 {
                beta = -beta;
            }
            -a * (-a).sqrt() * ((beta - beta.sinh()) - (alpha - alpha.sinh())) / 2.0
        }
    }

    fn branch(&self, x: f64, revolutions: u32) -> LambertBranch {
        let gamma = (self.mu * self.semi_perimeter / 2.0).sqrt();
        let rho = (self.r1_mag - self.r2_mag) / self.chord;
        let sigma = (1.0 - rho * rho).max(0.0).sqrt();
        let lambda = self.lambda;

        let y = (1.0 - self.lambda2 + self.lambda2 * x * x).sqrt();
        let vr1 = gamma * ((lambda * y - x) - rho * (lambda * y + x)) / self.r1_mag;
        let vr2 = -gamma * ((lambda * y - x) + rho * (lambda * y + x)) / self.r2_mag;
        let vt = gamma * sigma * (y + lambda * x);
        let vt1 = vt / self.r1_mag;
        let vt2 = vt / self.r2_mag;

        LambertBranch {
            revolutions,
            direction: self.direction,
            departure_velocity: vector::add(
                &vector::scale(&self.ir1, vr1),
                &vector::scale(&self.it1, vt1),
            ),
            arrival_velocity: vector::add(
                &vector::scale(&self.ir2, vr2),
                &vector::scale(&self.it2, vt2),
            ),
        }
    }
}

/// Gauss hypergeometric series used by Battin's near-parabolic expression.
fn hypergeometric_f(z: f64, tolerance: f64) -> f64 {
    let mut sj = 1.0;
    let mut cj: f64 = 1.0;
    for j in 0..1000 {
        let j = f64::from(j);
        let cj1 = cj * (3.0 + j) * (1.0 + j) / (2.5 + j) * z / (j + 1.0);
        sj += cj1;
        if cj1.abs() <= tolerance {
            break;
        }
        cj = cj1;
    }
    sj
}
