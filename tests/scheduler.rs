use std::sync::Arc;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use launch_window::common::constants::{AU_KM, MU_SUN};
use launch_window::compute::{ComputeFacility, ManualFacility};
use launch_window::orbits::CircularOrbit;
use launch_window::raster::{Compositor, INFEASIBLE, color_of};
use launch_window::transfer::scan::SCAN_TOPIC;
use launch_window::transfer::{ColumnResult, Delivery, GridRequest, GridScan, ScanError, ScanState};
use proptest::prelude::*;

const MARS_RADIUS_KM: f64 = 227_939_200.0;

fn request(
    min_delay: u32,
    max_delay: u32,
    min_tof: u32,
    max_tof: u32,
    max_dv: f64,
) -> GridRequest {
    let last_day = max_delay + max_tof;
    let origin = CircularOrbit::coplanar(AU_KM, 0.0)
        .sample(MU_SUN, last_day)
        .expect("origin path");
    let destination = CircularOrbit::coplanar(MARS_RADIUS_KM, 44.0)
        .sample(MU_SUN, last_day)
        .expect("destination path");
    GridRequest {
        origin: Arc::new(origin),
        destination: Arc::new(destination),
        gm_km3_s2: MU_SUN,
        min_delay,
        max_delay,
        min_tof,
        max_tof,
        max_delta_v: max_dv,
    }
}

fn manual_scan() -> (Arc<ManualFacility<ColumnResult>>, GridScan) {
    let facility = Arc::new(ManualFacility::new());
    let scan = GridScan::new(facility.clone());
    (facility, scan)
}

fn column(scan: &GridScan, delay: u32, rows: usize, delta_v: f64) -> ColumnResult {
    ColumnResult {
        run: scan.current_token().expect("active run"),
        delay,
        delta_vs: vec![delta_v; rows],
    }
}

#[test]
fn uniform_cheap_grid_completes_feasible() {
    let (_facility, mut scan) = manual_scan();
    let req = request(0, 9, 50, 59, 5000.0);
    assert!(scan.set_request(req).expect("valid request"));
    assert_eq!(scan.state(), ScanState::Running);

    for delay in 0..10 {
        let result = column(&scan, delay, 10, 1000.0);
        assert_eq!(scan.accept(result), Delivery::Painted);
    }

    assert_eq!(scan.state(), ScanState::Completed);
    assert!(scan.is_ready());
    assert!(scan.is_feasible());
    let pixel = scan.surface().pixel(0, 10).expect("pixel in range");
    assert_eq!(pixel, color_of(1000.0, 5000.0));
    assert_ne!(pixel, INFEASIBLE);
    assert!(pixel.g > pixel.b, "low cost should sit on the green end: {pixel:?}");

    let progress = scan.progress();
    assert_eq!(progress.completed, 10);
    assert_eq!(progress.total, 10);
    assert_eq!(progress.fraction(), 1.0);
    let best = progress.best.expect("best cell");
    assert_eq!(best.delta_v, 1000.0);
}

#[test]
fn over_budget_grid_is_infeasible_and_black() {
    let (_facility, mut scan) = manual_scan();
    scan.set_request(request(0, 9, 50, 59, 5000.0)).expect("valid request");

    for delay in 0..10 {
        scan.accept(column(&scan, delay, 10, 9999.0));
    }

    assert_eq!(scan.state(), ScanState::Completed);
    assert!(!scan.is_feasible());
    assert!(scan.progress().best.is_none());
    let surface = scan.surface();
    for x in 0..10 {
        for y in 1..=10 {
            assert_eq!(surface.pixel(x, y), Some(INFEASIBLE), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn zero_and_non_finite_costs_are_not_feasible() {
    let (_facility, mut scan) = manual_scan();
    scan.set_request(request(0, 1, 1, 3, 5000.0)).expect("valid request");
    let token = scan.current_token().expect("run");
    scan.accept(ColumnResult {
        run: token,
        delay: 0,
        delta_vs: vec![0.0, f64::NAN, f64::INFINITY],
    });
    scan.accept(ColumnResult {
        run: token,
        delay: 1,
        delta_vs: vec![5000.0, -3.0, 0.0],
    });
    assert!(scan.is_ready());
    assert!(!scan.is_feasible());
}

#[test]
fn supersede_discards_old_results() {
    let (facility, mut scan) = manual_scan();
    scan.set_request(request(0, 9, 50, 59, 5000.0)).expect("first request");
    let old_token = scan.current_token().expect("first run");
    for delay in 0..4 {
        scan.accept(column(&scan, delay, 10, 9999.0));
    }

    scan.set_request(request(0, 9, 50, 59, 6000.0)).expect("second request");
    let new_token = scan.current_token().expect("second run");
    assert!(new_token > old_token);
    assert!(
        facility
            .queued()
            .iter()
            .all(|label| label.topic == SCAN_TOPIC && label.tag == new_token.0),
        "old run tasks must be cancelled"
    );

    for delay in 4..10 {
        let late = ColumnResult {
            run: old_token,
            delay,
            delta_vs: vec![9999.0; 10],
        };
        assert_eq!(scan.accept(late), Delivery::Stale);
    }
    assert_eq!(scan.progress().completed, 0);

    for delay in 0..10 {
        scan.accept(column(&scan, delay, 10, 1500.0 + f64::from(delay) * 100.0));
    }

    let mut reference = Compositor::new(10, 10);
    for delay in 0..10usize {
        reference.paint_column(delay, &[1500.0 + delay as f64 * 100.0; 10], 6000.0);
    }
    assert_eq!(scan.state(), ScanState::Completed);
    assert_eq!(scan.surface(), reference.surface());
    assert!(scan.is_feasible());
}

#[test]
fn duplicate_columns_do_not_double_count() {
    let (_facility, mut scan) = manual_scan();
    scan.set_request(request(0, 2, 1, 4, 5000.0)).expect("valid request");

    assert_eq!(scan.accept(column(&scan, 0, 4, 1000.0)), Delivery::Painted);
    let before = scan.surface().clone();
    assert_eq!(scan.accept(column(&scan, 0, 4, 4000.0)), Delivery::Duplicate);
    assert_eq!(scan.surface(), &before);
    assert_eq!(scan.progress().completed, 1);
    assert_relative_eq!(scan.progress().fraction(), 1.0 / 3.0);
    assert_eq!(scan.state(), ScanState::Running);

    assert_eq!(scan.accept(column(&scan, 7, 4, 1000.0)), Delivery::OutOfRange);
    scan.accept(column(&scan, 1, 4, 1000.0));
    scan.accept(column(&scan, 2, 4, 1000.0));
    assert_eq!(scan.state(), ScanState::Completed);
    assert_eq!(scan.accept(column(&scan, 2, 4, 1000.0)), Delivery::Duplicate);
    assert_eq!(scan.progress().completed, 3);
}

#[test]
fn sweep_marker_follows_largest_column_until_complete() {
    let (_facility, mut scan) = manual_scan();
    scan.set_request(request(10, 14, 1, 3, 5000.0)).expect("valid request");
    scan.accept(column(&scan, 12, 3, 1000.0));
    scan.accept(column(&scan, 10, 3, 1000.0));
    assert_eq!(scan.compositor().sweep_column(), Some(2));
    assert_ne!(scan.frame(), *scan.surface());

    for delay in [11, 13, 14] {
        scan.accept(column(&scan, delay, 3, 1000.0));
    }
    assert!(scan.is_ready());
    assert_eq!(scan.frame(), *scan.surface());
}

#[test]
fn unchanged_request_does_not_restart() {
    let (facility, mut scan) = manual_scan();
    let req = request(0, 4, 1, 3, 5000.0);
    assert!(scan.set_request(req.clone()).expect("first"));
    let token = scan.current_token();
    assert!(!scan.set_request(req).expect("same request"));
    assert_eq!(scan.current_token(), token);
    assert_eq!(facility.pending(), 5);
}

#[test]
fn invalid_request_leaves_state_untouched() {
    let (facility, mut scan) = manual_scan();
    let mut inverted = request(0, 4, 1, 3, 5000.0);
    inverted.max_delay = 0;
    inverted.min_delay = 3;
    assert_eq!(
        scan.set_request(inverted),
        Err(ScanError::InvertedDelayRange { min: 3, max: 0 })
    );
    assert_eq!(scan.state(), ScanState::Idle);
    assert_eq!(facility.pending(), 0);

    scan.set_request(request(0, 4, 1, 3, 5000.0)).expect("valid request");
    let token = scan.current_token();

    let mut short = request(0, 4, 1, 3, 5000.0);
    short.max_tof = 400;
    match scan.set_request(short) {
        Err(ScanError::EphemerisCoverage { body, .. }) => assert_eq!(body, "destination"),
        other => panic!("expected a coverage error, got {other:?}"),
    }
    assert_eq!(scan.state(), ScanState::Running);
    assert_eq!(scan.current_token(), token);
    assert_eq!(facility.pending(), 5);
}

#[test]
fn stalled_columns_are_forced_infeasible() {
    let (facility, mut scan) = manual_scan();
    scan = scan.with_column_timeout(Some(Duration::from_millis(10)));
    let t0 = Instant::now();
    scan.start(request(0, 5, 1, 4, 5000.0), t0).expect("valid request");
    for delay in 0..3 {
        scan.accept_at(column(&scan, delay, 4, 1000.0), t0);
    }

    assert_eq!(scan.expire_stalled(t0), 0);
    assert_eq!(scan.state(), ScanState::Running);

    let forced = scan.expire_stalled(t0 + Duration::from_secs(1));
    assert_eq!(forced, 3);
    assert_eq!(scan.state(), ScanState::Completed);
    assert_eq!(facility.pending(), 0);
    for x in 3..6 {
        assert_eq!(scan.surface().pixel(x, 4), Some(INFEASIBLE));
    }
    assert_eq!(scan.accept(column(&scan, 4, 4, 1000.0)), Delivery::Duplicate);
    assert!(scan.is_feasible());
}

#[test]
fn stall_deadline_follows_the_host_clock() {
    let (_facility, mut scan) = manual_scan();
    scan = scan.with_column_timeout(Some(Duration::from_millis(10)));
    let t0 = Instant::now();
    scan.start(request(0, 3, 1, 2, 5000.0), t0).expect("valid request");

    let later = t0 + Duration::from_secs(60);
    scan.accept_at(column(&scan, 0, 2, 1000.0), later);
    assert_eq!(scan.expire_stalled(later + Duration::from_millis(5)), 0);
    assert_eq!(scan.state(), ScanState::Running);

    assert_eq!(scan.expire_stalled(later + Duration::from_millis(20)), 3);
    assert_eq!(scan.state(), ScanState::Completed);
}

#[test]
fn without_timeout_stalls_never_expire() {
    let (_facility, mut scan) = manual_scan();
    scan.set_request(request(0, 2, 1, 2, 5000.0)).expect("valid request");
    assert_eq!(
        scan.expire_stalled(Instant::now() + Duration::from_secs(3600)),
        0
    );
    assert_eq!(scan.state(), ScanState::Running);
}

#[test]
fn manual_facility_drives_a_real_scan() {
    let (facility, mut scan) = manual_scan();
    scan.set_request(request(0, 20, 150, 330, 12.0)).expect("valid request");
    assert_eq!(facility.pending(), 21);

    facility.run_all();
    let painted = scan.pump();
    assert_eq!(painted, 21);
    assert_eq!(scan.state(), ScanState::Completed);
    assert!(scan.is_feasible(), "Earth-Mars window should be flyable on 12 km/s");

    let best = scan.progress().best.expect("best cell");
    assert!(best.delta_v > 4.0 && best.delta_v < 12.0, "best dv {}", best.delta_v);
    assert_eq!(scan.columns().count(), 21);
}

#[test]
fn stop_supersedes_without_new_run() {
    let (facility, mut scan) = manual_scan();
    scan.set_request(request(0, 4, 1, 3, 5000.0)).expect("valid request");
    let token = scan.current_token().expect("run");
    scan.supersede();
    assert_eq!(scan.state(), ScanState::Superseded);
    assert_eq!(facility.pending(), 0);
    let late = ColumnResult {
        run: token,
        delay: 0,
        delta_vs: vec![1000.0; 3],
    };
    assert_eq!(scan.accept(late), Delivery::Stale);
}

fn new_run_cost(col: usize, row: usize) -> f64 {
    400.0 + 350.0 * col as f64 + 90.0 * row as f64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn interleaved_old_results_never_reach_the_surface(
        order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle(),
        noise in prop::collection::vec((0..8u32, 1.0f64..9000.0), 0..40),
    ) {
        let (_facility, mut scan) = manual_scan();
        let old = scan.start(request(0, 7, 1, 6, 5000.0), Instant::now()).expect("old run");
        let new = scan.start(request(0, 7, 1, 6, 5000.5), Instant::now()).expect("new run");

        let mut noise = noise.into_iter();
        for col in order {
            if let Some((delay, dv)) = noise.next() {
                let stale = ColumnResult { run: old, delay, delta_vs: vec![dv; 6] };
                prop_assert_eq!(scan.accept(stale), Delivery::Stale);
            }
            let fresh = ColumnResult {
                run: new,
                delay: col as u32,
                delta_vs: (0..6).map(|row| new_run_cost(col, row)).collect(),
            };
            prop_assert_eq!(scan.accept(fresh), Delivery::Painted);
        }
        for (delay, dv) in noise {
            let stale = ColumnResult { run: old, delay, delta_vs: vec![dv; 6] };
            prop_assert_eq!(scan.accept(stale), Delivery::Stale);
        }

        let mut reference = Compositor::new(8, 6);
        for col in 0..8 {
            let costs: Vec<f64> = (0..6).map(|row| new_run_cost(col, row)).collect();
            reference.paint_column(col, &costs, 5000.5);
        }
        prop_assert_eq!(scan.state(), ScanState::Completed);
        prop_assert_eq!(scan.surface(), reference.surface());
    }
}
