use std::io::Cursor;

use approx::assert_relative_eq;
use launch_window::common::constants::{AU_KM, MU_SUN};
use launch_window::common::vector::{dot, norm};
use launch_window::orbits::{CircularOrbit, OrbitalPath, PathError};

#[test]
fn circular_orbit_samples_cover_requested_days() {
    let path = CircularOrbit::coplanar(AU_KM, 0.0)
        .sample(MU_SUN, 365)
        .expect("earth path");
    assert_eq!(path.len(), 366);
    assert!(path.covers(365));
    assert!(!path.covers(366));
    assert!(path.get(366).is_none());

    let start = path.get(0).expect("day 0");
    assert_relative_eq!(start.position_km[0], AU_KM);
    assert_relative_eq!(norm(&start.velocity_km_s), (MU_SUN / AU_KM).sqrt());

    // One sidereal year later Earth is back where it started (within a day of motion).
    let year = path.get(365).expect("day 365");
    let angle = (dot(&start.position_km, &year.position_km) / (AU_KM * AU_KM)).acos();
    assert!(angle.to_degrees() < 1.0, "angle {}", angle.to_degrees());
}

#[test]
fn inclined_orbit_leaves_the_reference_plane() {
    let orbit = CircularOrbit {
        radius_km: AU_KM,
        phase_deg: 90.0,
        inclination_deg: 30.0,
    };
    let state = orbit.state_at(MU_SUN, 0.0);
    assert_relative_eq!(state.position_km[2], AU_KM * 0.5, max_relative = 1e-12);
    assert_relative_eq!(norm(&state.position_km), AU_KM, max_relative = 1e-12);
    assert!(dot(&state.position_km, &state.velocity_km_s).abs() < 1e-3);
}

#[test]
fn invalid_orbits_are_rejected() {
    assert!(matches!(
        CircularOrbit::coplanar(0.0, 0.0).sample(MU_SUN, 3),
        Err(PathError::InvalidRadius(_))
    ));
    assert!(matches!(
        CircularOrbit::coplanar(AU_KM, 0.0).sample(-1.0, 3),
        Err(PathError::InvalidGravitationalParameter(_))
    ));
}

#[test]
fn csv_samples_load_in_day_order() {
    let data = "\
day,x_km,y_km,z_km,vx_km_s,vy_km_s,vz_km_s
0, 1.0, 2.0, 3.0, 0.1, 0.2, 0.3
1, 4.0, 5.0, 6.0, 0.4, 0.5, 0.6
";
    let path = OrbitalPath::from_csv_reader(Cursor::new(data)).expect("csv path");
    assert_eq!(path.len(), 2);
    let second = path.get(1).expect("day 1");
    assert_eq!(second.position_km, [4.0, 5.0, 6.0]);
    assert_eq!(second.velocity_km_s, [0.4, 0.5, 0.6]);
}

#[test]
fn csv_gaps_are_reported() {
    let data = "\
day,x_km,y_km,z_km,vx_km_s,vy_km_s,vz_km_s
0,1,2,3,0,0,0
2,1,2,3,0,0,0
";
    match OrbitalPath::from_csv_reader(Cursor::new(data)) {
        Err(PathError::NonContiguous { expected, found }) => {
            assert_eq!(expected, 1);
            assert_eq!(found, 2);
        }
        other => panic!("expected a gap error, got {other:?}"),
    }

    let malformed = "day,x_km\n0,abc\n";
    assert!(matches!(
        OrbitalPath::from_csv_reader(Cursor::new(malformed)),
        Err(PathError::Csv(_))
    ));
}
