use approx::assert_relative_eq;
use launch_window::propulsion::{StageMass, Vessel};

fn stage() -> StageMass {
    StageMass {
        dry_mass_kg: 2_000.0,
        propellant_mass_kg: 6_000.0,
        isp_seconds: 340.0,
    }
}

#[test]
fn stage_budget_follows_the_rocket_equation() {
    let stage = stage();
    let ve = 340.0 * 9.80665 / 1_000.0;
    assert_relative_eq!(stage.exhaust_velocity_km_s(), ve, max_relative = 1e-12);
    assert_relative_eq!(stage.ideal_delta_v_km_s(), ve * 4.0f64.ln(), max_relative = 1e-12);
    assert_relative_eq!(
        stage.propellant_for(stage.ideal_delta_v_km_s()),
        6_000.0,
        max_relative = 1e-9
    );
}

#[test]
fn propellant_share_uses_mass_data_when_available() {
    let vessel = Vessel {
        name: "Tug".into(),
        max_delta_v_km_s: None,
        stage: Some(stage()),
    };
    let budget = vessel.max_delta_v_km_s();
    assert_relative_eq!(vessel.used_propellant_percent(budget), 100.0, max_relative = 1e-9);
    let half_budget = vessel.used_propellant_percent(budget / 2.0);
    assert!(half_budget > 50.0, "rocket equation front-loads mass: {half_budget}");
    assert!(vessel.used_propellant_percent(budget * 1.5) > 100.0);
}

#[test]
fn explicit_budget_is_linear() {
    let vessel = Vessel::with_budget("Courier", 8.0);
    assert_eq!(vessel.max_delta_v_km_s(), 8.0);
    assert_relative_eq!(vessel.used_propellant_percent(2.0), 25.0);
    assert_relative_eq!(vessel.used_propellant_percent(10.0), 125.0);
    assert_eq!(vessel.used_propellant_percent(f64::INFINITY), f64::INFINITY);
}
