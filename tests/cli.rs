use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_scenario(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("mini.yaml");
    fs::write(
        &path,
        r#"
name: mini-mars
base_epoch: "2031-01-01T00:00:00"
origin:
  name: Earth
  ephemeris: { type: circular, radius_km: 149597870.7 }
destination:
  name: Mars
  ephemeris: { type: circular, radius_km: 227939200.0, phase_deg: 44.0 }
grid: { min_delay_days: 0, max_delay_days: 6, min_tof_days: 230, max_tof_days: 270 }
vessel: { name: Courier, max_delta_v_km_s: 8.0 }
scheduler: { worker_threads: 2 }
"#,
    )
    .expect("write scenario");
    path
}

#[test]
fn porkchop_scans_and_exports() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scenario = write_scenario(dir.path());
    let png = dir.path().join("out").join("pork.png");
    let csv = dir.path().join("out").join("pork.csv");

    Command::cargo_bin("porkchop")
        .expect("porkchop bin")
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--output",
            png.to_str().unwrap(),
            "--csv",
            csv.to_str().unwrap(),
            "--scale",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Feasible: yes"))
        .stdout(predicate::str::contains("Grid: 7 delays x 41 flight times"));

    assert!(fs::metadata(&png).expect("png metadata").len() > 0);
    let table = fs::read_to_string(&csv).expect("csv");
    assert!(table.starts_with("delay_days,tof_days,departure_utc,arrival_utc,delta_v"));
    assert_eq!(table.lines().count(), 1 + 7 * 41);
}

#[test]
fn porkchop_pick_prints_the_committed_transfer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scenario = write_scenario(dir.path());

    let output = Command::cargo_bin("porkchop")
        .expect("porkchop bin")
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--pick",
            "0,0.5",
            "--threads",
            "1",
        ])
        .output()
        .expect("run porkchop");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let solution: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(solution["departure_day"], 0);
    assert_eq!(solution["tof_days"], 250);
    assert_eq!(solution["departure_utc"], "2031-01-01T00:00:00");
    assert_eq!(solution["invalid"], false);
    let delta_v = solution["delta_v"].as_f64().expect("delta_v");
    assert!(delta_v > 5.0 && delta_v < 8.0, "delta_v {delta_v}");
}

#[test]
fn porkchop_reports_bad_scenarios() {
    Command::cargo_bin("porkchop")
        .expect("porkchop bin")
        .args(["--scenario", "does/not/exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading scenario"));

    Command::cargo_bin("porkchop")
        .expect("porkchop bin")
        .args([
            "--scenario",
            "data/scenarios/earth_mars.yaml",
            "--pick",
            "half,way",
        ])
        .assert()
        .failure();
}
