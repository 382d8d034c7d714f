use std::process::Command;

use twin_planner::config::ScenarioConfig;
use twin_planner::io::export::write_schedule_csv;
use twin_planner::runner::run_scenario;

#[derive(Debug)]
struct CostLines {
    total_cost: f64,
    solar_energy_kwh: f64,
}

#[test]
fn scenario_files_run_via_cli_and_produce_distinct_costs() {
    let baseline = run_and_parse_costs(&["--scenario", "scenarios/baseline.toml"]);
    let high_solar = run_and_parse_costs(&["--scenario", "scenarios/high_solar.toml"]);
    let peak = run_and_parse_costs(&["--scenario", "scenarios/peak_tariff.toml"]);

    assert!(
        high_solar.solar_energy_kwh > baseline.solar_energy_kwh,
        "expected more solar energy with larger arrays: baseline={:.2}, high_solar={:.2}",
        baseline.solar_energy_kwh,
        high_solar.solar_energy_kwh
    );
    assert!(
        high_solar.total_cost < baseline.total_cost,
        "expected lower cost with larger arrays: baseline={:.2}, high_solar={:.2}",
        baseline.total_cost,
        high_solar.total_cost
    );
    assert!(
        (peak.total_cost - baseline.total_cost).abs() > 1.0,
        "expected peak tariff to change cost: baseline={:.2}, peak={:.2}",
        baseline.total_cost,
        peak.total_cost
    );
}

#[test]
fn scenario_files_match_presets() {
    for name in ScenarioConfig::PRESETS {
        let from_file = run_and_parse_costs(&["--scenario", &format!("scenarios/{name}.toml")]);
        let from_preset = run_and_parse_costs(&["--preset", name]);
        assert!(
            (from_file.total_cost - from_preset.total_cost).abs() < 1e-6,
            "scenario file and preset \"{name}\" should agree: {from_file:?} vs {from_preset:?}"
        );
    }
}

#[test]
fn unknown_preset_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_twin-planner"))
        .args(["--preset", "nonexistent"])
        .output()
        .expect("twin-planner process should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"), "stderr: {stderr}");
}

#[test]
fn presets_are_deterministic_and_export_every_active_day() {
    for name in ScenarioConfig::PRESETS {
        let cfg = ScenarioConfig::from_preset(name).expect("preset loads");
        let a = run_scenario(&cfg).expect("preset runs");
        let b = run_scenario(&cfg).expect("preset runs");
        assert_eq!(a.reports[0].report, b.reports[0].report, "preset {name}");

        let plans = a.planner.plans_for(1).expect("twin world exists");
        let mut buf = Vec::new();
        write_schedule_csv(&plans, &mut buf).expect("export succeeds");
        let rows = String::from_utf8(buf).expect("utf-8").lines().count() - 1;
        assert_eq!(rows, a.reports[0].report.active_days, "preset {name}");
        assert_eq!(rows, a.windows_applied, "preset {name}");
    }
}

fn run_and_parse_costs(args: &[&str]) -> CostLines {
    let output = Command::new(env!("CARGO_BIN_EXE_twin-planner"))
        .args(args)
        .output()
        .expect("twin-planner process should run");

    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={} ",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    CostLines {
        total_cost: parse_metric(&stdout, "Total cost:", ""),
        solar_energy_kwh: parse_metric(&stdout, "Solar energy:", "kWh"),
    }
}

fn parse_metric(stdout: &str, label: &str, unit: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing line `{label}` in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid format for line `{line}`"));

    // "12.34 kWh (56 slots, 7.8%)" -> "12.34"
    let numeric = raw.split_whitespace().next().unwrap_or(raw);
    let numeric = numeric.strip_suffix(unit).unwrap_or(numeric).trim();
    numeric
        .parse::<f64>()
        .unwrap_or_else(|_| panic!("failed parsing `{numeric}` from line `{line}`"))
}
