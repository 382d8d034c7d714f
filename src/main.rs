//! Twin planner entry point: CLI wiring and config-driven planning run.

use std::path::Path;
use std::process;

use tracing::error;

use twin_planner::cli::{parse_args, print_usage};
use twin_planner::config::ScenarioConfig;
use twin_planner::io::export::{export_report_json, export_schedule_csv};
use twin_planner::logging::init_tracing;
use twin_planner::runner::run_scenario;

fn main() {
    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            process::exit(1);
        }
    };
    if cli.help {
        print_usage();
        return;
    }

    init_tracing();

    // Load config: --scenario takes priority, then --preset
    let loaded = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::baseline()),
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed {
        scenario.plan.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let result = run_scenario(&scenario).unwrap_or_else(|e| {
        error!(%e, "planning failed");
        eprintln!("error: {e}");
        process::exit(1);
    });

    for entry in &result.reports {
        println!("Twin world {} ({})", entry.twin_world.id, entry.twin_world.name);
        println!("{}\n", entry.report);
    }
    println!("Windows applied: {}", result.windows_applied);

    if let Some(ref path) = cli.schedule_out {
        let mut plans = Vec::new();
        for entry in &result.reports {
            match result.planner.plans_for(entry.twin_world.id) {
                Ok(mut p) => plans.append(&mut p),
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
        if let Err(e) = export_schedule_csv(&plans, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Schedules written to {}", path.display());
    }

    if let Some(ref path) = cli.report_out {
        let reports: Vec<_> = result
            .reports
            .iter()
            .map(|entry| (entry.twin_world.clone(), entry.report.clone()))
            .collect();
        if let Err(e) = export_report_json(&reports, Path::new(path)) {
            eprintln!("error: failed to write JSON: {e}");
            process::exit(1);
        }
        eprintln!("Cost reports written to {}", path.display());
    }
}
