//! Command-line argument parsing for the `twin-planner` binary.

use std::env;
use std::path::PathBuf;

/// Parsed CLI arguments.
#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub schedule_out: Option<PathBuf>,
    pub report_out: Option<PathBuf>,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

/// Parses arguments without the program name.
///
/// `--scenario` and `--preset` are mutually exclusive; with neither, the
/// `baseline` preset is used.
///
/// # Errors
///
/// Returns a message for unknown flags, missing or malformed values, and
/// repeated flags.
pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                if opts.seed.replace(seed).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--schedule-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --schedule-out (expected a file path)",
                )?;
                if opts.schedule_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--schedule-out provided more than once".to_string());
                }
            }
            "--report-out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --report-out (expected a file path)")?;
                if opts.report_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--report-out provided more than once".to_string());
                }
            }
            "--help" | "-h" => {
                opts.help = true;
                return Ok(opts);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if opts.scenario.is_none() && opts.preset.is_none() {
        opts.preset = Some("baseline".to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("twin-planner: appliance run planner for twin-world households");
    eprintln!();
    eprintln!("Usage: twin-planner [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, high_solar, peak_tariff)");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --schedule-out <path>    Export active day schedules to CSV");
    eprintln!("  --report-out <path>      Export cost reports to JSON");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=debug) to change log verbosity.");
}

#[cfg(test)]
mod tests {
    use super::parse_args_from;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn supports_scenario_cli() {
        let opts = parse_args_from(args(&["--scenario", "scenario.toml"]))
            .expect("parse should succeed");
        assert_eq!(
            opts.scenario.as_deref().and_then(|p| p.to_str()),
            Some("scenario.toml")
        );
        assert!(opts.preset.is_none());
    }

    #[test]
    fn defaults_to_baseline_preset() {
        let opts = parse_args_from(Vec::new()).expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("baseline"));
        assert!(!opts.help);
    }

    #[test]
    fn parses_all_outputs_and_seed() {
        let opts = parse_args_from(args(&[
            "--preset",
            "peak_tariff",
            "--seed",
            "7",
            "--schedule-out",
            "plan.csv",
            "--report-out",
            "cost.json",
        ]))
        .expect("parse should succeed");
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.preset.as_deref(), Some("peak_tariff"));
        assert!(opts.schedule_out.is_some());
        assert!(opts.report_out.is_some());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args_from(args(&["--seed", "-1"])).is_err());
        assert!(parse_args_from(args(&["--scenario"])).is_err());
        assert!(parse_args_from(args(&["--bogus"])).is_err());
        assert!(parse_args_from(args(&["--scenario", "a", "--preset", "b"])).is_err());
        assert!(parse_args_from(args(&["--preset", "a", "--preset", "b"])).is_err());
    }

    #[test]
    fn help_short_circuits() {
        let opts = parse_args_from(args(&["--help", "--bogus"])).expect("help should parse");
        assert!(opts.help);
    }
}
