//! Builds a planner from a scenario and applies every configured window.

use std::thread;

use tracing::info;

use crate::config::{ApplianceConfig, HouseholdConfig, ScenarioConfig};
use crate::model::TwinWorld;
use crate::plan::cost::CostReport;
use crate::plan::error::Result;
use crate::planner::Planner;

/// Cost outcome of one twin world.
#[derive(Debug, Clone)]
pub struct TwinWorldReport {
    pub twin_world: TwinWorld,
    pub report: CostReport,
}

/// Result of a full scenario run.
#[derive(Debug)]
pub struct RunResult {
    /// The populated planner, for inspection and export.
    pub planner: Planner,
    /// One report per twin world, in id order.
    pub reports: Vec<TwinWorldReport>,
    /// Number of (appliance, day) windows applied.
    pub windows_applied: usize,
}

/// Registers every record of the scenario on a fresh planner.
///
/// The scenario must already be valid (see [`ScenarioConfig::validate`]).
///
/// # Errors
///
/// Returns the first registration error.
pub fn build_planner(config: &ScenarioConfig) -> Result<Planner> {
    let planner = Planner::new(
        config.plan_config(),
        config.signal_model(),
        config.plan.seed,
    );

    for tw in &config.twinworlds {
        planner.register_twin_world(tw.to_record())?;
        for h in &tw.households {
            planner.register_household(h.to_record(tw.id))?;
            for a in &h.appliances {
                planner.create_year_plan(a.to_record(h.id))?;
            }
        }
    }
    Ok(planner)
}

/// Runs a scenario: builds the planner, applies all windows, and evaluates
/// the cost of each twin world.
///
/// Households are independent, so each one is planned on its own scoped
/// thread. Appliances of a household draw on its solar in config order,
/// which keeps results independent of thread timing.
///
/// # Errors
///
/// Returns the first planning error, e.g. two recurring windows of one
/// appliance landing on the same day.
pub fn run_scenario(config: &ScenarioConfig) -> Result<RunResult> {
    let planner = build_planner(config)?;

    let households: Vec<&HouseholdConfig> = config
        .twinworlds
        .iter()
        .flat_map(|tw| &tw.households)
        .collect();

    let shared = &planner;
    let counts: Vec<Result<usize>> = thread::scope(|scope| {
        let handles: Vec<_> = households
            .iter()
            .map(|&household| scope.spawn(move || apply_household(shared, household)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });
    let mut windows_applied = 0;
    for count in counts {
        windows_applied += count?;
    }

    let mut reports = Vec::with_capacity(config.twinworlds.len());
    for twin_world in planner.twin_worlds() {
        let report = planner.evaluate_cost(twin_world.id)?;
        reports.push(TwinWorldReport { twin_world, report });
    }

    info!(
        twin_worlds = reports.len(),
        windows_applied, "scenario complete"
    );
    Ok(RunResult {
        planner,
        reports,
        windows_applied,
    })
}

fn apply_household(planner: &Planner, household: &HouseholdConfig) -> Result<usize> {
    let mut applied = 0;
    for appliance in &household.appliances {
        applied += apply_windows(planner, appliance)?;
    }
    Ok(applied)
}

fn apply_windows(planner: &Planner, appliance: &ApplianceConfig) -> Result<usize> {
    let mut applied = 0;
    for window in &appliance.windows {
        for day in window.days() {
            planner.apply_time_window(appliance.id, day, window.range(), window.duration)?;
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::plan::error::PlanError;

    fn small_scenario() -> ScenarioConfig {
        let mut cfg = ScenarioConfig::baseline();
        cfg.plan.days_in_year = 14;
        for tw in &mut cfg.twinworlds {
            for h in &mut tw.households {
                for a in &mut h.appliances {
                    a.windows = vec![WindowConfig::recurring(1, 14, 2, 8, 20, 2)];
                }
            }
        }
        cfg
    }

    #[test]
    fn same_scenario_and_seed_is_deterministic() {
        let mut cfg = small_scenario();
        cfg.solar.cloud_noise_std = 0.3;
        let a = run_scenario(&cfg).unwrap();
        let b = run_scenario(&cfg).unwrap();
        assert_eq!(a.windows_applied, 3 * 7);
        assert_eq!(a.reports[0].report, b.reports[0].report);
    }

    #[test]
    fn every_plan_is_valid_after_run() {
        let result = run_scenario(&small_scenario()).unwrap();
        for id in result.planner.appliance_ids() {
            assert!(result.planner.validate_all(id).unwrap());
        }
        assert_eq!(result.reports[0].report.active_days, 3 * 7);
    }

    #[test]
    fn household_solar_is_never_overdrawn() {
        let mut cfg = small_scenario();
        cfg.twinworlds[0].households[0].solar_panels = 12;
        let fresh = build_planner(&cfg).unwrap();
        let result = run_scenario(&cfg).unwrap();

        for household in result.planner.households() {
            for day in 1..=14 {
                let before = fresh.spare_solar(household.id, day).unwrap();
                let after = result.planner.spare_solar(household.id, day).unwrap();
                for (slot, (b, a)) in before.iter().zip(&after).enumerate() {
                    assert!(*a <= *b + 1e-9, "day {day} slot {slot} gained solar");
                    if *a < *b {
                        assert!(*a >= -1e-9, "day {day} slot {slot} overdrawn: {a}");
                    }
                }
            }
        }
    }

    #[test]
    fn overlapping_recurring_windows_conflict() {
        let mut cfg = small_scenario();
        cfg.twinworlds[0].households[0].appliances[0]
            .windows
            .push(WindowConfig::single(3, 0, 4, 1));
        assert!(matches!(
            run_scenario(&cfg),
            Err(PlanError::ConflictingWindow { appliance_id: 1, day: 3 })
        ));
    }
}
