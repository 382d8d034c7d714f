//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use twin_planner::model::{Appliance, Household, TwinWorld};
use twin_planner::plan::signal::{SignalModel, SolarProfile, TariffCurve};
use twin_planner::plan::types::PlanConfig;
use twin_planner::planner::Planner;

/// Hourly slots over a full year.
pub fn default_config() -> PlanConfig {
    PlanConfig::standard()
}

/// Flat 0.25/kWh tariff with the default solar profile.
pub fn default_signals(config: &PlanConfig) -> SignalModel {
    SignalModel::new(
        *config,
        TariffCurve::flat(config, 0.25),
        SolarProfile::default(),
    )
}

/// Planner with one twin world (id 1), a sunny household (id 10, 30
/// panels), a household without solar (id 20), and three appliances:
///
/// * 100: 2 kW washer in household 10
/// * 101: 0.5 kW dishwasher in household 10
/// * 200: 7 kW EV charger in household 20
pub fn default_planner() -> Planner {
    let config = default_config();
    let planner = Planner::new(config, default_signals(&config), 42);
    planner
        .register_twin_world(TwinWorld::new(1, "Test street", ""))
        .expect("twin world registers");
    planner
        .register_household(Household::new(10, 1, "Sunny", 3, 3000.0, 30))
        .expect("household registers");
    planner
        .register_household(Household::new(20, 1, "Shaded", 2, 2000.0, 0))
        .expect("household registers");
    for (id, household, power_kw) in [(100, 10, 2.0), (101, 10, 0.5), (200, 20, 7.0)] {
        planner
            .create_year_plan(Appliance::new(id, household, format!("appliance-{id}"), power_kw))
            .expect("year plan is created");
    }
    planner
}
