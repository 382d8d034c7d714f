//! Year-level cost of appliance schedules.

use std::fmt;

use serde::Serialize;
use tracing::info;

use super::signal::TariffCurve;
use super::year_plan::YearPlan;
use crate::model::Appliance;

/// Aggregate cost and energy split of a set of year plans.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostReport {
    /// Tariff-weighted cost of every grid slot.
    pub total_cost: f64,
    /// Energy drawn from the grid (kWh).
    pub grid_energy_kwh: f64,
    /// Energy covered by solar (kWh).
    pub solar_energy_kwh: f64,
    /// What the solar-covered energy would have cost from the grid.
    pub avoided_cost: f64,
    /// Number of (day, slot) pairs drawing grid energy.
    pub grid_slots: usize,
    /// Number of (day, slot) pairs covered by solar.
    pub solar_slots: usize,
    /// Number of (appliance, day) pairs with any run.
    pub active_days: usize,
    /// Number of appliances evaluated.
    pub appliances: usize,
}

impl CostReport {
    /// Share of scheduled energy covered by solar, in percent.
    pub fn solar_share_pct(&self) -> f64 {
        let total = self.grid_energy_kwh + self.solar_energy_kwh;
        if total > 0.0 {
            100.0 * self.solar_energy_kwh / total
        } else {
            0.0
        }
    }
}

impl fmt::Display for CostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Cost Report ---")?;
        writeln!(f, "Appliances:            {}", self.appliances)?;
        writeln!(f, "Active days:           {}", self.active_days)?;
        writeln!(f, "Total cost:            {:.2}", self.total_cost)?;
        writeln!(
            f,
            "Grid energy:           {:.2} kWh ({} slots)",
            self.grid_energy_kwh, self.grid_slots
        )?;
        writeln!(
            f,
            "Solar energy:          {:.2} kWh ({} slots, {:.1}%)",
            self.solar_energy_kwh,
            self.solar_slots,
            self.solar_share_pct()
        )?;
        write!(f, "Avoided cost:          {:.2}", self.avoided_cost)
    }
}

/// Scores year plans against a tariff curve.
///
/// Each grid slot costs `tariff(day, slot) * power_kw * slot_hours`. Solar
/// slots cost nothing and are reported as avoided cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostEvaluator;

impl CostEvaluator {
    pub fn evaluate<'a>(
        &self,
        plans: impl IntoIterator<Item = (&'a Appliance, &'a YearPlan)>,
        tariff: &TariffCurve,
        slot_hours: f64,
    ) -> CostReport {
        let mut report = CostReport::default();

        for (appliance, plan) in plans {
            report.appliances += 1;
            let slot_kwh = appliance.power_kw * slot_hours;

            for schedule in plan.active_days() {
                report.active_days += 1;
                let day = schedule.day();

                for slot in schedule.grid_energy().iter_ones() {
                    report.grid_slots += 1;
                    report.grid_energy_kwh += slot_kwh;
                    report.total_cost += tariff.weight(day, slot) * slot_kwh;
                }
                for slot in schedule.non_grid_energy().iter_ones() {
                    report.solar_slots += 1;
                    report.solar_energy_kwh += slot_kwh;
                    report.avoided_cost += tariff.weight(day, slot) * slot_kwh;
                }
            }
        }

        info!(
            appliances = report.appliances,
            total_cost = report.total_cost,
            grid_kwh = report.grid_energy_kwh,
            solar_kwh = report.solar_energy_kwh,
            "evaluated cost"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::signal::DaySignal;
    use crate::plan::types::{PlanConfig, SlotRange};
    use crate::plan::window::TimeWindow;

    fn cfg() -> PlanConfig {
        PlanConfig::new(24, 10)
    }

    fn appliance(id: u32, power_kw: f64) -> Appliance {
        Appliance::new(id, 1, format!("a{id}"), power_kw)
    }

    #[test]
    fn idle_plans_cost_nothing() {
        let a = appliance(1, 2.0);
        let plan = YearPlan::initialize_for_appliance(1, cfg());
        let report = CostEvaluator.evaluate([(&a, &plan)], &TariffCurve::flat(&cfg(), 0.3), 1.0);
        assert_eq!(report.total_cost, 0.0);
        assert_eq!(report.appliances, 1);
        assert_eq!(report.active_days, 0);
    }

    #[test]
    fn grid_slots_are_tariff_weighted() {
        let a = appliance(1, 2.0);
        let mut plan = YearPlan::initialize_for_appliance(1, cfg());
        let w = TimeWindow::new(1, 3, SlotRange::new(0, 24), 3, &cfg()).unwrap();
        // Slot 0 covered, slots 1 and 2 from the grid.
        plan.apply_window(&w, &DaySignal::flat(24, 1.0).cover(SlotRange::new(0, 1)))
            .unwrap();

        let tariff = TariffCurve::flat(&cfg(), 0.5).with_day(3, &[0.5, 1.0, 2.0]);
        let report = CostEvaluator.evaluate([(&a, &plan)], &tariff, 1.0);

        assert!((report.total_cost - (1.0 + 2.0) * 2.0).abs() < 1e-12);
        assert!((report.avoided_cost - 0.5 * 2.0).abs() < 1e-12);
        assert_eq!(report.grid_slots, 2);
        assert_eq!(report.solar_slots, 1);
        assert!((report.grid_energy_kwh - 4.0).abs() < 1e-12);
        assert!((report.solar_energy_kwh - 2.0).abs() < 1e-12);
        assert_eq!(report.active_days, 1);
    }

    #[test]
    fn slot_hours_scales_energy() {
        let config = PlanConfig::new(96, 2);
        let a = appliance(1, 4.0);
        let mut plan = YearPlan::initialize_for_appliance(1, config);
        let w = TimeWindow::new(1, 1, SlotRange::new(0, 96), 4, &config).unwrap();
        plan.apply_window(&w, &DaySignal::flat(96, 1.0)).unwrap();

        let report = CostEvaluator.evaluate(
            [(&a, &plan)],
            &TariffCurve::flat(&config, 1.0),
            config.slot_hours,
        );
        assert!((report.grid_energy_kwh - 4.0).abs() < 1e-12);
        assert!((report.total_cost - 4.0).abs() < 1e-12);
    }

    #[test]
    fn display_has_header() {
        let text = CostReport::default().to_string();
        assert!(text.starts_with("--- Cost Report ---"));
        assert!(text.contains("Avoided cost"));
    }
}
