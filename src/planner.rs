//! Thread-safe planning service over twin worlds, households, and appliances.
//!
//! The [`Planner`] owns every appliance's [`YearPlan`] and [`WindowBook`].
//! Each appliance sits behind its own mutex, so changes to different
//! appliances run in parallel while changes to one appliance are
//! serialized. A mutation computes its new day schedule before touching any
//! state, so a rejected call leaves the plan and windows exactly as they
//! were.
//!
//! Appliances of one household share its [`SolarBudget`]. A mutation locks
//! the appliance first and the household budget second; no path takes them
//! in the other order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::model::{Appliance, Household, TwinWorld};
use crate::plan::cost::{CostEvaluator, CostReport};
use crate::plan::day_schedule::DaySchedule;
use crate::plan::error::{PlanError, Result};
use crate::plan::signal::{SignalModel, SolarCurve};
use crate::plan::solar_budget::SolarBudget;
use crate::plan::types::{ApplianceId, Day, HouseholdId, PlanConfig, SlotRange, TwinWorldId};
use crate::plan::window::{TimeWindow, WindowBook};
use crate::plan::year_plan::YearPlan;

/// Seed offset separating household solar noise streams from the master seed.
const SOLAR_SEED_OFFSET: u64 = 1_000;

#[derive(Debug)]
struct HouseholdEntry {
    household: Household,
    solar: Arc<SolarCurve>,
    budget: Arc<Mutex<SolarBudget>>,
}

#[derive(Debug)]
struct ApplianceEntry {
    appliance: Appliance,
    budget: Arc<Mutex<SolarBudget>>,
    plan: YearPlan,
    windows: WindowBook,
}

/// Planning service shared between callers.
#[derive(Debug)]
pub struct Planner {
    config: PlanConfig,
    signals: SignalModel,
    seed: u64,
    twin_worlds: RwLock<BTreeMap<TwinWorldId, TwinWorld>>,
    households: RwLock<BTreeMap<HouseholdId, HouseholdEntry>>,
    appliances: RwLock<BTreeMap<ApplianceId, Arc<Mutex<ApplianceEntry>>>>,
}

impl Planner {
    /// Creates an empty planner. `seed` drives the solar cloud noise of
    /// every registered household.
    pub fn new(config: PlanConfig, signals: SignalModel, seed: u64) -> Self {
        Self {
            config,
            signals,
            seed,
            twin_worlds: RwLock::new(BTreeMap::new()),
            households: RwLock::new(BTreeMap::new()),
            appliances: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn signals(&self) -> &SignalModel {
        &self.signals
    }

    /// # Errors
    ///
    /// `DuplicateRecord` if the id is taken.
    pub fn register_twin_world(&self, twin_world: TwinWorld) -> Result<()> {
        let mut worlds = self.twin_worlds.write();
        if worlds.contains_key(&twin_world.id) {
            return Err(PlanError::DuplicateRecord(format!(
                "twin world {}",
                twin_world.id
            )));
        }
        info!(twinworld_id = twin_world.id, name = %twin_world.name, "registered twin world");
        worlds.insert(twin_world.id, twin_world);
        Ok(())
    }

    /// Registers a household and derives its solar curve.
    ///
    /// # Errors
    ///
    /// * `NotFound` if its twin world is not registered.
    /// * `DuplicateRecord` if the id is taken.
    pub fn register_household(&self, household: Household) -> Result<()> {
        if !self.twin_worlds.read().contains_key(&household.twinworld_id) {
            return Err(PlanError::NotFound(format!(
                "twin world {} for household {}",
                household.twinworld_id, household.id
            )));
        }

        let mut households = self.households.write();
        if households.contains_key(&household.id) {
            return Err(PlanError::DuplicateRecord(format!(
                "household {}",
                household.id
            )));
        }

        let seed = self
            .seed
            .wrapping_add(SOLAR_SEED_OFFSET)
            .wrapping_add(u64::from(household.id));
        let solar = Arc::new(
            self.signals
                .solar_curve(household.solar_yield_yearly, seed),
        );
        let baseload_kwh_per_slot = household.energy_usage / self.config.total_slots() as f64;
        let budget = Arc::new(Mutex::new(SolarBudget::new(&solar, baseload_kwh_per_slot)));

        info!(
            household_id = household.id,
            twinworld_id = household.twinworld_id,
            solar_kwh = household.solar_yield_yearly,
            "registered household"
        );
        households.insert(
            household.id,
            HouseholdEntry {
                household,
                solar,
                budget,
            },
        );
        Ok(())
    }

    /// Creates the appliance's year plan with every day idle. Called once
    /// per appliance.
    ///
    /// # Errors
    ///
    /// * `NotFound` if its household is not registered.
    /// * `DuplicateRecord` if the appliance already has a plan.
    pub fn create_year_plan(&self, appliance: Appliance) -> Result<()> {
        let budget = {
            let households = self.households.read();
            let entry = households.get(&appliance.household_id).ok_or_else(|| {
                PlanError::NotFound(format!(
                    "household {} for appliance {}",
                    appliance.household_id, appliance.id
                ))
            })?;
            Arc::clone(&entry.budget)
        };

        let mut appliances = self.appliances.write();
        if appliances.contains_key(&appliance.id) {
            return Err(PlanError::DuplicateRecord(format!(
                "year plan for appliance {}",
                appliance.id
            )));
        }

        let plan = YearPlan::initialize_for_appliance(appliance.id, self.config);
        let windows = WindowBook::new(appliance.id);
        appliances.insert(
            appliance.id,
            Arc::new(Mutex::new(ApplianceEntry {
                appliance,
                budget,
                plan,
                windows,
            })),
        );
        Ok(())
    }

    /// Adds a time window and schedules its day.
    ///
    /// # Errors
    ///
    /// * `NotFound` for an unknown appliance or a day outside the year.
    /// * `ConflictingWindow` if the day already has a window.
    /// * `InfeasibleWindow` if the run cannot fit the range.
    pub fn apply_time_window(
        &self,
        appliance_id: ApplianceId,
        day: Day,
        range: SlotRange,
        duration: usize,
    ) -> Result<DaySchedule> {
        self.with_entry(appliance_id, |entry| {
            let window = entry.windows.prepare(day, range, duration, &self.config)?;
            self.commit(entry, window)
        })
        .inspect_err(|err| warn!(appliance_id, day, %err, "time window rejected"))
    }

    /// Replaces the time window of a day and reschedules it.
    ///
    /// # Errors
    ///
    /// * `NotFound` for an unknown appliance or a day without a window.
    /// * `InfeasibleWindow` if the run cannot fit the new range.
    pub fn update_time_window(
        &self,
        appliance_id: ApplianceId,
        day: Day,
        range: SlotRange,
        duration: usize,
    ) -> Result<DaySchedule> {
        self.with_entry(appliance_id, |entry| {
            let window = entry
                .windows
                .prepare_update(day, range, duration, &self.config)?;
            self.commit(entry, window)
        })
        .inspect_err(|err| warn!(appliance_id, day, %err, "time window update rejected"))
    }

    /// Removes the time window of a day; the day becomes idle and its
    /// solar goes back to the household.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown appliance or a day without a window.
    pub fn remove_time_window(&self, appliance_id: ApplianceId, day: Day) -> Result<TimeWindow> {
        self.with_entry(appliance_id, |entry| {
            if !entry.windows.contains(day) {
                return Err(PlanError::NotFound(format!(
                    "no time window for appliance {appliance_id} on day {day}"
                )));
            }
            let demand = self.signals.slot_demand(entry.appliance.power_kw);
            let mut budget = entry.budget.lock();
            let previous = entry.plan.clear_window(day)?;
            budget.release(day, previous.non_grid_energy(), demand);
            entry.windows.remove(day)
        })
        .inspect_err(|err| warn!(appliance_id, day, %err, "time window removal rejected"))
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown appliance or a day outside the year.
    pub fn get_day_schedule(&self, appliance_id: ApplianceId, day: Day) -> Result<DaySchedule> {
        self.with_entry(appliance_id, |entry| entry.plan.get(day).cloned())
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown appliance.
    pub fn time_window(&self, appliance_id: ApplianceId, day: Day) -> Result<Option<TimeWindow>> {
        self.with_entry(appliance_id, |entry| Ok(entry.windows.get(day).copied()))
    }

    /// Snapshot of the appliance's year plan.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown appliance.
    pub fn year_plan(&self, appliance_id: ApplianceId) -> Result<YearPlan> {
        self.with_entry(appliance_id, |entry| Ok(entry.plan.clone()))
    }

    /// Checks every day of the appliance's plan against its windows.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown appliance.
    pub fn validate_all(&self, appliance_id: ApplianceId) -> Result<bool> {
        self.with_entry(appliance_id, |entry| {
            Ok(entry.plan.validate_all(&entry.windows))
        })
    }

    /// Recomputes every day of the appliance's plan from its windows and
    /// returns the number of days that run.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown appliance, or any scheduling error; the
    /// plan is unchanged on error.
    pub fn reschedule(&self, appliance_id: ApplianceId) -> Result<usize> {
        self.with_entry(appliance_id, |entry| {
            let power_kw = entry.appliance.power_kw;
            let demand = self.signals.slot_demand(power_kw);
            let mut budget = entry.budget.lock();
            let previous = entry.plan.clone();

            let scheduled = {
                let spare: &SolarBudget = &budget;
                let signals = |day: Day| {
                    let current = previous.get(day).ok()?;
                    let available = spare.with_released(day, current.non_grid_energy(), demand)?;
                    self.signals.day_signal(&available, power_kw, day)
                };
                entry.plan.reschedule_all(&entry.windows, &signals)?
            };

            for (old, new) in previous.iter().zip(entry.plan.iter()) {
                budget.release(old.day(), old.non_grid_energy(), demand);
                budget.draw(new.day(), new.non_grid_energy(), demand);
            }
            Ok(scheduled)
        })
    }

    /// Total cost of every appliance in the twin world.
    ///
    /// All of the twin world's appliances are locked together, in id order,
    /// so the report reflects a single consistent state.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown twin world.
    pub fn evaluate_cost(&self, twinworld_id: TwinWorldId) -> Result<CostReport> {
        let entries = self.twin_world_entries(twinworld_id)?;
        let guards: Vec<_> = entries.iter().map(|entry| entry.lock()).collect();
        let report = CostEvaluator.evaluate(
            guards.iter().map(|entry| (&entry.appliance, &entry.plan)),
            self.signals.tariff(),
            self.config.slot_hours,
        );
        info!(twinworld_id, total_cost = report.total_cost, "twin world cost");
        Ok(report)
    }

    /// Snapshots of every appliance and plan in the twin world, in id order.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown twin world.
    pub fn plans_for(&self, twinworld_id: TwinWorldId) -> Result<Vec<(Appliance, YearPlan)>> {
        let entries = self.twin_world_entries(twinworld_id)?;
        let guards: Vec<_> = entries.iter().map(|entry| entry.lock()).collect();
        Ok(guards
            .iter()
            .map(|entry| (entry.appliance.clone(), entry.plan.clone()))
            .collect())
    }

    pub fn twin_worlds(&self) -> Vec<TwinWorld> {
        self.twin_worlds.read().values().cloned().collect()
    }

    pub fn households(&self) -> Vec<Household> {
        self.households
            .read()
            .values()
            .map(|entry| entry.household.clone())
            .collect()
    }

    pub fn appliance_ids(&self) -> Vec<ApplianceId> {
        self.appliances.read().keys().copied().collect()
    }

    /// Solar production curve of a household.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown household.
    pub fn household_solar(&self, household_id: HouseholdId) -> Result<Arc<SolarCurve>> {
        self.households
            .read()
            .get(&household_id)
            .map(|entry| Arc::clone(&entry.solar))
            .ok_or_else(|| PlanError::NotFound(format!("household {household_id}")))
    }

    /// Solar a household has left on `day` after base load and every
    /// committed run, per slot.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown household or a day outside the year.
    pub fn spare_solar(&self, household_id: HouseholdId, day: Day) -> Result<Vec<f64>> {
        let budget = self
            .households
            .read()
            .get(&household_id)
            .map(|entry| Arc::clone(&entry.budget))
            .ok_or_else(|| PlanError::NotFound(format!("household {household_id}")))?;
        let spare = budget.lock().day(day).map(<[f64]>::to_vec);
        spare.ok_or_else(|| PlanError::NotFound(format!("day {day} outside the year")))
    }

    /// Runs `f` with the appliance locked.
    fn with_entry<T>(
        &self,
        appliance_id: ApplianceId,
        f: impl FnOnce(&mut ApplianceEntry) -> Result<T>,
    ) -> Result<T> {
        let entry = self
            .appliances
            .read()
            .get(&appliance_id)
            .cloned()
            .ok_or_else(|| PlanError::NotFound(format!("appliance {appliance_id}")))?;
        let mut guard = entry.lock();
        f(&mut guard)
    }

    /// Schedules `window` against the household's spare solar, then stores
    /// the schedule and the window and moves the day's solar draw from the
    /// old run to the new one.
    fn commit(&self, entry: &mut ApplianceEntry, window: TimeWindow) -> Result<DaySchedule> {
        let day = window.day;
        let power_kw = entry.appliance.power_kw;
        let demand = self.signals.slot_demand(power_kw);
        let mut budget = entry.budget.lock();

        let previous = entry.plan.get(day)?.non_grid_energy().clone();
        let signal = budget
            .with_released(day, &previous, demand)
            .and_then(|spare| self.signals.day_signal(&spare, power_kw, day))
            .ok_or_else(|| PlanError::NotFound(format!("no signal for day {day}")))?;
        let schedule = entry.plan.compute(&window, &signal)?;
        entry.plan.replace(schedule.clone())?;

        budget.release(day, &previous, demand);
        budget.draw(day, schedule.non_grid_energy(), demand);
        entry.windows.commit(window);
        Ok(schedule)
    }

    fn twin_world_entries(
        &self,
        twinworld_id: TwinWorldId,
    ) -> Result<Vec<Arc<Mutex<ApplianceEntry>>>> {
        if !self.twin_worlds.read().contains_key(&twinworld_id) {
            return Err(PlanError::NotFound(format!("twin world {twinworld_id}")));
        }
        let households: BTreeSet<HouseholdId> = self
            .households
            .read()
            .values()
            .filter(|entry| entry.household.twinworld_id == twinworld_id)
            .map(|entry| entry.household.id)
            .collect();

        // BTreeMap order gives a fixed lock order across callers.
        Ok(self
            .appliances
            .read()
            .values()
            .filter(|entry| households.contains(&entry.lock().appliance.household_id))
            .cloned()
            .collect())
    }
}
