//! The full year of day schedules for one appliance.

use std::mem;
use std::num::NonZeroUsize;
use std::thread;

use tracing::{debug, info};

use super::day_schedule::DaySchedule;
use super::error::{PlanError, Result};
use super::scheduler::Scheduler;
use super::signal::DaySignal;
use super::types::{ApplianceId, Day, PlanConfig};
use super::window::{TimeWindow, WindowBook};

/// Ordered day schedules `1..=days_in_year` for a single appliance.
///
/// Schedules change only through [`YearPlan::apply_window`],
/// [`YearPlan::clear_window`], [`YearPlan::replace`] and
/// [`YearPlan::reschedule_all`]. Each replaces whole days, so a reader never
/// sees a partially written day.
#[derive(Debug, Clone, PartialEq)]
pub struct YearPlan {
    appliance_id: ApplianceId,
    config: PlanConfig,
    days: Vec<DaySchedule>,
}

impl YearPlan {
    /// Creates a plan with every day idle.
    pub fn initialize_for_appliance(appliance_id: ApplianceId, config: PlanConfig) -> Self {
        let mut plan = Self {
            appliance_id,
            config,
            days: Vec::with_capacity(usize::from(config.days_in_year)),
        };
        let created = plan.ensure_initialized();
        info!(appliance_id, days = created, "initialized year plan");
        plan
    }

    /// Appends idle schedules for any missing days and returns how many were
    /// added. Existing days are left alone, so calling it again is a no-op.
    pub fn ensure_initialized(&mut self) -> usize {
        let before = self.days.len();
        for day in self.config.days().skip(before) {
            self.days.push(DaySchedule::initialize(
                self.appliance_id,
                day,
                self.config.slots_per_day,
            ));
        }
        self.days.len() - before
    }

    pub fn appliance_id(&self) -> ApplianceId {
        self.appliance_id
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Schedule of `day`.
    ///
    /// # Errors
    ///
    /// `NotFound` if `day` is outside `1..=days_in_year`.
    pub fn get(&self, day: Day) -> Result<&DaySchedule> {
        self.config
            .day_index(day)
            .and_then(|index| self.days.get(index))
            .ok_or_else(|| self.missing_day(day))
    }

    /// Schedules the window's day against `signal`, leaving every other day
    /// untouched, and returns the schedule it replaced.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the window belongs to another appliance or day is
    ///   outside the year.
    /// * `InvalidAssignment` if the signal length is not the slot count.
    /// * `InfeasibleWindow` from the scheduler.
    ///
    /// On error the plan is unchanged.
    pub fn apply_window(&mut self, window: &TimeWindow, signal: &DaySignal) -> Result<DaySchedule> {
        let schedule = self.compute(window, signal)?;
        self.replace(schedule)
    }

    /// Computes the schedule `apply_window` would store, without storing it.
    ///
    /// # Errors
    ///
    /// Same as [`YearPlan::apply_window`].
    pub fn compute(&self, window: &TimeWindow, signal: &DaySignal) -> Result<DaySchedule> {
        if window.appliance_id != self.appliance_id {
            return Err(PlanError::NotFound(format!(
                "window for appliance {} applied to plan of appliance {}",
                window.appliance_id, self.appliance_id
            )));
        }
        self.get(window.day)?;
        if signal.len() != self.config.slots_per_day {
            return Err(PlanError::InvalidAssignment(format!(
                "signal has {} slots, day has {}",
                signal.len(),
                self.config.slots_per_day
            )));
        }
        Scheduler.schedule(window, signal)
    }

    /// Reverts `day` to idle and returns the schedule it replaced.
    ///
    /// # Errors
    ///
    /// `NotFound` if `day` is outside the year.
    pub fn clear_window(&mut self, day: Day) -> Result<DaySchedule> {
        self.replace(DaySchedule::initialize(
            self.appliance_id,
            day,
            self.config.slots_per_day,
        ))
    }

    /// Swaps in `schedule` for its day and returns the previous one. Only
    /// scheduler output and idle days are stored through here.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the schedule's day is outside the year.
    /// * `InvalidAssignment` if it belongs to another appliance or has the
    ///   wrong slot count.
    pub(crate) fn replace(&mut self, schedule: DaySchedule) -> Result<DaySchedule> {
        if schedule.appliance_id() != self.appliance_id
            || schedule.slot_count() != self.config.slots_per_day
        {
            return Err(PlanError::InvalidAssignment(format!(
                "schedule for appliance {} with {} slots does not belong to plan of appliance {}",
                schedule.appliance_id(),
                schedule.slot_count(),
                self.appliance_id
            )));
        }
        let day = schedule.day();
        let slot = self
            .config
            .day_index(day)
            .and_then(|index| self.days.get_mut(index))
            .ok_or_else(|| PlanError::NotFound(format!("day {day} outside the year")))?;
        Ok(mem::replace(slot, schedule))
    }

    /// Returns `true` when every day satisfies its window, or is idle when
    /// it has none.
    pub fn validate_all(&self, windows: &WindowBook) -> bool {
        self.days
            .iter()
            .all(|schedule| schedule.validate(windows.get(schedule.day())))
    }

    /// Days whose schedule does not satisfy its window.
    pub fn invalid_days(&self, windows: &WindowBook) -> Vec<Day> {
        self.days
            .iter()
            .filter(|schedule| !schedule.validate(windows.get(schedule.day())))
            .map(DaySchedule::day)
            .collect()
    }

    /// Recomputes every day from its window, in parallel.
    ///
    /// Days with a window are scheduled against `signals(day)`; days without
    /// one become idle. Days are split into contiguous chunks, one scoped
    /// thread per chunk. Nothing is stored unless every day succeeds.
    ///
    /// # Errors
    ///
    /// * `NotFound` if `signals` yields no signal for a windowed day.
    /// * Any error of [`YearPlan::compute`]; the first failing day is
    ///   reported.
    pub fn reschedule_all<F>(&mut self, windows: &WindowBook, signals: &F) -> Result<usize>
    where
        F: Fn(Day) -> Option<DaySignal> + Sync,
    {
        let days: Vec<Day> = self.config.days().collect();
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .min(days.len())
            .max(1);
        let chunk_len = days.len().div_ceil(workers).max(1);

        let this = &*self;
        let chunks: Vec<Result<Vec<DaySchedule>>> = thread::scope(|scope| {
            let handles: Vec<_> = days
                .chunks(chunk_len)
                .map(|chunk| scope.spawn(move || this.compute_chunk(chunk, windows, signals)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(PlanError::InvalidAssignment(
                            "scheduling worker panicked".to_string(),
                        ))
                    })
                })
                .collect()
        });

        let mut computed = Vec::with_capacity(days.len());
        for chunk in chunks {
            computed.extend(chunk?);
        }

        let scheduled = computed.iter().filter(|s| !s.is_idle()).count();
        self.days = computed;
        debug!(
            appliance_id = self.appliance_id,
            workers, scheduled, "rescheduled year plan"
        );
        Ok(scheduled)
    }

    fn compute_chunk<F>(
        &self,
        days: &[Day],
        windows: &WindowBook,
        signals: &F,
    ) -> Result<Vec<DaySchedule>>
    where
        F: Fn(Day) -> Option<DaySignal> + Sync,
    {
        days.iter()
            .map(|&day| match windows.get(day) {
                None => Ok(DaySchedule::initialize(
                    self.appliance_id,
                    day,
                    self.config.slots_per_day,
                )),
                Some(window) => {
                    let signal = signals(day).ok_or_else(|| {
                        PlanError::NotFound(format!("no signal for day {day}"))
                    })?;
                    self.compute(window, &signal)
                }
            })
            .collect()
    }

    /// Iterates day schedules in day order.
    pub fn iter(&self) -> impl Iterator<Item = &DaySchedule> {
        self.days.iter()
    }

    /// Iterates the schedules of days on which the appliance runs.
    pub fn active_days(&self) -> impl Iterator<Item = &DaySchedule> {
        self.days.iter().filter(|schedule| !schedule.is_idle())
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    fn missing_day(&self, day: Day) -> PlanError {
        PlanError::NotFound(format!(
            "day {day} outside 1..={} for appliance {}",
            self.config.days_in_year, self.appliance_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::types::SlotRange;

    fn cfg() -> PlanConfig {
        PlanConfig::new(24, 30)
    }

    #[test]
    fn fresh_plan_is_idle_every_day() {
        let plan = YearPlan::initialize_for_appliance(4, PlanConfig::standard());
        assert_eq!(plan.len(), 365);
        assert!(plan.iter().all(DaySchedule::is_idle));
        assert_eq!(plan.get(1).unwrap().day(), 1);
        assert_eq!(plan.get(365).unwrap().day(), 365);
        assert!(plan.validate_all(&WindowBook::new(4)));
    }

    #[test]
    fn ensure_initialized_is_idempotent() {
        let mut plan = YearPlan::initialize_for_appliance(4, cfg());
        assert_eq!(plan.ensure_initialized(), 0);
        assert_eq!(plan.len(), 30);
    }

    #[test]
    fn get_outside_year_is_not_found() {
        let plan = YearPlan::initialize_for_appliance(4, cfg());
        assert!(matches!(plan.get(0), Err(PlanError::NotFound(_))));
        assert!(matches!(plan.get(31), Err(PlanError::NotFound(_))));
    }

    #[test]
    fn apply_then_clear_restores_original() {
        let original = YearPlan::initialize_for_appliance(4, cfg());
        let mut plan = original.clone();
        let w = TimeWindow::new(4, 10, SlotRange::new(8, 20), 4, &cfg()).unwrap();
        plan.apply_window(&w, &DaySignal::flat(24, 1.0)).unwrap();

        assert_eq!(plan.get(10).unwrap().active().count_ones(), 4);
        assert!(plan.get(9).unwrap().is_idle());
        assert!(plan.get(11).unwrap().is_idle());

        let previous = plan.clear_window(10).unwrap();
        assert!(!previous.is_idle());
        assert_eq!(plan, original);
    }

    #[test]
    fn failed_apply_leaves_plan_unchanged() {
        let mut plan = YearPlan::initialize_for_appliance(4, cfg());
        let w = TimeWindow::new(4, 3, SlotRange::new(0, 4), 2, &cfg()).unwrap();
        plan.apply_window(&w, &DaySignal::flat(24, 1.0)).unwrap();
        let before = plan.clone();

        let err = plan.apply_window(&w, &DaySignal::flat(12, 1.0));
        assert!(matches!(err, Err(PlanError::InvalidAssignment(_))));

        let foreign = TimeWindow::new(5, 3, SlotRange::new(0, 4), 2, &cfg()).unwrap();
        assert!(matches!(
            plan.apply_window(&foreign, &DaySignal::flat(24, 1.0)),
            Err(PlanError::NotFound(_))
        ));
        assert_eq!(plan, before);
    }

    #[test]
    fn replace_rejects_foreign_schedules() {
        let mut plan = YearPlan::initialize_for_appliance(4, cfg());
        let before = plan.clone();
        for schedule in [
            DaySchedule::initialize(5, 2, 24),
            DaySchedule::initialize(4, 2, 12),
        ] {
            assert!(matches!(
                plan.replace(schedule),
                Err(PlanError::InvalidAssignment(_))
            ));
        }
        assert!(matches!(
            plan.replace(DaySchedule::initialize(4, 31, 24)),
            Err(PlanError::NotFound(_))
        ));
        assert_eq!(plan, before);
    }

    #[test]
    fn validate_all_flags_days_without_matching_window() {
        let mut plan = YearPlan::initialize_for_appliance(4, cfg());
        let mut windows = WindowBook::new(4);
        let w = windows.create(5, SlotRange::new(8, 20), 3, &cfg()).unwrap();
        assert_eq!(plan.invalid_days(&windows), vec![5]);

        plan.apply_window(&w, &DaySignal::flat(24, 1.0)).unwrap();
        assert!(plan.validate_all(&windows));

        windows.remove(5).unwrap();
        assert_eq!(plan.invalid_days(&windows), vec![5]);
    }

    #[test]
    fn reschedule_all_matches_sequential_application() {
        let config = cfg();
        let mut windows = WindowBook::new(4);
        for day in [1, 7, 15, 30] {
            windows
                .create(day, SlotRange::new(6, 22), 3, &config)
                .unwrap();
        }
        let signals = |day: Day| {
            Some(DaySignal::flat(24, 1.0).cover(SlotRange::new(usize::from(day % 12), 24)))
        };

        let mut sequential = YearPlan::initialize_for_appliance(4, config);
        for w in windows.iter() {
            sequential.apply_window(w, &signals(w.day).unwrap()).unwrap();
        }

        let mut parallel = YearPlan::initialize_for_appliance(4, config);
        let scheduled = parallel.reschedule_all(&windows, &signals).unwrap();
        assert_eq!(scheduled, 4);
        assert_eq!(parallel, sequential);
        assert!(parallel.validate_all(&windows));
    }

    #[test]
    fn reschedule_all_is_all_or_nothing() {
        let config = cfg();
        let mut windows = WindowBook::new(4);
        windows.create(2, SlotRange::new(0, 4), 1, &config).unwrap();
        windows.create(20, SlotRange::new(0, 4), 1, &config).unwrap();

        let mut plan = YearPlan::initialize_for_appliance(4, config);
        let before = plan.clone();
        let signals = |day: Day| (day != 20).then(|| DaySignal::flat(24, 1.0));
        assert!(matches!(
            plan.reschedule_all(&windows, &signals),
            Err(PlanError::NotFound(_))
        ));
        assert_eq!(plan, before);
    }
}
