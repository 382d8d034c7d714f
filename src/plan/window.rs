//! Time windows constraining a day's run, and the per-appliance window book.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::error::{PlanError, Result};
use super::types::{ApplianceId, Day, PlanConfig, SlotRange};

/// Allowed slot range and required run length for one appliance on one day.
///
/// Every active slot of the day's schedule must lie in `range`, and exactly
/// `duration` slots must be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub appliance_id: ApplianceId,
    pub day: Day,
    pub range: SlotRange,
    pub duration: usize,
}

impl TimeWindow {
    /// Creates a window after checking it against the planning dimensions.
    ///
    /// # Errors
    ///
    /// * `NotFound` if `day` is outside the planning year.
    /// * `InfeasibleWindow` if the run cannot fit the range (see
    ///   [`TimeWindow::check_feasible`]).
    pub fn new(
        appliance_id: ApplianceId,
        day: Day,
        range: SlotRange,
        duration: usize,
        config: &PlanConfig,
    ) -> Result<Self> {
        if !config.contains_day(day) {
            return Err(PlanError::NotFound(format!(
                "day {day} outside 1..={}",
                config.days_in_year
            )));
        }
        let window = Self {
            appliance_id,
            day,
            range,
            duration,
        };
        window.check_feasible(config.slots_per_day)?;
        Ok(window)
    }

    /// Checks that a `duration`-slot run fits the range inside a day of
    /// `slot_count` slots. Zero-length runs are rejected.
    ///
    /// # Errors
    ///
    /// `InfeasibleWindow` when the check fails.
    pub fn check_feasible(&self, slot_count: usize) -> Result<()> {
        if self.duration == 0 || !self.range.fits_day(slot_count) || self.duration > self.range.len()
        {
            return Err(PlanError::InfeasibleWindow {
                range: self.range,
                duration: self.duration,
                slot_count,
            });
        }
        Ok(())
    }

    /// Start slots at which a contiguous run stays inside the range.
    pub fn candidate_starts(&self) -> RangeInclusive<usize> {
        self.range.start..=self.range.end.saturating_sub(self.duration)
    }
}

/// The time windows of one appliance, at most one per day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowBook {
    appliance_id: ApplianceId,
    windows: BTreeMap<Day, TimeWindow>,
}

impl WindowBook {
    pub fn new(appliance_id: ApplianceId) -> Self {
        Self {
            appliance_id,
            windows: BTreeMap::new(),
        }
    }

    /// Builds a new window for a vacant day without recording it.
    ///
    /// The vacancy check runs first, so a second window on a taken day is
    /// always a conflict whatever its parameters.
    ///
    /// # Errors
    ///
    /// `ConflictingWindow`, then the errors of [`TimeWindow::new`].
    pub fn prepare(
        &self,
        day: Day,
        range: SlotRange,
        duration: usize,
        config: &PlanConfig,
    ) -> Result<TimeWindow> {
        if self.windows.contains_key(&day) {
            return Err(PlanError::ConflictingWindow {
                appliance_id: self.appliance_id,
                day,
            });
        }
        TimeWindow::new(self.appliance_id, day, range, duration, config)
    }

    /// Builds a replacement window for a day that already has one.
    ///
    /// # Errors
    ///
    /// `NotFound` if the day has no window, then the errors of
    /// [`TimeWindow::new`].
    pub fn prepare_update(
        &self,
        day: Day,
        range: SlotRange,
        duration: usize,
        config: &PlanConfig,
    ) -> Result<TimeWindow> {
        if !self.windows.contains_key(&day) {
            return Err(self.missing(day));
        }
        TimeWindow::new(self.appliance_id, day, range, duration, config)
    }

    /// Records `window`, returning the one it replaced.
    pub fn commit(&mut self, window: TimeWindow) -> Option<TimeWindow> {
        self.windows.insert(window.day, window)
    }

    /// Creates and records a window in one step.
    ///
    /// # Errors
    ///
    /// Same as [`WindowBook::prepare`].
    pub fn create(
        &mut self,
        day: Day,
        range: SlotRange,
        duration: usize,
        config: &PlanConfig,
    ) -> Result<TimeWindow> {
        let window = self.prepare(day, range, duration, config)?;
        self.commit(window);
        Ok(window)
    }

    /// Removes and returns the window of `day`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the day has no window.
    pub fn remove(&mut self, day: Day) -> Result<TimeWindow> {
        self.windows.remove(&day).ok_or_else(|| self.missing(day))
    }

    pub fn get(&self, day: Day) -> Option<&TimeWindow> {
        self.windows.get(&day)
    }

    pub fn contains(&self, day: Day) -> bool {
        self.windows.contains_key(&day)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeWindow> {
        self.windows.values()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn appliance_id(&self) -> ApplianceId {
        self.appliance_id
    }

    fn missing(&self, day: Day) -> PlanError {
        PlanError::NotFound(format!(
            "no time window for appliance {} on day {day}",
            self.appliance_id
        ))
    }
}
