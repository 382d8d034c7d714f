//! Core planning types: configuration, identifiers, and slot ranges.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Default number of slots per day (hourly resolution).
pub const DEFAULT_SLOTS_PER_DAY: usize = 24;

/// Number of days in a planning year.
pub const MAX_DAYS_IN_YEAR: u16 = 365;

/// Identifier of an appliance record.
pub type ApplianceId = u32;
/// Identifier of a household record.
pub type HouseholdId = u32;
/// Identifier of a twin-world record.
pub type TwinWorldId = u32;
/// Day of the year, 1-based.
pub type Day = u16;

/// Process-wide planning dimensions, passed explicitly to every component.
///
/// # Examples
///
/// ```
/// use twin_planner::plan::types::PlanConfig;
///
/// let cfg = PlanConfig::new(24, 365);
/// assert_eq!(cfg.slot_hours, 1.0);
/// assert!(cfg.contains_day(365));
/// assert!(!cfg.contains_day(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanConfig {
    /// Number of slots in one day.
    pub slots_per_day: usize,
    /// Number of days in the planning year.
    pub days_in_year: u16,
    /// Duration of one slot in hours, derived as `24.0 / slots_per_day`.
    pub slot_hours: f64,
}

impl PlanConfig {
    /// Creates a new planning configuration.
    ///
    /// # Panics
    ///
    /// Panics if `slots_per_day` or `days_in_year` is zero.
    pub fn new(slots_per_day: usize, days_in_year: u16) -> Self {
        assert!(slots_per_day > 0, "slots_per_day must be > 0");
        assert!(days_in_year > 0, "days_in_year must be > 0");
        Self {
            slots_per_day,
            days_in_year,
            slot_hours: 24.0 / slots_per_day as f64,
        }
    }

    /// Hourly slots over a 365-day year.
    pub fn standard() -> Self {
        Self::new(DEFAULT_SLOTS_PER_DAY, MAX_DAYS_IN_YEAR)
    }

    /// Returns `true` when `day` lies in `1..=days_in_year`.
    pub fn contains_day(&self, day: Day) -> bool {
        (1..=self.days_in_year).contains(&day)
    }

    /// Zero-based storage index of `day`, or `None` when out of range.
    pub fn day_index(&self, day: Day) -> Option<usize> {
        self.contains_day(day).then(|| usize::from(day) - 1)
    }

    /// Iterates all days of the year in order.
    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        1..=self.days_in_year
    }

    /// Total number of slots across the year.
    pub fn total_slots(&self) -> usize {
        self.slots_per_day * usize::from(self.days_in_year)
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Half-open slot interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlotRange {
    /// First admissible slot (inclusive).
    pub start: usize,
    /// End of the admissible slots (exclusive).
    pub end: usize,
}

impl SlotRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of slots spanned; zero for an empty or inverted range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, slot: usize) -> bool {
        slot >= self.start && slot < self.end
    }

    /// Returns `true` when the range lies inside a day of `slot_count` slots.
    pub fn fits_day(&self, slot_count: usize) -> bool {
        self.start <= self.end && self.end <= slot_count
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for SlotRange {
    fn from(r: Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_config_standard() {
        let cfg = PlanConfig::standard();
        assert_eq!(cfg.slots_per_day, 24);
        assert_eq!(cfg.days_in_year, 365);
        assert_eq!(cfg.slot_hours, 1.0);
        assert_eq!(cfg.total_slots(), 24 * 365);
    }

    #[test]
    fn plan_config_quarter_hours() {
        let cfg = PlanConfig::new(96, 7);
        assert_eq!(cfg.slot_hours, 0.25);
        assert_eq!(cfg.days().count(), 7);
    }

    #[test]
    fn day_index_bounds() {
        let cfg = PlanConfig::new(24, 10);
        assert_eq!(cfg.day_index(0), None);
        assert_eq!(cfg.day_index(1), Some(0));
        assert_eq!(cfg.day_index(10), Some(9));
        assert_eq!(cfg.day_index(11), None);
    }

    #[test]
    #[should_panic]
    fn plan_config_zero_slots_panics() {
        PlanConfig::new(0, 365);
    }

    #[test]
    #[should_panic]
    fn plan_config_zero_days_panics() {
        PlanConfig::new(24, 0);
    }

    #[test]
    fn slot_range_len_and_contains() {
        let r = SlotRange::new(8, 20);
        assert_eq!(r.len(), 12);
        assert!(r.contains(8));
        assert!(r.contains(19));
        assert!(!r.contains(20));
        assert!(r.fits_day(24));
        assert!(!SlotRange::new(8, 25).fits_day(24));
        assert!(SlotRange::new(5, 3).is_empty());
        assert_eq!(r.to_string(), "[8, 20)");
    }
}
