//! Household solar left over for scheduled appliances.

use std::ops::Range;

use super::bits::SlotBits;
use super::signal::{BASELOAD_SOLAR_SHARE, SolarCurve};
use super::types::Day;

/// Slack when comparing spare solar against an appliance's demand.
pub const ENERGY_EPSILON: f64 = 1e-9;

/// Spare solar of one household in every (day, slot), in kWh.
///
/// Starts as production minus the base load's solar share. A committed run
/// draws its covered slots from the budget and gives them back when it is
/// replaced or removed, so appliances of one household never share the
/// same kWh.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarBudget {
    slots_per_day: usize,
    spare: Vec<f64>,
}

impl SolarBudget {
    pub fn new(solar: &SolarCurve, baseload_kwh_per_slot: f64) -> Self {
        let reserved = BASELOAD_SOLAR_SHARE * baseload_kwh_per_slot;
        Self {
            slots_per_day: solar.slots_per_day(),
            spare: solar.as_slice().iter().map(|kwh| kwh - reserved).collect(),
        }
    }

    /// Spare solar of every slot of `day`; `None` outside the year.
    pub fn day(&self, day: Day) -> Option<&[f64]> {
        let range = self.day_range(day)?;
        self.spare.get(range)
    }

    /// Spare solar of `day` as it would be with `slots` given back at
    /// `kwh_per_slot` each.
    pub fn with_released(
        &self,
        day: Day,
        slots: &SlotBits,
        kwh_per_slot: f64,
    ) -> Option<Vec<f64>> {
        let mut values = self.day(day)?.to_vec();
        for slot in slots.iter_ones() {
            if let Some(value) = values.get_mut(slot) {
                *value += kwh_per_slot;
            }
        }
        Some(values)
    }

    /// Takes `kwh_per_slot` from every slot in `slots`. Days outside the
    /// year are ignored.
    pub fn draw(&mut self, day: Day, slots: &SlotBits, kwh_per_slot: f64) {
        self.adjust(day, slots, -kwh_per_slot);
    }

    /// Gives back what [`SolarBudget::draw`] took.
    pub fn release(&mut self, day: Day, slots: &SlotBits, kwh_per_slot: f64) {
        self.adjust(day, slots, kwh_per_slot);
    }

    fn adjust(&mut self, day: Day, slots: &SlotBits, delta: f64) {
        let Some(range) = self.day_range(day) else {
            return;
        };
        let Some(values) = self.spare.get_mut(range) else {
            return;
        };
        for slot in slots.iter_ones() {
            if let Some(value) = values.get_mut(slot) {
                *value += delta;
            }
        }
    }

    fn day_range(&self, day: Day) -> Option<Range<usize>> {
        let start = usize::from(day).checked_sub(1)? * self.slots_per_day;
        Some(start..start + self.slots_per_day)
    }
}
