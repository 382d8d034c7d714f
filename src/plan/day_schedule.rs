//! Per-appliance, per-day run bitmaps.

use super::bits::SlotBits;
use super::error::{PlanError, Result};
use super::types::{ApplianceId, Day};
use super::window::TimeWindow;

/// Which slots an appliance runs on one day, split by energy source.
///
/// `energy` marks slots where the run draws from the grid, `no_energy`
/// marks slots covered by an alternate source. The two are always disjoint
/// and of equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    appliance_id: ApplianceId,
    day: Day,
    energy: SlotBits,
    no_energy: SlotBits,
}

impl DaySchedule {
    /// All-zero schedule: the appliance does not run on `day`.
    pub fn initialize(appliance_id: ApplianceId, day: Day, slot_count: usize) -> Self {
        Self {
            appliance_id,
            day,
            energy: SlotBits::zeros(slot_count),
            no_energy: SlotBits::zeros(slot_count),
        }
    }

    /// Builds a schedule from its two bitmaps.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` if the lengths differ or the bitmaps overlap.
    pub fn from_parts(
        appliance_id: ApplianceId,
        day: Day,
        energy: SlotBits,
        no_energy: SlotBits,
    ) -> Result<Self> {
        if energy.len() != no_energy.len() {
            return Err(PlanError::InvalidAssignment(format!(
                "bitmap lengths differ ({} vs {})",
                energy.len(),
                no_energy.len()
            )));
        }
        if !energy.is_disjoint(&no_energy) {
            return Err(PlanError::InvalidAssignment(format!(
                "grid and non-grid slots overlap at {:?}",
                energy.intersection(&no_energy).iter_ones().collect::<Vec<_>>()
            )));
        }
        Ok(Self {
            appliance_id,
            day,
            energy,
            no_energy,
        })
    }

    /// Decodes the storage form: two integers with bit `i` = slot `i`.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` if either integer does not fit `slot_count` slots
    /// or the two overlap.
    pub fn from_storage(
        appliance_id: ApplianceId,
        day: Day,
        slot_count: usize,
        energy: u64,
        no_energy: u64,
    ) -> Result<Self> {
        let decode = |value: u64, name: &str| {
            SlotBits::from_u64(value, slot_count).ok_or_else(|| {
                PlanError::InvalidAssignment(format!(
                    "{name} bitmap {value:#x} does not fit {slot_count} slots"
                ))
            })
        };
        Self::from_parts(
            appliance_id,
            day,
            decode(energy, "energy")?,
            decode(no_energy, "no_energy")?,
        )
    }

    /// Encodes as `(energy, no_energy)` integers, or `None` past 64 slots.
    pub fn to_storage(&self) -> Option<(u64, u64)> {
        Some((self.energy.to_u64()?, self.no_energy.to_u64()?))
    }

    /// Returns a new schedule for the same appliance and day with
    /// `active_slots` running and `energy_slots` drawing from the grid.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment` if a slot lies outside the day or
    /// `energy_slots` is not a subset of `active_slots`.
    pub fn assign(&self, active_slots: &[usize], energy_slots: &[usize]) -> Result<Self> {
        let slot_count = self.slot_count();
        let out_of_range = |slot: usize| {
            PlanError::InvalidAssignment(format!("slot {slot} outside 0..{slot_count}"))
        };
        let active = SlotBits::try_from_slots(slot_count, active_slots.iter().copied())
            .map_err(out_of_range)?;
        let energy = SlotBits::try_from_slots(slot_count, energy_slots.iter().copied())
            .map_err(out_of_range)?;

        if !energy.is_subset(&active) {
            return Err(PlanError::InvalidAssignment(format!(
                "grid slots {:?} are not active",
                energy.difference(&active).iter_ones().collect::<Vec<_>>()
            )));
        }

        Ok(Self {
            appliance_id: self.appliance_id,
            day: self.day,
            no_energy: active.difference(&energy),
            energy,
        })
    }

    /// Feasibility predicate against the day's window.
    ///
    /// With `None` the schedule must be all-zero. With a window it must
    /// belong to the same appliance and day, run exactly `duration` slots,
    /// and keep every active slot inside the window range.
    pub fn validate(&self, window: Option<&TimeWindow>) -> bool {
        if self.energy.len() != self.no_energy.len() || !self.energy.is_disjoint(&self.no_energy) {
            return false;
        }

        let Some(window) = window else {
            return self.is_idle();
        };

        if window.appliance_id != self.appliance_id || window.day != self.day {
            return false;
        }
        if !window.range.fits_day(self.slot_count()) {
            return false;
        }

        let active = self.active();
        active.count_ones() == window.duration
            && active.iter_ones().all(|slot| window.range.contains(slot))
    }

    pub fn appliance_id(&self) -> ApplianceId {
        self.appliance_id
    }

    pub fn day(&self) -> Day {
        self.day
    }

    pub fn slot_count(&self) -> usize {
        self.energy.len()
    }

    /// Slots where the appliance runs, from any source.
    pub fn active(&self) -> SlotBits {
        self.energy.union(&self.no_energy)
    }

    /// Slots where the run draws grid energy.
    pub fn grid_energy(&self) -> &SlotBits {
        &self.energy
    }

    /// Slots where the run is covered by an alternate source.
    pub fn non_grid_energy(&self) -> &SlotBits {
        &self.no_energy
    }

    /// Returns `true` when the appliance does not run at all.
    pub fn is_idle(&self) -> bool {
        !self.energy.any() && !self.no_energy.any()
    }
}
