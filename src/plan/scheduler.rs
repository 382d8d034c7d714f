//! Greedy contiguous placement of an appliance run inside its time window.

use tracing::debug;

use super::day_schedule::DaySchedule;
use super::error::Result;
use super::signal::DaySignal;
use super::window::TimeWindow;

/// Relative tolerance when comparing aggregate tariff weights.
const TARIFF_EPSILON: f64 = 1e-9;

/// A candidate run: its start slot and how it scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub start: usize,
    /// Active slots covered by an alternate source.
    pub covered: usize,
    /// Sum of the tariff weights over the run's uncovered slots.
    pub grid_tariff: f64,
}

impl Placement {
    /// Strict preference: more covered slots, then a lower grid tariff.
    /// Equal placements keep the earlier start.
    fn beats(&self, other: &Placement) -> bool {
        if self.covered != other.covered {
            return self.covered > other.covered;
        }
        let tolerance = TARIFF_EPSILON * other.grid_tariff.abs().max(1.0);
        self.grid_tariff < other.grid_tariff - tolerance
    }
}

/// Picks where in the window an appliance runs and which slots draw grid
/// energy.
///
/// The run is `duration` contiguous slots inside the window range. Among all
/// starts the scheduler prefers the one with the most covered slots, then
/// the lowest tariff summed over the slots that draw grid energy, then the
/// earliest start. Covered slots of the
/// run go to the non-grid bitmap, the others to the grid bitmap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    /// Schedules one day.
    ///
    /// # Errors
    ///
    /// `InfeasibleWindow` if the window does not fit a day of
    /// `signal.len()` slots.
    pub fn schedule(&self, window: &TimeWindow, signal: &DaySignal) -> Result<DaySchedule> {
        let slot_count = signal.len();
        let placement = self.place(window, signal)?;
        let slots = signal.as_slice();

        let active: Vec<usize> = (placement.start..placement.start + window.duration).collect();
        let energy: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&slot| !slots[slot].covered)
            .collect();

        debug!(
            appliance_id = window.appliance_id,
            day = window.day,
            start = placement.start,
            duration = window.duration,
            covered = placement.covered,
            grid_tariff = placement.grid_tariff,
            "scheduled run"
        );

        DaySchedule::initialize(window.appliance_id, window.day, slot_count)
            .assign(&active, &energy)
    }

    /// Finds the best start in a single pass over the window range.
    ///
    /// # Errors
    ///
    /// `InfeasibleWindow` if the window does not fit the signal's day.
    pub fn place(&self, window: &TimeWindow, signal: &DaySignal) -> Result<Placement> {
        window.check_feasible(signal.len())?;

        let range = window.range;
        let duration = window.duration;
        let slots = &signal.as_slice()[range.as_range()];

        // prefix[i] = grid tariff over the first i slots of the range.
        let mut prefix = Vec::with_capacity(slots.len() + 1);
        prefix.push(0.0);
        let mut acc = 0.0;
        for slot in slots {
            if !slot.covered {
                acc += slot.tariff_weight;
            }
            prefix.push(acc);
        }

        let mut covered = slots[..duration].iter().filter(|s| s.covered).count();
        let mut best = Placement {
            start: range.start,
            covered,
            grid_tariff: prefix[duration],
        };

        for offset in 1..=slots.len() - duration {
            let entering = slots[offset + duration - 1].covered;
            let leaving = slots[offset - 1].covered;
            covered = covered + usize::from(entering) - usize::from(leaving);

            let candidate = Placement {
                start: range.start + offset,
                covered,
                grid_tariff: prefix[offset + duration] - prefix[offset],
            };
            if candidate.beats(&best) {
                best = candidate;
            }
        }

        Ok(best)
    }
}
