//! Appliance scheduling core: day bitmaps, time windows, and year plans.

/// Fixed-length slot bit sequences.
pub mod bits;
pub mod cost;
/// Per-appliance, per-day run bitmaps.
pub mod day_schedule;
pub mod error;
/// Greedy run placement inside a time window.
pub mod scheduler;
pub mod signal;
pub mod solar_budget;
pub mod types;
pub mod window;
pub mod year_plan;

// Re-export the main types for convenience
pub use bits::SlotBits;
pub use cost::{CostEvaluator, CostReport};
pub use day_schedule::DaySchedule;
pub use error::{PlanError, Result};
pub use scheduler::Scheduler;
pub use signal::{DaySignal, SignalModel, SolarCurve, SolarProfile, TariffCurve, TariffModel};
pub use solar_budget::SolarBudget;
pub use types::{ApplianceId, Day, HouseholdId, PlanConfig, SlotRange, TwinWorldId};
pub use window::{TimeWindow, WindowBook};
pub use year_plan::YearPlan;
