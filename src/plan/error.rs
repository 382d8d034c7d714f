//! Error kinds reported by the planning core.

use thiserror::Error;

use super::types::{ApplianceId, Day, SlotRange};

/// Failure of a planning operation.
///
/// Every variant is a caller input error; none is retried internally and a
/// rejected mutation leaves the year plan unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("appliance {appliance_id} already has a time window on day {day}")]
    ConflictingWindow { appliance_id: ApplianceId, day: Day },

    #[error("duration {duration} cannot fit range {range} in a day of {slot_count} slots")]
    InfeasibleWindow {
        range: SlotRange,
        duration: usize,
        slot_count: usize,
    },

    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    DuplicateRecord(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;
