//! Twin-world records: twin worlds, households, and appliances.

use serde::Serialize;

use crate::plan::types::{ApplianceId, HouseholdId, TwinWorldId};

/// Yearly yield of a single solar panel (kWh).
pub const PANEL_YIELD_KWH: f64 = 340.0;

/// A simulated neighbourhood grouping households.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwinWorld {
    pub id: TwinWorldId,
    pub name: String,
    pub description: String,
}

impl TwinWorld {
    pub fn new(id: TwinWorldId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A household in a twin world, with its consumption and solar install.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Household {
    pub id: HouseholdId,
    pub twinworld_id: TwinWorldId,
    pub name: String,
    /// Number of residents.
    pub size: u32,
    /// Yearly base consumption (kWh).
    pub energy_usage: f64,
    pub solar_panels: u32,
    /// Yearly solar production (kWh).
    pub solar_yield_yearly: f64,
}

impl Household {
    /// Creates a household whose yearly yield follows from its panel count.
    pub fn new(
        id: HouseholdId,
        twinworld_id: TwinWorldId,
        name: impl Into<String>,
        size: u32,
        energy_usage: f64,
        solar_panels: u32,
    ) -> Self {
        Self {
            id,
            twinworld_id,
            name: name.into(),
            size,
            energy_usage: energy_usage.max(0.0),
            solar_panels,
            solar_yield_yearly: f64::from(solar_panels) * PANEL_YIELD_KWH,
        }
    }

    /// Overrides the panel-derived yearly yield.
    pub fn with_solar_yield(mut self, yearly_kwh: f64) -> Self {
        self.solar_yield_yearly = yearly_kwh.max(0.0);
        self
    }
}

/// A schedulable appliance owned by a household.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appliance {
    pub id: ApplianceId,
    pub household_id: HouseholdId,
    pub name: String,
    /// Power drawn while running (kW).
    pub power_kw: f64,
}

impl Appliance {
    pub fn new(
        id: ApplianceId,
        household_id: HouseholdId,
        name: impl Into<String>,
        power_kw: f64,
    ) -> Self {
        Self {
            id,
            household_id,
            name: name.into(),
            power_kw: power_kw.max(0.0),
        }
    }
}
