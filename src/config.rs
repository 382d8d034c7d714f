//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::model::{Appliance, Household, TwinWorld};
use crate::plan::signal::{SignalModel, SolarProfile, TariffCurve, TariffModel};
use crate::plan::types::{Day, PlanConfig, SlotRange};

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario, except the
/// twin worlds, which default to none. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`]
/// for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Planning dimensions and the master seed.
    #[serde(default)]
    pub plan: PlanningConfig,
    /// Consumer tariff.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Solar production profile.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Twin worlds with their households, appliances and windows.
    #[serde(default)]
    pub twinworlds: Vec<TwinWorldConfig>,
}

/// Planning dimensions and the master seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanningConfig {
    /// Number of slots per day (must be > 0).
    pub slots_per_day: usize,
    /// Number of days in the planning year (must be > 0).
    pub days_in_year: u16,
    /// Master random seed.
    pub seed: u64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            slots_per_day: 24,
            days_in_year: 365,
            seed: 42,
        }
    }
}

/// Consumer tariff with an optional daily peak period.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    pub name: String,
    /// Price per kWh bought from the grid.
    pub price_network_buy_consumer: f64,
    /// Price per kWh sold to the grid.
    pub price_network_sell_consumer: f64,
    /// First peak slot (inclusive).
    pub peak_start_slot: usize,
    /// End of the peak period (exclusive).
    pub peak_end_slot: usize,
    /// Buy-price multiplier inside the peak period; 1.0 disables it.
    pub peak_multiplier: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            name: "standard".to_string(),
            price_network_buy_consumer: 0.25,
            price_network_sell_consumer: 0.05,
            peak_start_slot: 17,
            peak_end_slot: 21,
            peak_multiplier: 1.0,
        }
    }
}

/// Solar production profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Sunrise slot index (inclusive).
    pub sunrise_slot: usize,
    /// Sunset slot index (exclusive).
    pub sunset_slot: usize,
    /// Relative seasonal swing (0.0-1.0, exclusive).
    pub seasonal_amplitude: f64,
    /// Standard deviation of multiplicative cloud noise.
    pub cloud_noise_std: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        let profile = SolarProfile::default();
        Self {
            sunrise_slot: profile.sunrise_slot,
            sunset_slot: profile.sunset_slot,
            seasonal_amplitude: profile.seasonal_amplitude,
            cloud_noise_std: profile.cloud_noise_std,
        }
    }
}

/// A twin world and everything in it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwinWorldConfig {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub households: Vec<HouseholdConfig>,
}

/// A household and its appliances.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HouseholdConfig {
    pub id: u32,
    pub name: String,
    /// Number of residents.
    #[serde(default = "default_household_size")]
    pub size: u32,
    /// Yearly base consumption (kWh).
    #[serde(default)]
    pub energy_usage: f64,
    #[serde(default)]
    pub solar_panels: u32,
    /// Yearly solar production (kWh); derived from the panel count if unset.
    #[serde(default)]
    pub solar_yield_yearly: Option<f64>,
    #[serde(default)]
    pub appliances: Vec<ApplianceConfig>,
}

fn default_household_size() -> u32 {
    1
}

/// An appliance and its time windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceConfig {
    pub id: u32,
    pub name: String,
    /// Power drawn while running (kW).
    pub power_kw: f64,
    #[serde(default)]
    pub windows: Vec<WindowConfig>,
}

/// A time window repeated every `every` days from `first_day` through
/// `last_day`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    pub first_day: Day,
    /// Last day (inclusive); defaults to `first_day`.
    #[serde(default)]
    pub last_day: Option<Day>,
    #[serde(default = "default_every")]
    pub every: Day,
    /// First allowed slot (inclusive).
    pub start_slot: usize,
    /// End of the allowed slots (exclusive).
    pub end_slot: usize,
    /// Number of slots to run.
    pub duration: usize,
}

fn default_every() -> Day {
    1
}

impl WindowConfig {
    /// One window per day, no repeat.
    pub fn single(day: Day, start_slot: usize, end_slot: usize, duration: usize) -> Self {
        Self {
            first_day: day,
            last_day: None,
            every: 1,
            start_slot,
            end_slot,
            duration,
        }
    }

    /// The window repeated every `every` days through `last_day`.
    pub fn recurring(
        first_day: Day,
        last_day: Day,
        every: Day,
        start_slot: usize,
        end_slot: usize,
        duration: usize,
    ) -> Self {
        Self {
            first_day,
            last_day: Some(last_day),
            every,
            start_slot,
            end_slot,
            duration,
        }
    }

    /// Days the window applies to, ascending.
    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        let last = self.last_day.unwrap_or(self.first_day);
        (self.first_day..=last).step_by(usize::from(self.every.max(1)))
    }

    pub fn range(&self) -> SlotRange {
        SlotRange::new(self.start_slot, self.end_slot)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"plan.slots_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one neighbourhood with a flat tariff.
    pub fn baseline() -> Self {
        Self {
            plan: PlanningConfig::default(),
            tariff: TariffConfig::default(),
            solar: SolarConfig::default(),
            twinworlds: vec![demo_twin_world(4)],
        }
    }

    /// Returns the high-solar preset: more panels, stronger seasons, clouds.
    pub fn high_solar() -> Self {
        Self {
            solar: SolarConfig {
                sunrise_slot: 5,
                sunset_slot: 21,
                seasonal_amplitude: 0.7,
                cloud_noise_std: 0.2,
            },
            twinworlds: vec![demo_twin_world(16)],
            ..Self::baseline()
        }
    }

    /// Returns the peak-tariff preset: evening peak at 2.5x the buy price.
    pub fn peak_tariff() -> Self {
        Self {
            tariff: TariffConfig {
                name: "evening_peak".to_string(),
                price_network_buy_consumer: 0.22,
                peak_start_slot: 17,
                peak_end_slot: 21,
                peak_multiplier: 2.5,
                ..TariffConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "high_solar", "peak_tariff"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "high_solar" => Ok(Self::high_solar()),
            "peak_tariff" => Ok(Self::peak_tariff()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Planning dimensions.
    ///
    /// # Panics
    ///
    /// Panics if `plan.slots_per_day` or `plan.days_in_year` is zero; call
    /// [`ScenarioConfig::validate`] first.
    pub fn plan_config(&self) -> PlanConfig {
        PlanConfig::new(self.plan.slots_per_day, self.plan.days_in_year)
    }

    pub fn tariff_model(&self) -> TariffModel {
        let t = &self.tariff;
        let peak = (t.peak_multiplier != 1.0 && t.peak_start_slot < t.peak_end_slot).then(|| {
            (
                SlotRange::new(t.peak_start_slot, t.peak_end_slot),
                t.peak_multiplier,
            )
        });
        TariffModel {
            name: t.name.clone(),
            buy_price: t.price_network_buy_consumer,
            sell_price: t.price_network_sell_consumer,
            peak,
        }
    }

    pub fn solar_profile(&self) -> SolarProfile {
        SolarProfile {
            sunrise_slot: self.solar.sunrise_slot,
            sunset_slot: self.solar.sunset_slot,
            seasonal_amplitude: self.solar.seasonal_amplitude,
            cloud_noise_std: self.solar.cloud_noise_std,
        }
    }

    /// Signal model built from the tariff and solar sections.
    ///
    /// # Panics
    ///
    /// Same as [`ScenarioConfig::plan_config`].
    pub fn signal_model(&self) -> SignalModel {
        let config = self.plan_config();
        let tariff = TariffCurve::from_model(&self.tariff_model(), &config);
        SignalModel::new(config, tariff, self.solar_profile())
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let p = &self.plan;

        if p.slots_per_day == 0 {
            errors.push(ConfigError::new("plan.slots_per_day", "must be > 0"));
        }
        if p.days_in_year == 0 {
            errors.push(ConfigError::new("plan.days_in_year", "must be > 0"));
        }

        let t = &self.tariff;
        if t.price_network_buy_consumer < 0.0 {
            errors.push(ConfigError::new(
                "tariff.price_network_buy_consumer",
                "must be >= 0",
            ));
        }
        if t.price_network_sell_consumer < 0.0 {
            errors.push(ConfigError::new(
                "tariff.price_network_sell_consumer",
                "must be >= 0",
            ));
        }
        if t.peak_multiplier <= 0.0 {
            errors.push(ConfigError::new("tariff.peak_multiplier", "must be > 0"));
        }
        if t.peak_start_slot > t.peak_end_slot {
            errors.push(ConfigError::new(
                "tariff.peak_start_slot",
                "must be <= tariff.peak_end_slot",
            ));
        }
        if p.slots_per_day > 0 && t.peak_end_slot > p.slots_per_day {
            errors.push(ConfigError::new(
                "tariff.peak_end_slot",
                "must be <= plan.slots_per_day",
            ));
        }

        let sol = &self.solar;
        if sol.sunrise_slot >= sol.sunset_slot {
            errors.push(ConfigError::new(
                "solar.sunrise_slot",
                "must be < solar.sunset_slot",
            ));
        }
        if p.slots_per_day > 0 && sol.sunset_slot > p.slots_per_day {
            errors.push(ConfigError::new(
                "solar.sunset_slot",
                "must be <= plan.slots_per_day",
            ));
        }
        if !(0.0..1.0).contains(&sol.seasonal_amplitude) {
            errors.push(ConfigError::new(
                "solar.seasonal_amplitude",
                "must be in [0.0, 1.0)",
            ));
        }
        if sol.cloud_noise_std < 0.0 {
            errors.push(ConfigError::new("solar.cloud_noise_std", "must be >= 0"));
        }

        self.validate_records(&mut errors);
        errors
    }

    fn validate_records(&self, errors: &mut Vec<ConfigError>) {
        let mut twin_world_ids = HashSet::new();
        let mut household_ids = HashSet::new();
        let mut appliance_ids = HashSet::new();

        for (i, tw) in self.twinworlds.iter().enumerate() {
            let path = format!("twinworlds[{i}]");
            if !twin_world_ids.insert(tw.id) {
                errors.push(ConfigError::new(
                    format!("{path}.id"),
                    format!("duplicate twin world id {}", tw.id),
                ));
            }

            for (j, h) in tw.households.iter().enumerate() {
                let path = format!("{path}.households[{j}]");
                if !household_ids.insert(h.id) {
                    errors.push(ConfigError::new(
                        format!("{path}.id"),
                        format!("duplicate household id {}", h.id),
                    ));
                }
                if h.energy_usage < 0.0 {
                    errors.push(ConfigError::new(
                        format!("{path}.energy_usage"),
                        "must be >= 0",
                    ));
                }
                if h.solar_yield_yearly.is_some_and(|y| y < 0.0) {
                    errors.push(ConfigError::new(
                        format!("{path}.solar_yield_yearly"),
                        "must be >= 0",
                    ));
                }

                for (k, a) in h.appliances.iter().enumerate() {
                    let path = format!("{path}.appliances[{k}]");
                    if !appliance_ids.insert(a.id) {
                        errors.push(ConfigError::new(
                            format!("{path}.id"),
                            format!("duplicate appliance id {}", a.id),
                        ));
                    }
                    if a.power_kw < 0.0 {
                        errors.push(ConfigError::new(format!("{path}.power_kw"), "must be >= 0"));
                    }
                    for (w, window) in a.windows.iter().enumerate() {
                        self.validate_window(window, &format!("{path}.windows[{w}]"), errors);
                    }
                }
            }
        }
    }

    fn validate_window(&self, w: &WindowConfig, path: &str, errors: &mut Vec<ConfigError>) {
        let days = self.plan.days_in_year;
        let slots = self.plan.slots_per_day;
        let last = w.last_day.unwrap_or(w.first_day);

        if w.first_day == 0 || w.first_day > days {
            errors.push(ConfigError::new(
                format!("{path}.first_day"),
                format!("must be in 1..={days}"),
            ));
        }
        if last < w.first_day || last > days {
            errors.push(ConfigError::new(
                format!("{path}.last_day"),
                format!("must be in first_day..={days}"),
            ));
        }
        if w.every == 0 {
            errors.push(ConfigError::new(format!("{path}.every"), "must be > 0"));
        }
        if w.start_slot >= w.end_slot || w.end_slot > slots {
            errors.push(ConfigError::new(
                format!("{path}.end_slot"),
                format!("must be in start_slot+1..={slots}"),
            ));
        }
        if w.duration == 0 || w.duration > w.end_slot.saturating_sub(w.start_slot) {
            errors.push(ConfigError::new(
                format!("{path}.duration"),
                "must be in 1..=end_slot-start_slot",
            ));
        }
    }
}

impl TwinWorldConfig {
    pub fn to_record(&self) -> TwinWorld {
        TwinWorld::new(self.id, self.name.clone(), self.description.clone())
    }
}

impl HouseholdConfig {
    pub fn to_record(&self, twinworld_id: u32) -> Household {
        let household = Household::new(
            self.id,
            twinworld_id,
            self.name.clone(),
            self.size,
            self.energy_usage,
            self.solar_panels,
        );
        match self.solar_yield_yearly {
            Some(yearly_kwh) => household.with_solar_yield(yearly_kwh),
            None => household,
        }
    }
}

impl ApplianceConfig {
    pub fn to_record(&self, household_id: u32) -> Appliance {
        Appliance::new(self.id, household_id, self.name.clone(), self.power_kw)
    }
}

/// A neighbourhood of two households with typical appliance habits.
fn demo_twin_world(panels: u32) -> TwinWorldConfig {
    TwinWorldConfig {
        id: 1,
        name: "Demo neighbourhood".to_string(),
        description: "Two households with recurring appliance runs".to_string(),
        households: vec![
            HouseholdConfig {
                id: 1,
                name: "Family".to_string(),
                size: 4,
                energy_usage: 4200.0,
                solar_panels: panels,
                solar_yield_yearly: None,
                appliances: vec![
                    ApplianceConfig {
                        id: 1,
                        name: "Washing machine".to_string(),
                        power_kw: 2.0,
                        windows: vec![WindowConfig::recurring(1, 365, 2, 8, 20, 2)],
                    },
                    ApplianceConfig {
                        id: 2,
                        name: "Dishwasher".to_string(),
                        power_kw: 1.5,
                        windows: vec![WindowConfig::recurring(1, 365, 1, 18, 24, 2)],
                    },
                ],
            },
            HouseholdConfig {
                id: 2,
                name: "Couple".to_string(),
                size: 2,
                energy_usage: 2500.0,
                solar_panels: panels / 2,
                solar_yield_yearly: None,
                appliances: vec![ApplianceConfig {
                    id: 3,
                    name: "Electric vehicle".to_string(),
                    power_kw: 7.0,
                    windows: vec![
                        WindowConfig::recurring(1, 364, 7, 0, 24, 4),
                        WindowConfig::recurring(4, 361, 7, 9, 17, 3),
                    ],
                }],
            },
        ],
    }
}
