//! Per-slot cost signals: tariff weights and solar coverage.
//!
//! A [`DaySignal`] is what the scheduler sees for one appliance on one day.
//! It is derived by [`SignalModel`] from a [`TariffCurve`] and the spare
//! solar the household has left (see [`super::solar_budget::SolarBudget`]).

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::solar_budget::ENERGY_EPSILON;
use super::types::{Day, PlanConfig, SlotRange};

/// Share of household base consumption that draws on solar before any
/// scheduled appliance does.
pub const BASELOAD_SOLAR_SHARE: f64 = 0.8;

/// Day of the year with the highest solar yield.
pub const SOLAR_PEAK_DAY: f64 = 172.0;

/// Signal for a single slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotSignal {
    /// Grid price weight applied to grid energy drawn in this slot.
    pub tariff_weight: f64,
    /// Whether an alternate source can cover the appliance in this slot.
    pub covered: bool,
}

/// Signal for every slot of one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySignal {
    slots: Vec<SlotSignal>,
}

impl DaySignal {
    pub fn new(slots: Vec<SlotSignal>) -> Self {
        Self { slots }
    }

    /// Uniform tariff, nothing covered.
    pub fn flat(slot_count: usize, tariff_weight: f64) -> Self {
        Self::new(vec![
            SlotSignal {
                tariff_weight,
                covered: false,
            };
            slot_count
        ])
    }

    /// Zips tariff weights with coverage flags.
    ///
    /// # Panics
    ///
    /// Panics if the two slices differ in length.
    pub fn from_parts(weights: &[f64], covered: &[bool]) -> Self {
        assert_eq!(
            weights.len(),
            covered.len(),
            "tariff weights and coverage flags must have one entry per slot"
        );
        Self::new(
            weights
                .iter()
                .zip(covered)
                .map(|(&tariff_weight, &covered)| SlotSignal {
                    tariff_weight,
                    covered,
                })
                .collect(),
        )
    }

    /// Marks every slot of `range` that exists in this day as covered.
    pub fn cover(mut self, range: SlotRange) -> Self {
        let end = range.end.min(self.slots.len());
        for slot in range.start.min(end)..end {
            self.slots[slot].covered = true;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&SlotSignal> {
        self.slots.get(slot)
    }

    pub fn as_slice(&self) -> &[SlotSignal] {
        &self.slots
    }
}

/// Consumer tariff with an optional daily peak period.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffModel {
    pub name: String,
    /// Price per kWh bought from the grid.
    pub buy_price: f64,
    /// Price per kWh sold back to the grid.
    pub sell_price: f64,
    /// Slots where `buy_price` is scaled by the multiplier.
    pub peak: Option<(SlotRange, f64)>,
}

impl TariffModel {
    /// Single-rate tariff without a peak period.
    pub fn flat(name: impl Into<String>, buy_price: f64) -> Self {
        Self {
            name: name.into(),
            buy_price,
            sell_price: 0.0,
            peak: None,
        }
    }

    /// Buy-price weight of `slot`.
    pub fn slot_weight(&self, slot: usize) -> f64 {
        match self.peak {
            Some((range, multiplier)) if range.contains(slot) => self.buy_price * multiplier,
            _ => self.buy_price,
        }
    }
}

/// Tariff weight for every (day, slot) of the year, stored day-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffCurve {
    slots_per_day: usize,
    weights: Vec<f64>,
}

impl TariffCurve {
    pub fn flat(config: &PlanConfig, weight: f64) -> Self {
        Self {
            slots_per_day: config.slots_per_day,
            weights: vec![weight; config.total_slots()],
        }
    }

    pub fn from_model(model: &TariffModel, config: &PlanConfig) -> Self {
        let day: Vec<f64> = (0..config.slots_per_day)
            .map(|slot| model.slot_weight(slot))
            .collect();
        Self {
            slots_per_day: config.slots_per_day,
            weights: day.repeat(usize::from(config.days_in_year)),
        }
    }

    /// Replaces the weights of one day. Days outside the curve are ignored.
    pub fn with_day(mut self, day: Day, weights: &[f64]) -> Self {
        if let Some(slice) = self.day_mut(day) {
            for (dst, src) in slice.iter_mut().zip(weights) {
                *dst = *src;
            }
        }
        self
    }

    /// Weights of `day`, or `None` outside the curve.
    pub fn day(&self, day: Day) -> Option<&[f64]> {
        let start = self.offset(day)?;
        self.weights.get(start..start + self.slots_per_day)
    }

    /// Weight of one slot; zero outside the curve.
    pub fn weight(&self, day: Day, slot: usize) -> f64 {
        self.day(day)
            .and_then(|weights| weights.get(slot))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn slots_per_day(&self) -> usize {
        self.slots_per_day
    }

    fn day_mut(&mut self, day: Day) -> Option<&mut [f64]> {
        let start = self.offset(day)?;
        self.weights.get_mut(start..start + self.slots_per_day)
    }

    fn offset(&self, day: Day) -> Option<usize> {
        let index = usize::from(day).checked_sub(1)?;
        let start = index * self.slots_per_day;
        (start + self.slots_per_day <= self.weights.len()).then_some(start)
    }
}

/// Shape of solar production over the day and the year.
///
/// Production is a half-sine between `sunrise_slot` (inclusive) and
/// `sunset_slot` (exclusive), scaled per day by a seasonal cosine that
/// peaks on day 172.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarProfile {
    pub sunrise_slot: usize,
    pub sunset_slot: usize,
    /// Relative seasonal swing in `[0, 1)`; 0 spreads the yield evenly.
    pub seasonal_amplitude: f64,
    /// Standard deviation of multiplicative cloud noise; 0 disables it.
    pub cloud_noise_std: f64,
}

impl SolarProfile {
    /// Fraction of a day's production falling in each slot. Sums to 1 when
    /// daylight spans at least one slot, otherwise all zero.
    pub fn intraday_shares(&self, slot_count: usize) -> Vec<f64> {
        let sunset = self.sunset_slot.min(slot_count);
        let mut shares = vec![0.0; slot_count];
        if self.sunrise_slot >= sunset {
            return shares;
        }

        let span = (sunset - self.sunrise_slot) as f64;
        for (offset, share) in shares[self.sunrise_slot..sunset].iter_mut().enumerate() {
            // Midpoint sampling keeps the first and last daylight slots non-zero.
            let phase = (offset as f64 + 0.5) / span;
            *share = (std::f64::consts::PI * phase).sin();
        }
        normalize(&mut shares);
        shares
    }

    /// Fraction of the yearly production falling on each day, day 1 first.
    pub fn seasonal_shares(&self, days_in_year: u16) -> Vec<f64> {
        let amplitude = self.seasonal_amplitude.clamp(0.0, 0.99);
        let year = f64::from(days_in_year);
        let mut shares: Vec<f64> = (1..=days_in_year)
            .map(|day| {
                let angle = 2.0 * std::f64::consts::PI * (f64::from(day) - SOLAR_PEAK_DAY) / year;
                1.0 + amplitude * angle.cos()
            })
            .collect();
        normalize(&mut shares);
        shares
    }

    /// Spreads `yearly_kwh` over every slot of the year.
    ///
    /// Noise, when enabled, is drawn from an RNG seeded with `seed`, so the
    /// same inputs always yield the same curve.
    pub fn yield_curve(&self, config: &PlanConfig, yearly_kwh: f64, seed: u64) -> SolarCurve {
        let intraday = self.intraday_shares(config.slots_per_day);
        let seasonal = self.seasonal_shares(config.days_in_year);
        let mut rng = StdRng::seed_from_u64(seed);
        let yearly_kwh = yearly_kwh.max(0.0);

        let mut slot_kwh = Vec::with_capacity(config.total_slots());
        for day_share in &seasonal {
            for &slot_share in &intraday {
                let mut kwh = yearly_kwh * day_share * slot_share;
                if kwh > 0.0 {
                    kwh *= (1.0 + gaussian_noise(&mut rng, self.cloud_noise_std)).max(0.0);
                }
                slot_kwh.push(kwh);
            }
        }

        SolarCurve {
            slots_per_day: config.slots_per_day,
            slot_kwh,
        }
    }
}

impl Default for SolarProfile {
    fn default() -> Self {
        Self {
            sunrise_slot: 6,
            sunset_slot: 20,
            seasonal_amplitude: 0.5,
            cloud_noise_std: 0.0,
        }
    }
}

/// Solar energy available in every (day, slot) of the year, in kWh.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarCurve {
    slots_per_day: usize,
    slot_kwh: Vec<f64>,
}

impl SolarCurve {
    /// A curve with no production.
    pub fn dark(config: &PlanConfig) -> Self {
        Self {
            slots_per_day: config.slots_per_day,
            slot_kwh: vec![0.0; config.total_slots()],
        }
    }

    pub fn day(&self, day: Day) -> Option<&[f64]> {
        let start = (usize::from(day).checked_sub(1)?) * self.slots_per_day;
        self.slot_kwh.get(start..start + self.slots_per_day)
    }

    pub fn slot_kwh(&self, day: Day, slot: usize) -> f64 {
        self.day(day)
            .and_then(|values| values.get(slot))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_kwh(&self) -> f64 {
        self.slot_kwh.iter().sum()
    }

    pub fn slots_per_day(&self) -> usize {
        self.slots_per_day
    }

    /// Every slot of the year, day-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.slot_kwh
    }
}

/// Derives day signals for appliances from the tariff and solar inputs.
#[derive(Debug, Clone)]
pub struct SignalModel {
    config: PlanConfig,
    tariff: TariffCurve,
    profile: SolarProfile,
}

impl SignalModel {
    pub fn new(config: PlanConfig, tariff: TariffCurve, profile: SolarProfile) -> Self {
        Self {
            config,
            tariff,
            profile,
        }
    }

    pub fn tariff(&self) -> &TariffCurve {
        &self.tariff
    }

    pub fn profile(&self) -> &SolarProfile {
        &self.profile
    }

    /// Solar curve of a household producing `yearly_kwh`.
    pub fn solar_curve(&self, yearly_kwh: f64, seed: u64) -> SolarCurve {
        self.profile.yield_curve(&self.config, yearly_kwh, seed)
    }

    /// Energy an appliance drawing `power_kw` uses in one slot, in kWh.
    pub fn slot_demand(&self, power_kw: f64) -> f64 {
        power_kw * self.config.slot_hours
    }

    /// Signal for an appliance drawing `power_kw` on `day`, given the
    /// household's spare solar per slot of that day.
    ///
    /// A slot is covered when the spare solar can supply the appliance for
    /// the whole slot. Returns `None` for a day outside the year or when
    /// `spare` does not have one value per slot.
    pub fn day_signal(&self, spare: &[f64], power_kw: f64, day: Day) -> Option<DaySignal> {
        let weights = self.tariff.day(day)?;
        if spare.len() != weights.len() {
            return None;
        }
        let demand = self.slot_demand(power_kw);

        let slots = weights
            .iter()
            .zip(spare)
            .map(|(&tariff_weight, &kwh)| SlotSignal {
                tariff_weight,
                covered: kwh + ENERGY_EPSILON >= demand,
            })
            .collect();
        Some(DaySignal::new(slots))
    }
}

/// Sample of zero-mean Gaussian noise via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::solar_budget::SolarBudget;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn tariff_peak_scales_buy_price() {
        let model = TariffModel {
            name: "tou".into(),
            buy_price: 0.2,
            sell_price: 0.05,
            peak: Some((SlotRange::new(17, 21), 2.0)),
        };
        assert!(approx(model.slot_weight(16), 0.2));
        assert!(approx(model.slot_weight(17), 0.4));
        assert!(approx(model.slot_weight(21), 0.2));

        let curve = TariffCurve::from_model(&model, &PlanConfig::new(24, 3));
        assert!(approx(curve.weight(3, 18), 0.4));
        assert_eq!(curve.weight(4, 18), 0.0);
        assert_eq!(curve.day(0), None);
    }

    #[test]
    fn tariff_with_day_overrides_one_day() {
        let cfg = PlanConfig::new(4, 2);
        let curve = TariffCurve::flat(&cfg, 1.0).with_day(2, &[5.0, 6.0]);
        assert_eq!(curve.day(1), Some(&[1.0, 1.0, 1.0, 1.0][..]));
        assert_eq!(curve.day(2), Some(&[5.0, 6.0, 1.0, 1.0][..]));
    }

    #[test]
    fn intraday_shares_sum_to_one_inside_daylight() {
        let profile = SolarProfile::default();
        let shares = profile.intraday_shares(24);
        assert!(approx(shares.iter().sum::<f64>(), 1.0));
        assert_eq!(shares[5], 0.0);
        assert!(shares[6] > 0.0);
        assert!(shares[19] > 0.0);
        assert_eq!(shares[20], 0.0);
        // Symmetric half-sine peaks in the middle of daylight.
        assert!(approx(shares[12], shares[13]));
        assert!(shares[12] > shares[7]);
    }

    #[test]
    fn intraday_shares_empty_daylight_is_zero() {
        let profile = SolarProfile {
            sunrise_slot: 10,
            sunset_slot: 10,
            ..SolarProfile::default()
        };
        assert!(profile.intraday_shares(24).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn seasonal_shares_peak_in_summer() {
        let shares = SolarProfile::default().seasonal_shares(365);
        assert!(approx(shares.iter().sum::<f64>(), 1.0));
        assert!(shares[171] > shares[0]);
        assert!(shares[171] > shares[354]);
    }

    #[test]
    fn yield_curve_preserves_yearly_total_without_noise() {
        let cfg = PlanConfig::standard();
        let curve = SolarProfile::default().yield_curve(&cfg, 3400.0, 7);
        assert!((curve.total_kwh() - 3400.0).abs() < 1e-6);
        assert_eq!(curve.slot_kwh(1, 0), 0.0);
        assert!(curve.slot_kwh(172, 12) > curve.slot_kwh(1, 12));
    }

    #[test]
    fn yield_curve_noise_is_seeded() {
        let cfg = PlanConfig::new(24, 10);
        let profile = SolarProfile {
            cloud_noise_std: 0.2,
            ..SolarProfile::default()
        };
        let a = profile.yield_curve(&cfg, 1000.0, 42);
        let b = profile.yield_curve(&cfg, 1000.0, 42);
        let c = profile.yield_curve(&cfg, 1000.0, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.day(1).unwrap().iter().all(|&kwh| kwh >= 0.0));
    }

    #[test]
    fn day_signal_covers_slots_with_spare_solar() {
        let cfg = PlanConfig::new(24, 1);
        let model = SignalModel::new(
            cfg,
            TariffCurve::flat(&cfg, 0.3),
            SolarProfile::default(),
        );
        let solar = model.solar_curve(365.0, 0);
        let spare = SolarBudget::new(&solar, 0.0);
        let signal = model.day_signal(spare.day(1).unwrap(), 0.01, 1).unwrap();
        assert_eq!(signal.len(), 24);
        assert!(!signal.get(2).unwrap().covered);
        assert!(signal.get(12).unwrap().covered);
        assert!(approx(signal.get(12).unwrap().tariff_weight, 0.3));

        // Enough base consumption leaves nothing for the appliance.
        let starved = SolarBudget::new(&solar, 1000.0);
        let signal = model.day_signal(starved.day(1).unwrap(), 0.01, 1).unwrap();
        assert!(signal.as_slice().iter().all(|s| !s.covered));

        assert_eq!(model.day_signal(spare.day(1).unwrap(), 0.01, 2), None);
        assert_eq!(model.day_signal(&[1.0; 12], 0.01, 1), None);
    }

    #[test]
    #[should_panic(expected = "one entry per slot")]
    fn from_parts_rejects_mismatched_lengths() {
        DaySignal::from_parts(&[0.1, 0.2, 0.3], &[true, false]);
    }

    #[test]
    fn gaussian_noise_zero_std_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
        let samples: Vec<f64> = (0..2000).map(|_| gaussian_noise(&mut rng, 1.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.15, "mean {mean}");
    }

    #[test]
    fn day_signal_cover_clips_to_day() {
        let signal = DaySignal::flat(4, 1.0).cover(SlotRange::new(2, 9));
        let covered: Vec<bool> = signal.as_slice().iter().map(|s| s.covered).collect();
        assert_eq!(covered, vec![false, false, true, true]);
    }
}
