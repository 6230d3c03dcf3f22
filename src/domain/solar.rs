//! Solar system sizing and ROI estimation
//!
//! Turns a customer's monthly consumption and site parameters into a
//! recommended photovoltaic system and a financial projection. The estimator
//! is a pure function of its input, the [`EstimatorSettings`] and the
//! injected [`PricingTable`]; it performs no I/O.
//!
//! Component prices are quoted in the pricing currency (USD), while tariffs
//! and savings are in the local currency. `exchange_rate` bridges the two for
//! the payback period.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing::debug;

use crate::domain::pricing::PricingTable;
use crate::domain::value_objects::{ComponentKey, Money};
use crate::{Result, StorefrontError};

const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Largest monthly load (kWh) the calculator accepts.
pub const MAX_MONTHLY_CONSUMPTION: f64 = 1_000_000_000.0;

// =============================================================================
// Input
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UsageType {
    Residential,
    Commercial,
    Industrial,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SystemType {
    OnGrid,
    OffGrid,
    Hybrid,
}

impl SystemType {
    pub fn needs_battery(self) -> bool { self != SystemType::OnGrid }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarInput {
    /// kWh per month.
    pub monthly_consumption: f64,
    pub usage_type: UsageType,
    pub city: String,
    /// Peak sun hours per day.
    pub sun_hours: f64,
    pub system_type: SystemType,
}

impl SolarInput {
    /// Builds an input from raw form values, rejecting unknown enum values.
    pub fn parse(monthly_consumption: f64, usage_type: &str, city: impl Into<String>, sun_hours: f64, system_type: &str) -> Result<Self> {
        let usage_type = UsageType::from_str(usage_type)
            .map_err(|_| StorefrontError::InvalidInput(format!("unknown usage type `{usage_type}`")))?;
        let system_type = SystemType::from_str(system_type)
            .map_err(|_| StorefrontError::InvalidInput(format!("unknown system type `{system_type}`")))?;
        let input = Self { monthly_consumption, usage_type, city: city.into(), sun_hours, system_type };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.monthly_consumption.is_finite() || self.monthly_consumption <= 0.0 {
            return Err(StorefrontError::InvalidInput(format!("monthly consumption must be positive, got {}", self.monthly_consumption)));
        }
        if self.monthly_consumption > MAX_MONTHLY_CONSUMPTION {
            return Err(StorefrontError::InvalidInput(format!("monthly consumption exceeds {MAX_MONTHLY_CONSUMPTION} kWh")));
        }
        if !self.sun_hours.is_finite() || self.sun_hours <= 0.0 {
            return Err(StorefrontError::InvalidInput(format!("sun hours must be positive, got {}", self.sun_hours)));
        }
        if self.sun_hours >= HOURS_PER_DAY {
            return Err(StorefrontError::InvalidInput(format!("sun hours must be below 24, got {}", self.sun_hours)));
        }
        Ok(())
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Local tariff per kWh for each usage type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tariffs {
    pub residential: Decimal,
    pub commercial: Decimal,
    pub industrial: Decimal,
}

impl Tariffs {
    pub fn for_usage(&self, usage: UsageType) -> Decimal {
        match usage {
            UsageType::Residential => self.residential,
            UsageType::Commercial => self.commercial,
            UsageType::Industrial => self.industrial,
        }
    }
}

impl Default for Tariffs {
    fn default() -> Self {
        Self { residential: Decimal::new(15, 0), commercial: Decimal::new(25, 0), industrial: Decimal::new(30, 0) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    /// System losses (wiring, heat, soiling, inverter).
    pub derating_factor: f64,
    pub panel_wattage: u32,
    pub inverter_ratings_kw: Vec<f64>,
    pub battery_module_kwh: f64,
    pub autonomy_days: f64,
    pub depth_of_discharge: f64,
    /// Share of the off-grid battery bank a hybrid system carries.
    pub hybrid_backup_fraction: f64,
    /// Balance-of-system markup over the component subtotal.
    pub bos_markup: Decimal,
    pub emission_factor_kg_per_kwh: f64,
    pub tariffs: Tariffs,
    pub local_currency: String,
    /// Local currency units per pricing currency unit.
    pub exchange_rate: Decimal,
    pub lifetime_years: u32,
    pub annual_degradation: f64,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            derating_factor: 0.8,
            panel_wattage: 450,
            inverter_ratings_kw: vec![3.0, 5.0, 8.0, 10.0, 15.0, 20.0, 30.0, 50.0, 100.0],
            battery_module_kwh: 5.0,
            autonomy_days: 1.0,
            depth_of_discharge: 0.8,
            hybrid_backup_fraction: 0.5,
            bos_markup: Decimal::new(15, 2),
            emission_factor_kg_per_kwh: 0.5,
            tariffs: Tariffs::default(),
            local_currency: "SDG".to_string(),
            exchange_rate: Decimal::new(600, 0),
            lifetime_years: 25,
            annual_degradation: 0.005,
        }
    }
}

impl EstimatorSettings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(StorefrontError::InvalidConfiguration(msg.to_string()));
        if !(self.derating_factor > 0.0 && self.derating_factor <= 1.0) { return invalid("derating factor must be in (0, 1]"); }
        if self.panel_wattage == 0 { return invalid("panel wattage must be positive"); }
        if self.inverter_ratings_kw.is_empty() { return invalid("no standard inverter ratings"); }
        if self.inverter_ratings_kw.iter().any(|r| !r.is_finite() || *r <= 0.0) { return invalid("inverter ratings must be positive"); }
        if !(self.battery_module_kwh.is_finite() && self.battery_module_kwh > 0.0) { return invalid("battery module size must be positive"); }
        if !(self.autonomy_days.is_finite() && self.autonomy_days > 0.0) { return invalid("autonomy window must be positive"); }
        if !(self.depth_of_discharge > 0.0 && self.depth_of_discharge <= 1.0) { return invalid("depth of discharge must be in (0, 1]"); }
        if !(self.hybrid_backup_fraction > 0.0 && self.hybrid_backup_fraction <= 1.0) { return invalid("hybrid backup fraction must be in (0, 1]"); }
        if self.bos_markup.is_sign_negative() && !self.bos_markup.is_zero() { return invalid("balance-of-system markup must not be negative"); }
        if !(self.emission_factor_kg_per_kwh.is_finite() && self.emission_factor_kg_per_kwh >= 0.0) { return invalid("emission factor must not be negative"); }
        let tariffs = [self.tariffs.residential, self.tariffs.commercial, self.tariffs.industrial];
        if tariffs.iter().any(|t| t.is_sign_negative() && !t.is_zero()) { return invalid("tariffs must not be negative"); }
        if self.local_currency.trim().is_empty() { return invalid("local currency is empty"); }
        if self.exchange_rate <= Decimal::ZERO { return invalid("exchange rate must be positive"); }
        if self.lifetime_years == 0 { return invalid("system lifetime must be at least one year"); }
        if !(self.annual_degradation >= 0.0 && self.annual_degradation < 1.0) { return invalid("annual degradation must be in [0, 1)"); }
        Ok(())
    }
}

// =============================================================================
// Result
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "years", rename_all = "snake_case")]
pub enum Payback {
    Years(f64),
    NotApplicable,
}

impl Payback {
    pub fn years(self) -> Option<f64> {
        match self {
            Payback::Years(y) => Some(y),
            Payback::NotApplicable => None,
        }
    }
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payback::Years(y) => write!(f, "{y:.1} years"),
            Payback::NotApplicable => write!(f, "n/a"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarResult {
    pub system_type: SystemType,
    pub panel_count: u32,
    /// kW of array capacity needed, rounded up to hundredths.
    pub required_capacity: f64,
    pub inverter_size: f64,
    /// kWh of storage; zero for on-grid systems.
    pub battery_capacity: f64,
    pub battery_count: u32,
    pub system_cost: Money,
    /// kWh per year.
    pub annual_production: f64,
    pub annual_savings: Money,
    pub payback: Payback,
    pub lifetime_savings: Money,
    /// kg CO2 per year.
    pub co2_saved: f64,
    pub monthly_bill_before: Money,
    pub monthly_bill_after: Money,
}

// =============================================================================
// Estimator
// =============================================================================

#[derive(Clone, Debug)]
pub struct SolarSizingEstimator {
    settings: EstimatorSettings,
    pricing: PricingTable,
}

impl SolarSizingEstimator {
    pub fn new(mut settings: EstimatorSettings, pricing: PricingTable) -> Result<Self> {
        settings.validate()?;
        pricing.validate()?;
        settings.inverter_ratings_kw.sort_by(|a, b| a.total_cmp(b));
        settings.inverter_ratings_kw.dedup();
        Ok(Self { settings, pricing })
    }

    pub fn settings(&self) -> &EstimatorSettings { &self.settings }
    pub fn pricing(&self) -> &PricingTable { &self.pricing }

    pub fn estimate(&self, input: &SolarInput) -> Result<SolarResult> {
        input.validate()?;
        let s = &self.settings;

        let daily_need = input.monthly_consumption / DAYS_PER_MONTH;
        let required_capacity = daily_need / input.sun_hours / s.derating_factor;
        let panel_count = whole_units(required_capacity * 1000.0 / f64::from(s.panel_wattage))?;
        let (inverter_rating, inverter_units) = self.inverter_for(required_capacity)?;
        let battery_count = self.battery_modules(input, daily_need)?;

        let panels = self.pricing.price_of(&ComponentKey::panel(s.panel_wattage))?.multiply(panel_count)?;
        let inverters = self.pricing.price_of(&ComponentKey::inverter(inverter_rating))?.multiply(inverter_units)?;
        let mut subtotal = panels.add(&inverters)?;
        if battery_count > 0 {
            let batteries = self.pricing.price_of(&ComponentKey::battery(s.battery_module_kwh))?.multiply(battery_count)?;
            subtotal = subtotal.add(&batteries)?;
        }
        let system_cost = subtotal.add(&subtotal.scale(s.bos_markup)?)?;

        let installed_kw = f64::from(panel_count) * f64::from(s.panel_wattage) / 1000.0;
        let annual_production = installed_kw * input.sun_hours * DAYS_PER_YEAR * s.derating_factor;
        let annual_consumption = input.monthly_consumption * 12.0;
        let tariff = s.tariffs.for_usage(input.usage_type);

        let offset_kwh = annual_production.min(annual_consumption);
        let annual_savings = energy_charge(offset_kwh, tariff, &s.local_currency)?;
        let monthly_bill_before = energy_charge(input.monthly_consumption, tariff, &s.local_currency)?;
        let monthly_bill_after = match input.system_type {
            SystemType::OffGrid => Money::zero(&s.local_currency),
            _ => {
                let residual = (input.monthly_consumption - annual_production / 12.0).max(0.0);
                energy_charge(residual, tariff, &s.local_currency)?
            }
        };

        let payback = self.payback(&system_cost, &annual_savings)?;
        let lifetime_factor: f64 = (0..s.lifetime_years).map(|year| (1.0 - s.annual_degradation).powi(year as i32)).sum();
        let lifetime_savings = annual_savings.scale(to_decimal(lifetime_factor)?)?;

        let result = SolarResult {
            system_type: input.system_type,
            panel_count,
            required_capacity: ceil_hundredths(required_capacity),
            inverter_size: inverter_rating * f64::from(inverter_units),
            battery_capacity: f64::from(battery_count) * s.battery_module_kwh,
            battery_count,
            system_cost,
            annual_production: annual_production.round(),
            annual_savings,
            payback,
            lifetime_savings,
            co2_saved: (annual_production * s.emission_factor_kg_per_kwh).round(),
            monthly_bill_before,
            monthly_bill_after,
        };
        debug!(
            city = %input.city,
            usage = %input.usage_type,
            system = %input.system_type,
            panels = result.panel_count,
            inverter_kw = result.inverter_size,
            battery_kwh = result.battery_capacity,
            cost = %result.system_cost,
            payback = %result.payback,
            "solar system estimated"
        );
        Ok(result)
    }

    /// Smallest standard rating covering `capacity`; above the largest rating,
    /// several of the largest units run in parallel.
    fn inverter_for(&self, capacity: f64) -> Result<(f64, u32)> {
        let ratings = &self.settings.inverter_ratings_kw;
        if let Some(rating) = ratings.iter().copied().find(|r| *r >= capacity) {
            return Ok((rating, 1));
        }
        let largest = ratings.last().copied()
            .ok_or_else(|| StorefrontError::InvalidConfiguration("no standard inverter ratings".into()))?;
        Ok((largest, whole_units(capacity / largest)?))
    }

    fn battery_modules(&self, input: &SolarInput, daily_need: f64) -> Result<u32> {
        let s = &self.settings;
        let share = match input.system_type {
            SystemType::OnGrid => return Ok(0),
            SystemType::OffGrid => 1.0,
            SystemType::Hybrid => s.hybrid_backup_fraction,
        };
        let solar_share = input.sun_hours / HOURS_PER_DAY;
        let storage = daily_need * (s.autonomy_days - solar_share).max(0.0) / s.depth_of_discharge * share;
        whole_units(storage / s.battery_module_kwh)
    }

    fn payback(&self, system_cost: &Money, annual_savings: &Money) -> Result<Payback> {
        if annual_savings.amount() <= Decimal::ZERO {
            return Ok(Payback::NotApplicable);
        }
        let local_cost = system_cost.convert(self.settings.exchange_rate, annual_savings.currency())?;
        let years = local_cost.amount().checked_div(annual_savings.amount())
            .ok_or_else(|| StorefrontError::InvalidInput("payback period is out of range".into()))?;
        Ok(years
            .round_dp(1)
            .to_f64()
            .filter(|y| y.is_finite())
            .map_or(Payback::NotApplicable, Payback::Years))
    }
}

/// `kwh` billed at `tariff` per kWh, rounded to cents.
fn energy_charge(kwh: f64, tariff: Decimal, currency: &str) -> Result<Money> {
    let charge = to_decimal(kwh)?.checked_mul(tariff)
        .ok_or_else(|| StorefrontError::InvalidInput(format!("{kwh} kWh at {tariff} is out of range")))?;
    Ok(Money::new(charge.round_dp(2), currency))
}

/// Rounds a positive quantity up to whole units, never below one.
fn whole_units(quantity: f64) -> Result<u32> {
    let units = quantity.ceil().max(1.0);
    if !quantity.is_finite() || units > f64::from(u32::MAX) {
        return Err(StorefrontError::InvalidInput(format!("{quantity} units is out of range")));
    }
    Ok(units as u32)
}

/// Rounds up so tiny loads never report a zero-capacity system.
fn ceil_hundredths(value: f64) -> f64 {
    ((value * 100.0).ceil() / 100.0).max(0.01)
}

fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| StorefrontError::InvalidInput(format!("value {value} is out of range")))
}
