//! Value Objects for the storefront calculator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, StorefrontError};

/// Pricing table key, e.g. `panel_450w`, `inverter_5kw`, `battery_5kwh`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentKey(String);

impl ComponentKey {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() {
            return Err(StorefrontError::InvalidInput("component key is empty".into()));
        }
        if value.len() > 50 {
            return Err(StorefrontError::InvalidInput(format!("component key `{value}` is too long")));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StorefrontError::InvalidInput(format!("component key `{value}` has invalid characters")));
        }
        Ok(Self(value))
    }

    pub fn panel(wattage: u32) -> Self { Self(format!("panel_{wattage}w")) }
    pub fn inverter(rating_kw: f64) -> Self { Self(format!("inverter_{}kw", rating_label(rating_kw))) }
    pub fn battery(module_kwh: f64) -> Self { Self(format!("battery_{}kwh", rating_label(module_kwh))) }

    pub fn as_str(&self) -> &str { &self.0 }
}

/// `7.5` -> `7_5`, so keys stay bare TOML keys.
fn rating_label(value: f64) -> String { value.to_string().replace('.', "_") }

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for ComponentKey {
    type Error = StorefrontError;
    fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<ComponentKey> for String {
    fn from(key: ComponentKey) -> Self { key.0 }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money> {
        if self.currency != other.currency {
            return Err(StorefrontError::CurrencyMismatch(self.currency.clone(), other.currency.clone()));
        }
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| out_of_range(&self.currency))?;
        Ok(Money::new(amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Result<Money> {
        let amount = self.amount.checked_mul(Decimal::from(qty)).ok_or_else(|| out_of_range(&self.currency))?;
        Ok(Money::new(amount, &self.currency))
    }

    /// Scales the amount by a decimal factor and rounds to cents.
    pub fn scale(&self, factor: Decimal) -> Result<Money> {
        let amount = self.amount.checked_mul(factor).ok_or_else(|| out_of_range(&self.currency))?;
        Ok(Money::new(amount.round_dp(2), &self.currency))
    }

    /// Converts into another currency at `rate` target units per unit of `self`.
    pub fn convert(&self, rate: Decimal, currency: &str) -> Result<Money> {
        let amount = self.amount.checked_mul(rate).ok_or_else(|| out_of_range(currency))?;
        Ok(Money::new(amount.round_dp(2), currency))
    }
}

fn out_of_range(currency: &str) -> StorefrontError {
    StorefrontError::InvalidInput(format!("amount exceeds the representable {currency} range"))
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount.round_dp(2), self.currency) }
}
