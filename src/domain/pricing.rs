//! Component pricing table
//!
//! Unit prices for panels, inverters and battery modules. The table is edited
//! by admins and handed to the estimator as-is; a missing key is a hard
//! failure, never a zero price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::value_objects::{ComponentKey, Money};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentPrice {
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    /// Billing unit shown to admins, e.g. `piece`.
    #[serde(default = "default_unit")]
    pub unit: String,
    pub price: Money,
}

fn default_unit() -> String { "piece".to_string() }

fn check_price(key: &ComponentKey, component: &ComponentPrice) -> Result<()> {
    if component.price.is_negative() {
        return Err(StorefrontError::InvalidConfiguration(format!("negative price for `{key}`")));
    }
    Ok(())
}

/// History record produced by every admin price edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub key: ComponentKey,
    pub old_price: Option<Decimal>,
    pub new_price: Decimal,
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    components: BTreeMap<ComponentKey, ComponentPrice>,
}

impl PricingTable {
    pub fn new() -> Self { Self::default() }

    pub fn from_components(components: impl IntoIterator<Item = (ComponentKey, ComponentPrice)>) -> Result<Self> {
        let mut table = Self::new();
        for (key, price) in components { table.insert(key, price)?; }
        Ok(table)
    }

    pub fn insert(&mut self, key: ComponentKey, component: ComponentPrice) -> Result<()> {
        check_price(&key, &component)?;
        self.components.insert(key, component);
        Ok(())
    }

    /// Checks a table that was deserialized rather than built through `insert`.
    pub fn validate(&self) -> Result<()> {
        self.components.iter().try_for_each(|(key, component)| check_price(key, component))
    }

    pub fn get(&self, key: &ComponentKey) -> Result<&ComponentPrice> {
        self.components.get(key).ok_or_else(|| StorefrontError::ConfigurationMissing(key.to_string()))
    }

    pub fn price_of(&self, key: &ComponentKey) -> Result<&Money> { self.get(key).map(|c| &c.price) }

    pub fn len(&self) -> usize { self.components.len() }
    pub fn is_empty(&self) -> bool { self.components.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&ComponentKey, &ComponentPrice)> { self.components.iter() }

    /// Replaces the unit price of an existing component and returns the history record.
    pub fn set_price(&mut self, key: &ComponentKey, amount: Decimal, changed_by: Option<String>, changed_at: DateTime<Utc>) -> Result<PriceChange> {
        let component = self.components.get_mut(key).ok_or_else(|| StorefrontError::ConfigurationMissing(key.to_string()))?;
        let updated = ComponentPrice { price: Money::new(amount, component.price.currency()), ..component.clone() };
        check_price(key, &updated)?;
        let old_price = component.price.amount();
        *component = updated;
        tracing::info!(component = %key, %old_price, new_price = %amount, "component price updated");
        Ok(PriceChange { key: key.clone(), old_price: Some(old_price), new_price: amount, changed_by, changed_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> ComponentPrice {
        ComponentPrice { name_ar: "لوح شمسي".into(), name_en: Some("Solar panel".into()), unit: "piece".into(), price: Money::usd(Decimal::new(120, 0)) }
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let table = PricingTable::new();
        let err = table.price_of(&ComponentKey::panel(450)).unwrap_err();
        assert_eq!(err, StorefrontError::ConfigurationMissing("panel_450w".into()));
    }

    #[test]
    fn test_rejects_negative_price() {
        let mut bad = panel();
        bad.price = Money::usd(Decimal::new(-1, 0));
        assert!(PricingTable::from_components([(ComponentKey::panel(450), bad)]).is_err());

        let json = r#"{"panel_450w": {"name_ar": "لوح", "price": {"amount": "-5", "currency": "USD"}}}"#;
        let table: PricingTable = serde_json::from_str(json).unwrap();
        assert!(matches!(table.validate(), Err(StorefrontError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_set_price_records_history() {
        let key = ComponentKey::panel(450);
        let mut table = PricingTable::from_components([(key.clone(), panel())]).unwrap();
        let change = table.set_price(&key, Decimal::new(135, 0), Some("admin".into()), Utc::now()).unwrap();
        assert_eq!(change.old_price, Some(Decimal::new(120, 0)));
        assert_eq!(change.new_price, Decimal::new(135, 0));
        assert_eq!(table.price_of(&key).unwrap().amount(), Decimal::new(135, 0));
        assert_eq!(table.price_of(&key).unwrap().currency(), "USD");
    }

    #[test]
    fn test_set_price_rejects_negative_like_insert() {
        let key = ComponentKey::panel(450);
        let mut table = PricingTable::from_components([(key.clone(), panel())]).unwrap();
        let err = table.set_price(&key, Decimal::new(-1, 0), None, Utc::now()).unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidConfiguration(_)));
        assert_eq!(table.price_of(&key).unwrap().amount(), Decimal::new(120, 0));
        assert!(table.set_price(&key, Decimal::ZERO, None, Utc::now()).is_ok());
    }

    #[test]
    fn test_set_price_unknown_key() {
        let mut table = PricingTable::new();
        assert!(table.set_price(&ComponentKey::battery(5.0), Decimal::ONE, None, Utc::now()).is_err());
    }

    #[test]
    fn test_deserializes_from_key_map() {
        let json = r#"{"panel_450w": {"name_ar": "لوح", "price": {"amount": "120", "currency": "USD"}}}"#;
        let table: PricingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&ComponentKey::panel(450)).unwrap().unit, "piece");
    }
}
