//! Calculator quote export
//!
//! Bundles a calculation with the customer's contact details so it can be
//! printed, mailed or shared. Rendering and delivery happen elsewhere.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::solar::{SolarInput, SolarResult, SystemType, UsageType};
use crate::domain::value_objects::Money;
use crate::{Result, StorefrontError};

pub const QUOTE_VALIDITY_DAYS: i64 = 30;
/// Share of consumption quoted as expected monthly production.
const PRODUCTION_QUOTE_RATIO: f64 = 0.9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactInfo {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
}

impl ContactInfo {
    pub fn normalized(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self.validate().map_err(|e| StorefrontError::InvalidInput(e.to_string()))?;
        Ok(self)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub id: Uuid,
    pub quote_number: String,
    pub contact: ContactInfo,
    pub city: String,
    pub usage_type: UsageType,
    pub system_type: SystemType,
    pub panel_count: u32,
    pub capacity_kw: f64,
    pub inverter_size_kw: f64,
    pub battery_count: Option<u32>,
    pub monthly_production_kwh: u64,
    pub total_cost: Money,
    pub annual_savings: Money,
    pub issued_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl QuoteSummary {
    pub fn issue(input: &SolarInput, result: &SolarResult, contact: ContactInfo, issued_at: DateTime<Utc>) -> Result<Self> {
        let contact = contact.normalized()?;
        let quote = Self {
            id: Uuid::now_v7(),
            quote_number: quote_number(issued_at),
            contact,
            city: input.city.clone(),
            usage_type: input.usage_type,
            system_type: result.system_type,
            panel_count: result.panel_count,
            capacity_kw: result.required_capacity,
            inverter_size_kw: result.inverter_size,
            battery_count: (result.battery_count > 0).then_some(result.battery_count),
            monthly_production_kwh: (input.monthly_consumption * PRODUCTION_QUOTE_RATIO).round() as u64,
            total_cost: result.system_cost.clone(),
            annual_savings: result.annual_savings.clone(),
            issued_at,
            valid_until: issued_at + Duration::days(QUOTE_VALIDITY_DAYS),
        };
        tracing::info!(quote = %quote.quote_number, system = %quote.system_type, total = %quote.total_cost, "calculator quote issued");
        Ok(quote)
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool { at <= self.valid_until }
}

/// `CALC-` followed by the issue time in milliseconds, base 36, upper case.
fn quote_number(issued_at: DateTime<Utc>) -> String {
    let mut millis = issued_at.timestamp_millis().max(0) as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(std::char::from_digit((millis % 36) as u32, 36).unwrap_or('0').to_ascii_uppercase());
        millis /= 36;
        if millis == 0 { break; }
    }
    format!("CALC-{}", digits.iter().rev().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::solar::Payback;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn contact() -> ContactInfo {
        ContactInfo { name: " Mazin ".into(), email: "client@example.com".into(), phone: Some("249123456789".into()) }
    }

    fn calculation(system_type: SystemType, battery_count: u32) -> (SolarInput, SolarResult) {
        let input = SolarInput { monthly_consumption: 600.0, usage_type: UsageType::Residential, city: "Khartoum".into(), sun_hours: 6.0, system_type };
        let result = SolarResult {
            system_type,
            panel_count: 10,
            required_capacity: 4.17,
            inverter_size: 5.0,
            battery_capacity: f64::from(battery_count) * 5.0,
            battery_count,
            system_cost: Money::usd(Decimal::new(2300, 0)),
            annual_production: 7884.0,
            annual_savings: Money::new(Decimal::new(108_000, 0), "SDG"),
            payback: Payback::Years(12.8),
            lifetime_savings: Money::new(Decimal::new(2_544_000, 0), "SDG"),
            co2_saved: 3942.0,
            monthly_bill_before: Money::new(Decimal::new(9000, 0), "SDG"),
            monthly_bill_after: Money::zero("SDG"),
        };
        (input, result)
    }

    #[test]
    fn test_issue_quote() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let (input, result) = calculation(SystemType::Hybrid, 2);
        let quote = QuoteSummary::issue(&input, &result, contact(), issued).unwrap();
        assert!(quote.quote_number.starts_with("CALC-"));
        assert_eq!(quote.contact.name, "Mazin");
        assert_eq!(quote.monthly_production_kwh, 540);
        assert_eq!(quote.battery_count, Some(2));
        assert_eq!(quote.valid_until, Utc.with_ymd_and_hms(2026, 3, 31, 10, 0, 0).unwrap());
        assert!(quote.is_valid_at(issued + Duration::days(30)));
        assert!(!quote.is_valid_at(issued + Duration::days(31)));
    }

    #[test]
    fn test_on_grid_quote_has_no_batteries() {
        let (input, result) = calculation(SystemType::OnGrid, 0);
        let quote = QuoteSummary::issue(&input, &result, contact(), Utc::now()).unwrap();
        assert_eq!(quote.battery_count, None);
    }

    #[test]
    fn test_rejects_bad_contact() {
        let (input, result) = calculation(SystemType::OnGrid, 0);
        let no_at = ContactInfo { email: "client.example.com".into(), ..contact() };
        assert!(matches!(QuoteSummary::issue(&input, &result, no_at, Utc::now()), Err(StorefrontError::InvalidInput(_))));
        let blank = ContactInfo { name: "   ".into(), ..contact() };
        assert!(QuoteSummary::issue(&input, &result, blank, Utc::now()).is_err());
    }

    #[test]
    fn test_blank_phone_is_dropped() {
        let c = ContactInfo { phone: Some("  ".into()), ..contact() }.normalized().unwrap();
        assert_eq!(c.phone, None);
    }

    #[test]
    fn test_quote_number_base36() {
        assert_eq!(quote_number(Utc.timestamp_millis_opt(0).unwrap()), "CALC-0");
        assert_eq!(quote_number(Utc.timestamp_millis_opt(36 * 36 + 35).unwrap()), "CALC-10Z");
    }
}
