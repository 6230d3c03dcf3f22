//! Solar Storefront
//!
//! Calculator and order-tracking core for the solar, CCTV and industrial
//! equipment storefront.
//!
//! ## Features
//! - Solar system sizing with cost and ROI projection
//! - Admin-editable component pricing table
//! - Calculator quote export
//! - Order tracking timeline and delivery countdown

pub mod config;
pub mod domain;

pub use config::{Config, ServerConfig};
pub use domain::aggregates::{Order, OrderStatus, ShippingEntry};
pub use domain::pricing::{ComponentPrice, PriceChange, PricingTable};
pub use domain::quote::{ContactInfo, QuoteSummary};
pub use domain::solar::{
    EstimatorSettings, Payback, SolarInput, SolarResult, SolarSizingEstimator, SystemType,
    UsageType,
};
pub use domain::tracking::{
    delivery_countdown, Countdown, CountdownRequest, CountdownTicker, DeliveryHint, TimeRemaining,
};
pub use domain::value_objects::{ComponentKey, Money};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorefrontError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing price for component `{0}`")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Currency mismatch: {0} vs {1}")]
    CurrencyMismatch(String, String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
