//! Storefront domain
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod quote;
pub mod solar;
pub mod tracking;
pub mod value_objects;
