//! Order Aggregate
//!
//! Tracking view of a storefront order: where it sits on the delivery
//! timeline, its shipping history and the promised delivery date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::tracking::{delivery_countdown, Countdown};
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Timeline shown to customers; `Cancelled` is off the timeline.
    pub const STEPS: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ];

    pub fn is_terminal(self) -> bool { matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled) }

    pub fn step_index(self) -> Option<usize> { Self::STEPS.iter().position(|s| *s == self) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShippingEntry {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Order {
    id: String,
    order_number: String,
    email: String,
    status: OrderStatus,
    tracking_number: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    history: Vec<ShippingEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Order {
    pub fn create(order_number: impl Into<String>, email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(), order_number: order_number.into(), email: email.into(),
            status: OrderStatus::Pending, tracking_number: None, estimated_delivery: None,
            history: vec![ShippingEntry { status: OrderStatus::Pending, notes: None, at: created_at }],
            created_at, updated_at: created_at, events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn email(&self) -> &str { &self.email }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }
    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> { self.estimated_delivery }
    pub fn history(&self) -> &[ShippingEntry] { &self.history }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn schedule_delivery(&mut self, estimated: DateTime<Utc>, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(StorefrontError::InvalidInput(format!("order is already {}", self.status)));
        }
        if estimated < self.created_at {
            return Err(StorefrontError::InvalidInput("estimated delivery precedes the order".into()));
        }
        self.estimated_delivery = Some(estimated);
        self.touch(at);
        self.raise_event(DomainEvent::Order(OrderEvent::DeliveryRescheduled { order_id: self.id.clone(), estimated_delivery: estimated }));
        Ok(())
    }

    pub fn confirm(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.advance(OrderStatus::Confirmed, None, at)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed { order_id: self.id.clone() }));
        Ok(())
    }

    pub fn prepare(&mut self, at: DateTime<Utc>) -> Result<()> { self.advance(OrderStatus::Preparing, None, at) }

    /// Hands the order to the carrier; a blank tracking number is ignored.
    pub fn ship(&mut self, tracking_number: Option<String>, notes: Option<String>, at: DateTime<Utc>) -> Result<()> {
        let tracking = tracking_number.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        self.advance(OrderStatus::Shipped, notes.clone(), at)?;
        self.tracking_number = tracking.clone();
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id.clone(), tracking, notes }));
        Ok(())
    }

    pub fn mark_in_transit(&mut self, notes: Option<String>, at: DateTime<Utc>) -> Result<()> { self.advance(OrderStatus::InTransit, notes, at) }

    pub fn deliver(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.advance(OrderStatus::Delivered, None, at)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id.clone() }));
        Ok(())
    }

    pub fn cancel(&mut self, notes: Option<String>, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() { return Err(self.transition_error(OrderStatus::Cancelled)); }
        self.record(OrderStatus::Cancelled, notes, at);
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id.clone() }));
        Ok(())
    }

    /// Position on the timeline, `None` once cancelled.
    pub fn step_index(&self) -> Option<usize> { self.status.step_index() }

    pub fn step_progress_percentage(&self) -> f64 {
        self.step_index().map_or(0.0, |i| i as f64 / (OrderStatus::STEPS.len() - 1) as f64 * 100.0)
    }

    /// Whether a customer lookup (order number or carrier tracking number) refers to this order.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let reference = reference.trim();
        !reference.is_empty()
            && (self.order_number.eq_ignore_ascii_case(reference)
                || self.tracking_number.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(reference)))
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        delivery_countdown(now, self.created_at, self.estimated_delivery, self.status)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    // Steps may be skipped but never revisited.
    fn advance(&mut self, next: OrderStatus, notes: Option<String>, at: DateTime<Utc>) -> Result<()> {
        match (self.status.step_index(), next.step_index()) {
            (Some(current), Some(target)) if target > current => {
                self.record(next, notes, at);
                Ok(())
            }
            _ => Err(self.transition_error(next)),
        }
    }

    fn record(&mut self, status: OrderStatus, notes: Option<String>, at: DateTime<Utc>) {
        self.status = status;
        self.history.push(ShippingEntry { status, notes, at });
        self.touch(at);
    }

    fn transition_error(&self, to: OrderStatus) -> StorefrontError {
        StorefrontError::InvalidTransition { from: self.status.to_string(), to: to.to_string() }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self, at: DateTime<Utc>) { self.updated_at = at; }
}
