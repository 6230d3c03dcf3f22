//! Domain events
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Confirmed { order_id: String },
    Shipped { order_id: String, tracking: Option<String>, notes: Option<String> },
    Delivered { order_id: String },
    Cancelled { order_id: String },
    DeliveryRescheduled { order_id: String, estimated_delivery: DateTime<Utc> },
}
