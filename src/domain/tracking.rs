//! Delivery countdown
//!
//! Remaining time until the promised delivery and how far along the delivery
//! window the order is. [`delivery_countdown`] is a pure function;
//! [`CountdownTicker`] re-evaluates it on a timer for as long as the ticker
//! lives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::aggregates::OrderStatus;

const MINUTES_PER_DAY: i64 = 24 * 60;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;
/// Below this many hours on the last day an order counts as arriving soon.
const ARRIVING_SOON_HOURS: i64 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub is_overdue: bool,
    /// Signed; negative once overdue.
    pub total_hours_remaining: f64,
    pub progress_percentage: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum DeliveryHint {
    Overdue,
    ArrivingSoon,
    Today,
    Tomorrow,
    InDays(i64),
}

impl TimeRemaining {
    pub fn hint(&self) -> DeliveryHint {
        match (self.is_overdue, self.days) {
            (true, _) => DeliveryHint::Overdue,
            (false, 0) if self.hours < ARRIVING_SOON_HOURS => DeliveryHint::ArrivingSoon,
            (false, 0) => DeliveryHint::Today,
            (false, 1) => DeliveryHint::Tomorrow,
            (false, days) => DeliveryHint::InDays(days),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Countdown {
    Delivered,
    Cancelled,
    /// No delivery date has been promised yet.
    AwaitingSchedule,
    Running(TimeRemaining),
}

impl Countdown {
    pub fn is_terminal(&self) -> bool { matches!(self, Countdown::Delivered | Countdown::Cancelled) }
}

pub fn delivery_countdown(
    now: DateTime<Utc>,
    created_at: DateTime<Utc>,
    estimated_delivery: Option<DateTime<Utc>>,
    status: OrderStatus,
) -> Countdown {
    match status {
        OrderStatus::Delivered => return Countdown::Delivered,
        OrderStatus::Cancelled => return Countdown::Cancelled,
        _ => {}
    }
    let Some(delivery) = estimated_delivery else {
        return Countdown::AwaitingSchedule;
    };

    let diff = delivery - now;
    let total_minutes = diff.num_minutes().abs();
    let window = (delivery - created_at).num_milliseconds();
    let progress_percentage = if window <= 0 {
        100.0
    } else {
        let elapsed = (now - created_at).num_milliseconds();
        (elapsed as f64 / window as f64 * 100.0).clamp(0.0, 100.0)
    };

    Countdown::Running(TimeRemaining {
        days: total_minutes / MINUTES_PER_DAY,
        hours: (total_minutes % MINUTES_PER_DAY) / 60,
        minutes: total_minutes % 60,
        is_overdue: diff.num_milliseconds() < 0,
        total_hours_remaining: diff.num_milliseconds() as f64 / MILLIS_PER_HOUR,
        progress_percentage,
    })
}

/// Inputs of one countdown, fixed for the lifetime of a ticker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountdownRequest {
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub status: OrderStatus,
}

impl CountdownRequest {
    pub fn evaluate(&self, now: DateTime<Utc>) -> Countdown {
        delivery_countdown(now, self.created_at, self.estimated_delivery, self.status)
    }
}

/// Periodically refreshed countdown. Must be spawned inside a tokio runtime;
/// the timer stops when the ticker is stopped or dropped.
pub struct CountdownTicker {
    receiver: watch::Receiver<Countdown>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTicker {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

    pub fn spawn(request: CountdownRequest, period: Duration) -> Self {
        Self::spawn_with_clock(request, period, Utc::now)
    }

    pub fn spawn_with_clock<C>(request: CountdownRequest, period: Duration, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(request.evaluate(clock()));
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let countdown = request.evaluate(clock());
                        let terminal = countdown.is_terminal();
                        if sender.send(countdown).is_err() || terminal {
                            break;
                        }
                    }
                }
            }
            debug!(status = %request.status, "countdown ticker stopped");
        });
        Self { receiver, token, handle: Some(handle) }
    }

    pub fn current(&self) -> Countdown { *self.receiver.borrow() }

    pub fn subscribe(&self) -> watch::Receiver<Countdown> { self.receiver.clone() }

    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) { self.token.cancel(); }
}
