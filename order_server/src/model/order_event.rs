//! Accepted orders and their feed representation.
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use order_common::Order;

/// Hands out order ids shared by client orders and generated ones.
#[derive(Debug)]
pub struct OrderIds(AtomicU64);

impl Default for OrderIds {
    fn default() -> Self {
        OrderIds(AtomicU64::new(1))
    }
}

impl OrderIds {
    /// Next id, starting at 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Submitted over the orders endpoint.
    Client,
    /// Injected by the order generator.
    Generated,
}

/// An order the server accepted, ready to be broadcast.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    /// Server-assigned id.
    pub id: u64,
    /// The order itself.
    pub order: Order,
    /// Submitter of the order.
    pub origin: Origin,
    /// Acceptance time.
    pub accepted_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Stamp an order with an id and the current time.
    pub fn accept(ids: &OrderIds, order: Order, origin: Origin) -> Self {
        OrderEvent {
            id: ids.next(),
            order,
            origin,
            accepted_at: Utc::now(),
        }
    }

    /// Line pushed to feed clients:
    /// `ORDER <id> <BUY|SELL> <price> <quantity> <rfc3339 timestamp>\n`.
    pub fn to_feed_line(&self) -> String {
        format!(
            "ORDER {} {} {} {} {}\n",
            self.id,
            self.order.side().name(),
            self.order.price(),
            self.order.quantity(),
            self.accepted_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}
