//! Domain models for the stub order server.
//!
//! - `order_event` — an accepted order as announced on the feed.
//! - `order_generator` — background thread injecting random orders.

pub mod order_event;
pub mod order_generator;
