//! Random order injection.
//!
//! The `OrderGenerator` runs a background thread that periodically synthesizes a
//! limit order and pushes it into the same event channel client orders go to, so
//! feed clients see activity even when nobody is submitting.
//!
//! Prices are `100.0 + n/10` for `n` in `0..2000`, quantities `1..=100`, sides
//! uniformly random.
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info};
use order_common::{Order, Side};
use rand::Rng;

use crate::error::Result;
use crate::model::order_event::{OrderEvent, OrderIds, Origin};

/// Background generator of random orders.
pub struct OrderGenerator;

impl OrderGenerator {
    /// Build one random order.
    pub fn random_order<R: Rng>(rng: &mut R) -> Result<Order> {
        let side = if rng.random_bool(0.5) { Side::Buy } else { Side::Sell };
        let price = 100.0 + f64::from(rng.random_range(0..2000u32)) / 10.0;
        let quantity = rng.random_range(1..=100u32);
        Ok(Order::new(side, &format!("{:.1}", price), &quantity.to_string())?)
    }

    /// Start the generator thread. It stops once `events_tx` has no receiver.
    pub fn start(interval: Duration, ids: Arc<OrderIds>, events_tx: Sender<OrderEvent>) {
        thread::spawn(move || {
            info!("Order generator started, one order every {:?}", interval);
            let mut rng = rand::rng();
            loop {
                thread::sleep(interval);
                let order = match Self::random_order(&mut rng) {
                    Ok(order) => order,
                    Err(e) => {
                        debug!("Skipping generated order: {}", e);
                        continue;
                    }
                };
                let event = OrderEvent::accept(&ids, order, Origin::Generated);
                debug!("Generated order {}: {}", event.id, event.order);
                if events_tx.send(event).is_err() {
                    break;
                }
            }
            info!("Order generator stopping...");
        });
    }
}
