//! Stub order server.
//!
//! A stand-in for the external matching engine, used to run the order client
//! locally. It speaks the engine's wire protocol and nothing more: there is no
//! book and no matching. It wires together three building blocks:
//!
//! - `OrderReceiver` — accepts order connections, acknowledges each decoded order
//!   with `Order added: <payload>` and publishes it as an `OrderEvent`.
//! - `OrderGenerator` — injects a random order every few seconds so the feed is
//!   never silent.
//! - `FeedBroadcaster` — keeps every feed connection and writes one
//!   `ORDER ...` line per event to all of them.
//!
//! Orders and generated events meet in one `crossbeam_channel`; the broadcaster
//! drains it on the main thread.
#![warn(missing_docs)]
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::unbounded;
use log::{error, info};
use order_common::net::{FEED_PORT, ORDER_PORT, addr};

use crate::error::Result;
use crate::feed::FeedBroadcaster;
use crate::model::order_event::{OrderEvent, OrderIds};
use crate::model::order_generator::OrderGenerator;
use crate::receiver::OrderReceiver;

mod error;
mod feed;
pub mod model;
mod receiver;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port for order submissions.
    #[clap(long, default_value_t = ORDER_PORT)]
    orders_port: u16,

    /// Port for the streaming feed.
    #[clap(long, default_value_t = FEED_PORT)]
    feed_port: u16,

    /// Seconds between generated orders (0 disables the generator).
    #[clap(long, default_value_t = 15)]
    generate_interval_secs: u64,

    /// Milliseconds a feed client may block a write before it is dropped.
    #[clap(long, default_value_t = 2000)]
    feed_write_timeout_ms: u64,
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let ids = Arc::new(OrderIds::default());
    let (events_tx, events_rx) = unbounded::<OrderEvent>();

    let receiver = OrderReceiver::new(&addr("0.0.0.0", args.orders_port))?;
    let feed = FeedBroadcaster::new(&addr("0.0.0.0", args.feed_port))?
        .with_write_timeout(Duration::from_millis(args.feed_write_timeout_ms));

    if args.generate_interval_secs > 0 {
        OrderGenerator::start(
            Duration::from_secs(args.generate_interval_secs),
            Arc::clone(&ids),
            events_tx.clone(),
        );
    } else {
        info!("Order generator disabled");
    }

    thread::spawn(move || {
        if let Err(e) = receiver.receive_loop(ids, events_tx) {
            error!("Receiver loop failed: {:?}", e);
        }
    });

    feed.run(events_rx)
}

fn init_logger() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
