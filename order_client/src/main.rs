//! Order Client — a TCP client that submits buy/sell orders to an order server and
//! prints the live feed the server pushes on a second connection.
//!
//! Orders go to the orders endpoint, one connection per order; the feed listener
//! keeps a single connection to the feed endpoint open on a background thread and
//! posts what it reads to the console, which prints it between prompts.
//!
//! Usage example (CLI):
//! ```bash
//! order_client                                  # interactive prompts + live feed
//! order_client --order "0 100.5 10" --no-feed   # submit one order and exit
//! order_client --config ./client.json --reconnect-attempts 5
//! ```
//!
//! Ctrl+C, end of input or typing `quit` stops the client and its feed listener.
#![warn(missing_docs)]
mod args;

use std::io::{self, BufRead};
use std::thread;

use clap::Parser;
use crossbeam_channel::{Receiver, bounded, unbounded};
use log::{error, info, warn};
use order_client::console::ConsoleSession;
use order_client::{ChannelSink, FeedListener, OrderSubmitter};
use order_common::{ClientConfig, ClientError, Order, Result};

use crate::args::Args;

fn main() -> Result<(), ClientError> {
    let args = Args::parse();
    init_logger(args.default_log_level());
    let config = args.client_config()?;
    info!(
        "Orders endpoint: {}, feed endpoint: {}",
        config.orders_addr, config.feed_addr
    );

    match &args.order {
        Some(raw) => submit_once(config, raw),
        None => run_console(config, args.no_feed),
    }
}

/// Submit a single order given on the command line and print the response.
fn submit_once(config: ClientConfig, raw: &str) -> Result<(), ClientError> {
    let order = Order::decode(raw)?;
    match OrderSubmitter::new(config).submit(&order) {
        Ok(response) => {
            println!("Server response: {}", response.as_str().trim_end());
            Ok(())
        }
        Err(e) => {
            error!("Order not sent: {}", e);
            Err(e)
        }
    }
}

/// Interactive loop: prompts on the main thread, feed on a background thread.
fn run_console(config: ClientConfig, no_feed: bool) -> Result<(), ClientError> {
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down client...");
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| ClientError::Unexpected(format!("Error setting Ctrl+C handler: {}", e)))?;

    let (feed_sink, feed_rx) = ChannelSink::unbounded();
    let feed = if no_feed {
        drop(feed_sink);
        None
    } else {
        Some(FeedListener::new(config.clone()).spawn(feed_sink)?)
    };

    let lines = spawn_stdin_reader()?;
    let mut session = ConsoleSession::new(OrderSubmitter::new(config), io::stdout());
    let end = session.run(&lines, &feed_rx, &shutdown_rx)?;
    info!("Console session ended: {:?}", end);

    if let Some(handle) = feed {
        handle.cancel();
        info!("Feed listener stopped: {:?}", handle.join());
    }
    Ok(())
}

/// Read stdin lines on a helper thread so the console can wait on them together
/// with feed events. The channel disconnects at end of input.
fn spawn_stdin_reader() -> Result<Receiver<String>, ClientError> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read from stdin: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn init_logger(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
