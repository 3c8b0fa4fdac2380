//! Order client library.
//!
//! Two independent channels to the order server:
//! - `submitter` — one TCP round trip per order (`OrderSubmitter::submit`).
//! - `listener` — one long-lived TCP connection forwarding pushed updates to a
//!   `FeedSink` (`FeedListener::spawn`).
//!
//! They share no connection or state. `sink` holds the event types and the
//! channel sink used to move feed events onto the presentation thread, and
//! `console` is the terminal presentation loop built on top of both.
#![warn(missing_docs)]
pub mod console;
pub mod listener;
pub mod sink;
pub mod submitter;
mod transport;

pub use listener::{CancelToken, FeedExit, FeedHandle, FeedListener};
pub use sink::{ChannelSink, FeedEvent, FeedMessage, FeedSink, SinkClosed};
pub use submitter::{OrderSubmitter, Response};
