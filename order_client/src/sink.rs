//! Consumers of feed events.
//!
//! The listener runs on its own thread, so whatever it hands events to must be
//! `Send`. Presentation state should not be touched from that thread directly:
//! use a [`ChannelSink`] and drain the receiver on the thread that owns the
//! display.
use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use order_common::ClientError;
use thiserror::Error;

/// One chunk read from the feed connection, decoded as text.
///
/// Chunks are forwarded exactly as read: a logical server message may be split
/// across chunks or share one with its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage(String);

impl FeedMessage {
    /// Decode one read lossily. A multi-byte character split across two reads
    /// becomes U+FFFD in both chunks.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        FeedMessage(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Chunk text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FeedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the feed listener reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A chunk of pushed data.
    Message(FeedMessage),
    /// The connection failed; the listener stops or reconnects after this.
    Error(ClientError),
    /// A dropped connection is about to be re-opened.
    Reconnecting {
        /// 1-based attempt number since the last stable connection.
        attempt: u32,
    },
    /// The server closed the feed connection normally.
    Closed,
}

impl fmt::Display for FeedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedEvent::Message(message) => write!(f, "{}", message),
            FeedEvent::Error(err) => write!(f, "Feed error: {}", err),
            FeedEvent::Reconnecting { attempt } => {
                write!(f, "Feed connection lost, reconnecting (attempt {})", attempt)
            }
            FeedEvent::Closed => f.write_str("Feed closed by server"),
        }
    }
}

/// The consumer went away; the listener stops when it sees this.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Feed sink closed")]
pub struct SinkClosed;

/// Receiver of feed events, invoked from the listener thread.
pub trait FeedSink: Send {
    /// Handle one event. Returning `Err(SinkClosed)` stops the listener.
    fn deliver(&mut self, event: FeedEvent) -> Result<(), SinkClosed>;
}

impl<F> FeedSink for F
where
    F: FnMut(FeedEvent) + Send,
{
    fn deliver(&mut self, event: FeedEvent) -> Result<(), SinkClosed> {
        self(event);
        Ok(())
    }
}

/// Posts events onto a channel owned by another execution context.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<FeedEvent>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    pub fn new(tx: Sender<FeedEvent>) -> Self {
        ChannelSink { tx }
    }

    /// Create a sink together with the receiving end for the display context.
    pub fn unbounded() -> (Self, Receiver<FeedEvent>) {
        let (tx, rx) = unbounded();
        (ChannelSink::new(tx), rx)
    }
}

impl FeedSink for ChannelSink {
    fn deliver(&mut self, event: FeedEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).map_err(|_| SinkClosed)
    }
}
