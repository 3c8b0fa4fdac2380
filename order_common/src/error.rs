//! Error types shared by the order submitter and the feed listener.
//!
//! `ClientError` is the closed taxonomy both channels report through. Transport
//! failures are folded into it with [`ClientError::from_io`], so callers can branch
//! on the variant instead of matching message text.
use std::io::{self, ErrorKind};

use thiserror::Error;

/// Unified error type for the order client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Nothing is listening at the target address/port.
    #[error("Connection refused: the order server is not running or not accepting connections")]
    Refused,

    /// The peer closed the connection in the middle of an exchange.
    #[error("Connection reset: the server closed the connection unexpectedly")]
    Reset,

    /// Any other transport-level failure (unreachable network, bad address, partial send).
    #[error("Socket error: {0}")]
    Socket(String),

    /// A configured connect/read/write deadline expired.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Failure that does not fit any of the kinds above.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Order fields were rejected before anything was sent.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Configuration file or values could not be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Classify an I/O error from a socket operation.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::ConnectionRefused => ClientError::Refused,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ClientError::Reset,
            ErrorKind::TimedOut | ErrorKind::WouldBlock => ClientError::Timeout(err.to_string()),
            ErrorKind::NotConnected
            | ErrorKind::AddrInUse
            | ErrorKind::AddrNotAvailable
            | ErrorKind::NetworkUnreachable
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkDown
            | ErrorKind::Interrupted
            | ErrorKind::WriteZero
            | ErrorKind::InvalidInput => ClientError::Socket(err.to_string()),
            _ => ClientError::Unexpected(err.to_string()),
        }
    }

    /// Whether the error came from the transport rather than from local validation.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ClientError::InvalidOrder(_) | ClientError::Config(_))
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        ClientError::from_io(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}
