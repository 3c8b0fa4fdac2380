//! Error types used across the stub order server.
//!
//! Most functions here return `Result<T>` (an alias whose default error type is
//! `ServerError`), allowing the `?` operator to be used ergonomically.
use std::io;
use std::sync::PoisonError;

use order_common::ClientError;
use thiserror::Error;

/// Unified error type for networking, channel operations, and shared state.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Wrapper for underlying `std::io::Error` values (bind, accept, socket I/O).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An order could not be decoded or built.
    #[error("Order error: {0}")]
    Order(#[from] ClientError),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

/// Convert any `PoisonError<T>` (from `Mutex`/`RwLock`) into `ServerError::MutexLock`.
impl<T> From<PoisonError<T>> for ServerError {
    fn from(err: PoisonError<T>) -> Self {
        ServerError::MutexLock(err.to_string())
    }
}

/// Convenient alias for `std::result::Result<T, ServerError>`.
pub type Result<T, E = ServerError> = std::result::Result<T, E>;
