//!
//! Common types and utilities shared by the order client and the stub server.
//!
//! This crate aggregates:
//! - `error` — the `ClientError` taxonomy both channels report through.
//! - `result` — handy `Result<T, ClientError>` alias.
//! - `order` — `Order`/`Side` and the three-token wire encoding.
//! - `config` — `ClientConfig` and the feed `ReconnectPolicy`.
//! - `net` — endpoint constants and small helpers.
#![warn(missing_docs)]
pub mod config;
pub mod error;
pub mod net;
pub mod order;
pub mod result;

pub use config::{ClientConfig, ReconnectPolicy};
pub use error::ClientError;
pub use order::{Order, Side};
pub use result::Result;
