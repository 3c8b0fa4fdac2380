//! Sending orders to the order server over TCP.
//!
//! Every call to [`OrderSubmitter::submit`] is a self-contained exchange: connect,
//! write the encoded order in one send, read once, close. Nothing is kept between
//! calls, so concurrent submissions never share a connection.
use std::fmt;
use std::io::{Read, Write};

use log::{debug, warn};
use order_common::net::RESPONSE_BUFFER_SIZE;
use order_common::{ClientConfig, ClientError, Order};

use crate::transport;

/// Text returned by the server for one order, shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response(String);

impl Response {
    fn from_bytes(bytes: &[u8]) -> Self {
        Response(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Response text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synchronous order sender. Cheap to clone; holds configuration only.
#[derive(Debug, Clone)]
pub struct OrderSubmitter {
    config: ClientConfig,
}

impl OrderSubmitter {
    /// Create a submitter for the orders endpoint in `config`.
    pub fn new(config: ClientConfig) -> Self {
        OrderSubmitter { config }
    }

    /// Address orders are sent to.
    pub fn addr(&self) -> &str {
        &self.config.orders_addr
    }

    /// Send one order and wait for its response.
    ///
    /// Blocks for the whole round trip. Without configured timeouts a server that
    /// never answers blocks the caller indefinitely. The connection is closed
    /// before returning on every path. A peer that closes without replying is
    /// reported as [`ClientError::Reset`].
    pub fn submit(&self, order: &Order) -> Result<Response, ClientError> {
        let payload = order.encode();
        debug!("Sending order '{}' to {}", payload, self.config.orders_addr);

        match self.exchange(payload.as_bytes()) {
            Ok(response) => {
                debug!("Order '{}' answered with {} bytes", payload, response.0.len());
                Ok(response)
            }
            Err(e) => {
                warn!("Order '{}' failed: {}", payload, e);
                Err(e)
            }
        }
    }

    fn exchange(&self, payload: &[u8]) -> Result<Response, ClientError> {
        let mut stream = transport::connect(
            &self.config.orders_addr,
            self.config.connect_timeout(),
            self.config.io_timeout(),
        )?;
        stream.write_all(payload)?;
        stream.flush()?;

        let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
        let size = stream.read(&mut buf)?;
        if size == 0 {
            return Err(ClientError::Reset);
        }
        Ok(Response::from_bytes(&buf[..size]))
    }
}
