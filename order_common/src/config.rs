//! Client configuration.
//!
//! Endpoints default to the loopback constants in [`crate::net`]. Timeouts are
//! off unless configured, in which case every connect/read/write is bounded by
//! them. The feed reconnect policy is off by default as well.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::net::{FEED_PORT, LOOPBACK, ORDER_PORT, addr};

/// Backoff policy for re-opening a dropped feed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Consecutive reconnect attempts before giving up. `0` disables reconnection.
    pub max_attempts: u32,
    /// Delay before the first attempt, doubled for each following one.
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubled delay.
    pub max_backoff_ms: u64,
    /// A connection must stay up this long before the attempt counter resets.
    /// Shorter sessions keep counting towards `max_attempts`.
    pub stable_after_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            stable_after_ms: 5_000,
        }
    }
}

impl ReconnectPolicy {
    /// Policy that allows `max_attempts` reconnects with the default delays.
    pub fn with_attempts(max_attempts: u32) -> Self {
        ReconnectPolicy {
            max_attempts,
            ..ReconnectPolicy::default()
        }
    }

    /// Whether any reconnect is allowed.
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Whether a session that lasted `uptime` counts as a recovered connection.
    pub fn is_stable(&self, uptime: Duration) -> bool {
        uptime >= Duration::from_millis(self.stable_after_ms)
    }

    /// Delay before the given attempt (1-based): `initial * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// Process-wide client settings shared by the submitter and the feed listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the order-submission endpoint.
    pub orders_addr: String,
    /// `host:port` of the streaming feed endpoint.
    pub feed_addr: String,
    /// Deadline for establishing a connection, in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Deadline for each read and write, in milliseconds.
    pub io_timeout_ms: Option<u64>,
    /// Feed reconnect behaviour.
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            orders_addr: addr(LOOPBACK, ORDER_PORT),
            feed_addr: addr(LOOPBACK, FEED_PORT),
            connect_timeout_ms: None,
            io_timeout_ms: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ClientError> {
        let file = File::open(path).map_err(|e| {
            ClientError::Config(format!("cannot open {}: {}", path.display(), e))
        })?;
        let config: ClientConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        debug!("Loaded client config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Reject values that would make every connection fail.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.orders_addr.trim().is_empty() || self.feed_addr.trim().is_empty() {
            return Err(ClientError::Config("endpoint addresses must not be empty".to_string()));
        }
        if self.orders_addr == self.feed_addr {
            return Err(ClientError::Config(format!(
                "orders and feed endpoints must differ, both are {}",
                self.orders_addr
            )));
        }
        // std rejects zero durations for socket timeouts
        if self.connect_timeout_ms == Some(0) || self.io_timeout_ms == Some(0) {
            return Err(ClientError::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Connect deadline, if configured.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Read/write deadline, if configured.
    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}
