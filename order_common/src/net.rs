//! Shared networking constants and helpers used by client and server.

/// Loopback interface both endpoints live on.
pub const LOOPBACK: &str = "127.0.0.1";
/// TCP port for order submission (request/response, one connection per order).
pub const ORDER_PORT: u16 = 54000;
/// TCP port for the streaming feed (server -> client push).
pub const FEED_PORT: u16 = 60000;
/// Size of the single read that makes up an order response.
pub const RESPONSE_BUFFER_SIZE: usize = 4096;
/// Size of each read on the feed connection.
pub const FEED_BUFFER_SIZE: usize = 4096;

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
