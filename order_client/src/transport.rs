//! Opening TCP connections to the order server endpoints.
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;
use order_common::ClientError;

/// Connect to `addr`, bounding the handshake by `connect_timeout` and every
/// later read/write by `io_timeout` when they are set.
pub(crate) fn connect(
    addr: &str,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
) -> Result<TcpStream, ClientError> {
    let stream = match connect_timeout {
        None => TcpStream::connect(addr)?,
        Some(timeout) => connect_with_timeout(addr, timeout)?,
    };
    stream.set_read_timeout(io_timeout)?;
    stream.set_write_timeout(io_timeout)?;
    stream.set_nodelay(true)?;
    debug!("Connected to {} from {}", addr, stream.local_addr()?);
    Ok(stream)
}

fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<TcpStream, ClientError> {
    let mut last_err = None;
    for socket_addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => ClientError::from_io(e),
        None => ClientError::Socket(format!("{} did not resolve to any address", addr)),
    })
}
