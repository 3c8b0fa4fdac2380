use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use order_common::Order;

use crate::error::{Result, ServerError};
use crate::model::order_event::{OrderEvent, OrderIds, Origin};

/// Per-read buffer, matching what the engine accepts for one order line.
const ORDER_BUFFER_SIZE: usize = 256;

/// TCP order receiver that accepts client order submissions.
///
/// Each connection gets its own thread, so a misbehaving client cannot stall the
/// others. Every read on a connection is one order: valid orders are
/// acknowledged with `Order added: <payload>\n` and forwarded to the feed,
/// invalid ones get `Order rejected: <reason>\n`.
pub struct OrderReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl OrderReceiver {
    /// Bind a new TCP receiver to the provided `bind_addr` (e.g., `0.0.0.0:54000`).
    pub fn new(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Blocking accept loop. Connection-level failures are logged and do not stop it.
    pub fn receive_loop(self, ids: Arc<OrderIds>, events_tx: Sender<OrderEvent>) -> Result<()> {
        info!("Order TCP server is started on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    let ids = Arc::clone(&ids);
                    let events_tx = events_tx.clone();
                    thread::spawn(move || {
                        let peer = peer_name(&stream);
                        debug!("Order client connected: {}", peer);
                        if let Err(e) = handle_client(stream, &ids, &events_tx) {
                            warn!("Order client {} failed: {}", peer, e);
                        }
                        debug!("Order client disconnected: {}", peer);
                    });
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }
}

/// Printable remote address of a connection.
pub(crate) fn peer_name(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Serve one order connection until the client closes it.
fn handle_client(
    mut stream: TcpStream,
    ids: &OrderIds,
    events_tx: &Sender<OrderEvent>,
) -> Result<()> {
    let mut buf = [0u8; ORDER_BUFFER_SIZE];
    loop {
        let size = stream.read(&mut buf)?;
        if size == 0 {
            return Ok(());
        }
        let payload = String::from_utf8_lossy(&buf[..size]).into_owned();

        let reply = match Order::decode(&payload) {
            Ok(order) => {
                let event = OrderEvent::accept(ids, order, Origin::Client);
                info!("Accepted order {}: {}", event.id, event.order);
                events_tx
                    .send(event)
                    .map_err(|e| ServerError::ChannelSend(e.to_string()))?;
                format!("Order added: {}\n", payload.trim_end())
            }
            Err(e) => {
                warn!("Rejected order '{}': {}", payload.trim_end(), e);
                format!("Order rejected: {}\n", e)
            }
        };
        stream.write_all(reply.as_bytes())?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn start_receiver() -> (String, crossbeam_channel::Receiver<OrderEvent>) {
        let receiver = OrderReceiver::new("127.0.0.1:0").unwrap();
        let addr = receiver.socket.local_addr().unwrap().to_string();
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || receiver.receive_loop(Arc::new(OrderIds::default()), tx));
        (addr, rx)
    }

    fn exchange(addr: &str, payload: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(payload.as_bytes()).unwrap();
        let mut buf = [0u8; 256];
        let size = stream.read(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..size]).into_owned()
    }

    #[test]
    fn valid_order_is_acknowledged_and_published() {
        let (addr, events) = start_receiver();

        assert_eq!(exchange(&addr, "0 100.5 10"), "Order added: 0 100.5 10\n");

        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.origin, Origin::Client);
        assert_eq!(event.order.encode(), "0 100.5 10");
    }

    #[test]
    fn garbage_is_rejected_and_connection_survives_for_others() {
        let (addr, events) = start_receiver();

        let reply = exchange(&addr, "hello");
        assert!(reply.starts_with("Order rejected: "), "got {}", reply);
        assert!(events.try_recv().is_err());

        assert_eq!(exchange(&addr, "1 99 1"), "Order added: 1 99 1\n");
    }
}
