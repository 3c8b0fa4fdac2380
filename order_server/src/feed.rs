//! Feed endpoint: keeps every connected client and pushes order events to all of them.
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};

use crate::error::Result;
use crate::model::order_event::OrderEvent;
use crate::receiver::peer_name;

/// Connected feed clients, shared between the accept thread and the broadcaster.
type Subscribers = Arc<Mutex<Vec<TcpStream>>>;

/// How long one subscriber may block a broadcast before it is dropped.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP feed server.
///
/// Every subscriber socket carries a write deadline, so a client that stops
/// reading is dropped instead of holding the subscriber lock indefinitely.
pub struct FeedBroadcaster {
    socket: TcpListener,
    subscribers: Subscribers,
    write_timeout: Duration,
}

impl FeedBroadcaster {
    /// Bind the feed endpoint (e.g., `0.0.0.0:60000`).
    pub fn new(bind_addr: &str) -> Result<Self> {
        Ok(Self {
            socket: TcpListener::bind(bind_addr)?,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }

    /// Override the per-subscriber write deadline. Zero is ignored.
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        if !write_timeout.is_zero() {
            self.write_timeout = write_timeout;
        }
        self
    }

    /// Start accepting feed clients on a background thread, then broadcast every
    /// event from `events_rx` on the current thread until all senders are gone.
    pub fn run(self, events_rx: Receiver<OrderEvent>) -> Result<()> {
        info!("Feed TCP server is started on {}", self.socket.local_addr()?);
        let accept_socket = self.socket.try_clone()?;
        let subscribers = Arc::clone(&self.subscribers);
        let write_timeout = self.write_timeout;
        thread::spawn(move || accept_loop(accept_socket, subscribers, write_timeout));

        for event in events_rx.iter() {
            let line = event.to_feed_line();
            let delivered = self.broadcast(line.as_bytes())?;
            debug!(
                "Order {} ({:?}) pushed to {} feed clients",
                event.id, event.origin, delivered
            );
        }
        info!("Feed broadcaster stopping...");
        Ok(())
    }

    /// Write `payload` to every subscriber, dropping those whose write fails.
    /// Returns the number of clients still connected.
    fn broadcast(&self, payload: &[u8]) -> Result<usize> {
        let started = Instant::now();
        let mut subscribers = self.subscribers.lock()?;
        subscribers.retain_mut(|stream| match stream.write_all(payload) {
            Ok(()) => true,
            Err(e) => {
                info!("Dropping feed client {}: {}", peer_name(stream), e);
                false
            }
        });
        debug!(
            "Broadcast of {} bytes took {:?}",
            payload.len(),
            started.elapsed()
        );
        Ok(subscribers.len())
    }
}

fn accept_loop(socket: TcpListener, subscribers: Subscribers, write_timeout: Duration) {
    for stream in socket.incoming() {
        match stream {
            Ok(stream) => {
                let peer = peer_name(&stream);
                if let Err(e) = stream.set_write_timeout(Some(write_timeout)) {
                    warn!("Feed client {} rejected, cannot set write timeout: {}", peer, e);
                    continue;
                }
                match subscribers.lock() {
                    Ok(mut list) => {
                        list.push(stream);
                        info!("Feed client connected: {} (total {})", peer, list.len());
                    }
                    Err(e) => {
                        error!("Feed subscriber list poisoned: {}", e);
                        return;
                    }
                }
            }
            Err(e) => error!("Feed connection error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order_event::{OrderIds, Origin};
    use order_common::{Order, Side};
    use std::io::Read;

    #[test]
    fn events_reach_connected_clients() {
        let broadcaster = FeedBroadcaster::new("127.0.0.1:0").unwrap();
        let addr = broadcaster.socket.local_addr().unwrap();
        let subscribers = Arc::clone(&broadcaster.subscribers);
        let (tx, rx) = crossbeam_channel::unbounded();
        let server = thread::spawn(move || broadcaster.run(rx));

        let mut client = TcpStream::connect(addr).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while subscribers.lock().unwrap().is_empty() {
            assert!(Instant::now() < deadline, "feed client never registered");
            thread::sleep(Duration::from_millis(5));
        }

        let ids = OrderIds::default();
        let order = Order::new(Side::Buy, "100.5", "10").unwrap();
        tx.send(OrderEvent::accept(&ids, order, Origin::Client)).unwrap();
        drop(tx);

        let mut buf = [0u8; 256];
        let size = client.read(&mut buf).unwrap();
        let line = String::from_utf8_lossy(&buf[..size]);
        assert!(line.starts_with("ORDER 1 BUY 100.5 10 "), "got {}", line);
        server.join().unwrap().unwrap();
    }

    #[test]
    fn stalled_client_is_dropped_after_write_timeout() {
        let broadcaster = FeedBroadcaster::new("127.0.0.1:0")
            .unwrap()
            .with_write_timeout(Duration::from_millis(200));
        let addr = broadcaster.socket.local_addr().unwrap();
        let accept_socket = broadcaster.socket.try_clone().unwrap();
        let subscribers = Arc::clone(&broadcaster.subscribers);
        let write_timeout = broadcaster.write_timeout;
        thread::spawn(move || accept_loop(accept_socket, subscribers, write_timeout));

        // connected but never reads
        let _stalled = TcpStream::connect(addr).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while broadcaster.subscribers.lock().unwrap().is_empty() {
            assert!(Instant::now() < deadline, "feed client never registered");
            thread::sleep(Duration::from_millis(5));
        }

        let payload = vec![b'x'; 64 * 1024 * 1024];
        let started = Instant::now();
        assert_eq!(broadcaster.broadcast(&payload).unwrap(), 0);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
