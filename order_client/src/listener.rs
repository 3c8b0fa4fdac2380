//! Long-lived feed connection.
//!
//! [`FeedListener`] connects to the feed endpoint and forwards every chunk it
//! reads to a [`FeedSink`] until the server closes the connection, an error
//! occurs, or the listener is cancelled. Errors are delivered to the sink as
//! [`FeedEvent::Error`]; nothing escapes the listener thread as a panic.
//!
//! Reconnection follows the configured [`ReconnectPolicy`]. With the default
//! policy a dropped connection ends the listener for good. The attempt counter
//! only resets once a connection has stayed up for `stable_after_ms`, so a server
//! that accepts and immediately closes still exhausts `max_attempts`.
//!
//! Only the connect deadline applies here. An idle feed is normal, so reads are
//! never bounded by the I/O timeout.
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, error, info, warn};
use order_common::net::FEED_BUFFER_SIZE;
use order_common::{ClientConfig, ClientError, ReconnectPolicy};

use crate::sink::{FeedEvent, FeedMessage, FeedSink, SinkClosed};
use crate::transport;

/// Why a listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedExit {
    /// The server closed the connection and no reconnect was allowed.
    PeerClosed,
    /// Stopped on request, or the sink stopped accepting events.
    Cancelled,
    /// The last connection failed with this error.
    Failed(ClientError),
}

/// Cancels a running listener from any thread.
///
/// Cancelling shuts down the live socket, which unblocks a pending read, and
/// interrupts a backoff wait. The listener then exits with [`FeedExit::Cancelled`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    active: Arc<Mutex<Option<TcpStream>>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl CancelToken {
    fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(None)),
            wake_tx,
            wake_rx,
        }
    }

    /// Request the listener to stop. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Feed listener cancellation requested");
        if let Some(stream) = self.slot().as_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        let _ = self.wake_tx.try_send(());
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn slot(&self) -> MutexGuard<'_, Option<TcpStream>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `stream` reachable by `cancel` for as long as the guard lives.
    fn register(&self, stream: &TcpStream) -> Result<ActiveStream<'_>, ClientError> {
        *self.slot() = Some(stream.try_clone()?);
        Ok(ActiveStream { token: self })
    }

    /// Sleep for `delay`; returns `false` if cancelled meanwhile.
    fn wait(&self, delay: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        match self.wake_rx.recv_timeout(delay) {
            Ok(()) => false,
            Err(RecvTimeoutError::Timeout) => !self.is_cancelled(),
            Err(RecvTimeoutError::Disconnected) => !self.is_cancelled(),
        }
    }
}

struct ActiveStream<'a> {
    token: &'a CancelToken,
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        self.token.slot().take();
    }
}

/// Outcome of a single connection's lifetime.
struct Session {
    /// How long the connection stayed up; `None` if it never connected.
    uptime: Option<Duration>,
    exit: FeedExit,
}

/// Reads the feed endpoint and forwards chunks to a sink.
#[derive(Debug)]
pub struct FeedListener {
    config: ClientConfig,
    cancel: CancelToken,
}

impl FeedListener {
    /// Create a listener for the feed endpoint in `config`.
    pub fn new(config: ClientConfig) -> Self {
        FeedListener {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Token that stops this listener.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the listener on a dedicated thread.
    pub fn spawn<S>(self, mut sink: S) -> Result<FeedHandle, ClientError>
    where
        S: FeedSink + 'static,
    {
        let cancel = self.cancel.clone();
        let thread = thread::Builder::new()
            .name("feed-listener".to_string())
            .spawn(move || self.listen(&mut sink))?;
        Ok(FeedHandle { cancel, thread })
    }

    /// Run the listener on the current thread until it stops.
    pub fn listen<S: FeedSink + ?Sized>(&self, sink: &mut S) -> FeedExit {
        let policy: &ReconnectPolicy = &self.config.reconnect;
        let mut attempt = 0u32;

        loop {
            let session = self.run_session(sink);
            // a connection that drops straight away still counts as a failed attempt
            if session.uptime.is_some_and(|uptime| policy.is_stable(uptime)) {
                attempt = 0;
            }
            if session.exit == FeedExit::Cancelled || !policy.is_enabled() {
                return self.finish(session.exit);
            }

            attempt += 1;
            if attempt > policy.max_attempts {
                warn!(
                    "Feed reconnect gave up after {} attempts",
                    policy.max_attempts
                );
                return self.finish(session.exit);
            }
            if sink.deliver(FeedEvent::Reconnecting { attempt }).is_err() {
                return self.finish(FeedExit::Cancelled);
            }
            let delay = policy.backoff(attempt);
            info!(
                "Reconnecting to feed {} in {:?} (attempt {}/{})",
                self.config.feed_addr, delay, attempt, policy.max_attempts
            );
            if !self.cancel.wait(delay) {
                return self.finish(FeedExit::Cancelled);
            }
        }
    }

    fn finish(&self, exit: FeedExit) -> FeedExit {
        info!("Feed listener for {} stopped: {:?}", self.config.feed_addr, exit);
        exit
    }

    fn run_session<S: FeedSink + ?Sized>(&self, sink: &mut S) -> Session {
        let not_connected = |exit| Session {
            uptime: None,
            exit,
        };
        if self.cancel.is_cancelled() {
            return not_connected(FeedExit::Cancelled);
        }

        let stream = match transport::connect(
            &self.config.feed_addr,
            self.config.connect_timeout(),
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => return not_connected(self.fail(sink, e)),
        };
        let _active = match self.cancel.register(&stream) {
            Ok(guard) => guard,
            Err(e) => return not_connected(self.fail(sink, e)),
        };
        if self.cancel.is_cancelled() {
            return not_connected(FeedExit::Cancelled);
        }
        info!("Feed connected to {}", self.config.feed_addr);

        let connected_at = Instant::now();
        let exit = self.read_loop(stream, sink);
        Session {
            uptime: Some(connected_at.elapsed()),
            exit,
        }
    }

    fn read_loop<S: FeedSink + ?Sized>(&self, mut stream: TcpStream, sink: &mut S) -> FeedExit {
        let mut buf = [0u8; FEED_BUFFER_SIZE];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    if self.cancel.is_cancelled() {
                        return FeedExit::Cancelled;
                    }
                    info!("Feed connection closed by {}", self.config.feed_addr);
                    return match sink.deliver(FeedEvent::Closed) {
                        Ok(()) => FeedExit::PeerClosed,
                        Err(SinkClosed) => FeedExit::Cancelled,
                    };
                }
                Ok(size) => {
                    let message = FeedMessage::from_bytes(&buf[..size]);
                    debug!("Feed chunk ({} bytes): {}", size, message);
                    if sink.deliver(FeedEvent::Message(message)).is_err() {
                        debug!("Feed sink dropped, stopping listener");
                        return FeedExit::Cancelled;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return self.fail(sink, ClientError::from_io(e)),
            }
        }
    }

    /// Report `err` to the sink unless the failure was caused by cancellation.
    fn fail<S: FeedSink + ?Sized>(&self, sink: &mut S, err: ClientError) -> FeedExit {
        if self.cancel.is_cancelled() {
            return FeedExit::Cancelled;
        }
        error!("Feed {} failed: {}", self.config.feed_addr, err);
        match sink.deliver(FeedEvent::Error(err.clone())) {
            Ok(()) => FeedExit::Failed(err),
            Err(SinkClosed) => FeedExit::Cancelled,
        }
    }
}

/// A listener running on its own thread.
#[derive(Debug)]
pub struct FeedHandle {
    cancel: CancelToken,
    thread: JoinHandle<FeedExit>,
}

impl FeedHandle {
    /// Stop the listener; see [`CancelToken::cancel`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that can be moved to other threads (e.g. a signal handler).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the listener thread has already returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the listener thread and return why it stopped.
    pub fn join(self) -> FeedExit {
        self.thread.join().unwrap_or_else(|_| {
            FeedExit::Failed(ClientError::Unexpected("feed listener thread panicked".to_string()))
        })
    }
}
