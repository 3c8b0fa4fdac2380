//! Integration tests for `FeedListener` against loopback feed servers.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use order_client::{ChannelSink, FeedEvent, FeedExit, FeedListener};
use order_common::{ClientConfig, ReconnectPolicy};

const WAIT: Duration = Duration::from_secs(5);

fn config_for(feed_addr: String) -> ClientConfig {
    ClientConfig {
        feed_addr,
        ..ClientConfig::default()
    }
}

/// Write each chunk and wait for the client to acknowledge it, so chunks are
/// read one at a time instead of being merged by the socket.
fn push_chunks(stream: &mut TcpStream, chunks: &[&str], acks: &crossbeam_channel::Receiver<()>) {
    for chunk in chunks {
        stream.write_all(chunk.as_bytes()).unwrap();
        acks.recv_timeout(WAIT).unwrap();
    }
}

#[test]
fn forwards_chunks_in_order_then_stops_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (ack_tx, ack_rx) = crossbeam_channel::unbounded();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        push_chunks(&mut stream, &["TRADE 1", "TRADE 2", "TRADE 3"], &ack_rx);
    });

    let mut messages = Vec::new();
    let mut errors = Vec::new();
    let exit = FeedListener::new(config_for(addr)).listen(&mut |event: FeedEvent| match event {
        FeedEvent::Message(message) => {
            messages.push(message.into_string());
            let _ = ack_tx.send(());
        }
        FeedEvent::Error(e) => errors.push(e),
        _ => {}
    });

    server.join().unwrap();
    assert_eq!(exit, FeedExit::PeerClosed);
    assert_eq!(messages, vec!["TRADE 1", "TRADE 2", "TRADE 3"]);
    assert!(errors.is_empty());
}

#[test]
fn channel_sink_ends_with_closed_event() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"ORDER 1 BUY 100.5 10\n").unwrap();
    });

    let (sink, events) = ChannelSink::unbounded();
    let handle = FeedListener::new(config_for(addr)).spawn(sink).unwrap();
    server.join().unwrap();

    assert_eq!(handle.join(), FeedExit::PeerClosed);
    let received: Vec<FeedEvent> = events.iter().collect();
    assert_eq!(received.last(), Some(&FeedEvent::Closed));
    let text: String = received
        .iter()
        .filter_map(|e| match e {
            FeedEvent::Message(m) => Some(m.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "ORDER 1 BUY 100.5 10\n");
}

#[test]
fn cancel_unblocks_pending_read_without_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"hello").unwrap();
        // hold the connection open until the test is over
        let _ = done_rx.recv_timeout(WAIT);
    });

    let (sink, events) = ChannelSink::unbounded();
    let handle = FeedListener::new(config_for(addr)).spawn(sink).unwrap();
    match events.recv_timeout(WAIT).unwrap() {
        FeedEvent::Message(m) => assert_eq!(m.as_str(), "hello"),
        other => panic!("unexpected event {:?}", other),
    }

    handle.cancel();
    assert_eq!(handle.join(), FeedExit::Cancelled);
    assert!(events.iter().all(|e| !matches!(e, FeedEvent::Error(_))));

    let _ = done_tx.send(());
    server.join().unwrap();
}

#[test]
fn dropped_receiver_stops_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // keep pushing until the client goes away
        for _ in 0..200 {
            if stream.write_all(b"tick").is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
    });

    let (sink, events) = ChannelSink::unbounded();
    drop(events);
    let handle = FeedListener::new(config_for(addr)).spawn(sink).unwrap();

    assert_eq!(handle.join(), FeedExit::Cancelled);
    server.join().unwrap();
}

#[test]
fn reconnects_after_drop_when_policy_allows() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        for chunk in ["first", "second"] {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(chunk.as_bytes()).unwrap();
            // wait for the client to finish reading before closing
            let mut buf = [0u8; 1];
            stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
            let _ = stream.read(&mut buf);
        }
    });

    let config = ClientConfig {
        reconnect: ReconnectPolicy {
            max_attempts: 1,
            initial_backoff_ms: 10,
            max_backoff_ms: 10,
            ..ReconnectPolicy::default()
        },
        ..config_for(addr)
    };
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let handle = FeedListener::new(config)
        .spawn(move |event: FeedEvent| recorded.lock().unwrap().push(event))
        .unwrap();

    server.join().unwrap();
    let exit = handle.join();
    let events = events.lock().unwrap();
    let messages: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            FeedEvent::Message(m) => Some(m.as_str()),
            _ => None,
        })
        .collect();

    assert_eq!(messages, vec!["first", "second"]);
    assert!(events.contains(&FeedEvent::Reconnecting { attempt: 1 }));
    // after the second connection closes, one more attempt finds nothing listening
    assert!(matches!(exit, FeedExit::Failed(_) | FeedExit::PeerClosed), "got {:?}", exit);
}

#[test]
fn flapping_server_exhausts_reconnect_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let connections = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let server = {
        let connections = Arc::clone(&connections);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            for stream in listener.incoming() {
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                let mut stream = stream.unwrap();
                connections.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(b"x");
            }
        })
    };

    let config = ClientConfig {
        reconnect: ReconnectPolicy {
            max_attempts: 2,
            initial_backoff_ms: 10,
            max_backoff_ms: 10,
            ..ReconnectPolicy::default()
        },
        ..config_for(addr.clone())
    };
    let (sink, events) = ChannelSink::unbounded();
    let handle = FeedListener::new(config).spawn(sink).unwrap();

    let deadline = Instant::now() + WAIT;
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "listener kept reconnecting");
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(handle.join(), FeedExit::PeerClosed);

    let attempts: Vec<u32> = events
        .try_iter()
        .filter_map(|e| match e {
            FeedEvent::Reconnecting { attempt } => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(connections.load(Ordering::SeqCst), 3);

    stop.store(true, Ordering::SeqCst);
    let _ = TcpStream::connect(&addr);
    server.join().unwrap();
}

#[test]
fn cancel_interrupts_backoff() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = ClientConfig {
        reconnect: ReconnectPolicy {
            max_attempts: 100,
            initial_backoff_ms: 60_000,
            max_backoff_ms: 60_000,
            ..ReconnectPolicy::default()
        },
        ..config_for(addr)
    };
    let (sink, events) = ChannelSink::unbounded();
    let handle = FeedListener::new(config).spawn(sink).unwrap();

    // refused, then the listener announces its first reconnect and starts waiting
    assert!(matches!(events.recv_timeout(WAIT), Ok(FeedEvent::Error(_))));
    assert_eq!(
        events.recv_timeout(WAIT),
        Ok(FeedEvent::Reconnecting { attempt: 1 })
    );
    handle.cancel();
    assert_eq!(handle.join(), FeedExit::Cancelled);
    assert_eq!(
        events.recv_timeout(Duration::from_millis(100)),
        Err(RecvTimeoutError::Disconnected)
    );
}
