// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for appliance event streams using wiremock.
//!
//! Streams that must stay open after their first bytes are served by a raw
//! TCP listener, since wiremock only answers with complete bodies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use homeconnect_lib::auth::{Token, TokenStore};
use homeconnect_lib::protocol::{ApiConfig, StreamSettings};
use homeconnect_lib::subscription::{EventListener, EventStream};
use homeconnect_lib::{ApplianceApiClient, Event, EventKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HA_ID: &str = "BOSCH-SMV68TX06E-68A40E2F4A21";
const WAIT: Duration = Duration::from_secs(5);

const STATUS_FRAME: &str = "event: STATUS\n\
data: {\"items\":[{\"key\":\"BSH.Common.Status.DoorState\",\"value\":\"BSH.Common.EnumType.DoorState.Open\",\"timestamp\":1588339200,\"level\":\"hint\",\"handling\":\"none\"},{\"key\":\"BSH.Common.Status.OperationState\",\"value\":\"BSH.Common.EnumType.OperationState.Run\"}]}\n\
id: BOSCH-SMV68TX06E-68A40E2F4A21\n\n";

fn events_path() -> String {
    format!("/api/homeappliances/{HA_ID}/events")
}

fn settings() -> StreamSettings {
    StreamSettings::new()
        .with_retry_delay(Duration::from_millis(10))
        .with_max_retries(2)
}

fn stream_with(server: &MockServer, settings: StreamSettings) -> (EventStream, Arc<TokenStore>) {
    stream_at(&server.uri(), settings)
}

fn stream_at(base_url: &str, settings: StreamSettings) -> (EventStream, Arc<TokenStore>) {
    let config =
        ApiConfig::new(base_url, "client-id", "client-secret").with_stream_settings(settings);
    let token = Token::from_ttl("access", "refresh", 3600, Utc::now());
    let tokens = Arc::new(TokenStore::new(&config, Some(token)).unwrap());
    (EventStream::new(&config, Arc::clone(&tokens)).unwrap(), tokens)
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

/// Listener forwarding events and closures into channels.
fn channel_listener() -> (
    EventListener,
    mpsc::UnboundedReceiver<Event>,
    mpsc::UnboundedReceiver<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();
    let listener = EventListener::new(move |event| {
        let _ = event_tx.send(event.clone());
    })
    .on_closed(move || {
        let _ = closed_tx.send(());
    });
    (listener, event_rx, closed_rx)
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting")
        .expect("channel closed")
}

/// Accepts one event-stream request, answers with stream headers and
/// `frames` copies of `frame`, then holds the socket open.
async fn raw_sse_server(frame: &'static str, frames: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let headers = "HTTP/1.1 200 OK\r\n\
                       content-type: text/event-stream\r\n\
                       cache-control: no-cache\r\n\r\n";
        if socket.write_all(headers.as_bytes()).await.is_err() {
            return;
        }
        for i in 0..frames {
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
            if i % 20 == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    format!("http://{address}")
}

/// Registers two listeners that report `on_closed` into one channel.
fn register_closing_pair(stream: &EventStream) -> mpsc::UnboundedReceiver<()> {
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();
    for _ in 0..2 {
        let closed_tx = closed_tx.clone();
        stream.register_listener(
            HA_ID,
            EventListener::new(|_| {}).on_closed(move || {
                let _ = closed_tx.send(());
            }),
        );
    }
    closed_rx
}

async fn wait_connected(stream: &EventStream) {
    tokio::time::timeout(WAIT, async {
        while !stream.is_connected(HA_ID) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stream never opened");
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn status_items_are_delivered_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .and(header("Accept", "text/event-stream"))
        .and(header("Authorization", "Bearer access"))
        .respond_with(sse(STATUS_FRAME))
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (listener, mut events, _closed) = channel_listener();
    stream.register_listener(HA_ID, listener);

    let first = next(&mut events).await;
    let second = next(&mut events).await;

    assert_eq!(first.ha_id, HA_ID);
    assert_eq!(first.kind, EventKind::Status);
    assert_eq!(first.key.as_deref(), Some("BSH.Common.Status.DoorState"));
    assert_eq!(first.value.as_deref(), Some("BSH.Common.EnumType.DoorState.Open"));
    assert!(first.timestamp.is_some());
    assert_eq!(second.key.as_deref(), Some("BSH.Common.Status.OperationState"));

    let latest = stream.latest_events();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].key, first.key);
}

#[tokio::test]
async fn listeners_of_one_appliance_share_a_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(STATUS_FRAME))
        .expect(1)
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (first, mut first_events, _first_closed) = channel_listener();
    let (second, mut second_events, _second_closed) = channel_listener();

    let first_id = stream.register_listener(HA_ID, first);
    let second_id = stream.register_listener(HA_ID, second);

    assert_ne!(first_id, second_id);
    assert_eq!(stream.connection_count(), 1);
    assert_eq!(stream.listener_count(HA_ID), 2);

    assert_eq!(
        next(&mut first_events).await.key.as_deref(),
        Some("BSH.Common.Status.DoorState")
    );
    assert_eq!(
        next(&mut second_events).await.key.as_deref(),
        Some("BSH.Common.Status.DoorState")
    );
}

#[tokio::test]
async fn sentinel_and_keep_alive_frames() {
    let server = MockServer::start().await;
    let body = "event: KEEP-ALIVE\ndata: \n\n\
                event: DISCONNECTED\ndata: \nid: X\n\n\
                event: CONNECTED\ndata: \"\"\n\n";
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(body))
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (listener, mut events, _closed) = channel_listener();
    stream.register_listener(HA_ID, listener);

    let disconnected = next(&mut events).await;
    let connected = next(&mut events).await;

    assert_eq!(disconnected.kind, EventKind::Disconnected);
    assert_eq!(disconnected.key.as_deref(), Some("DISCONNECTED"));
    assert_eq!(connected.kind, EventKind::Connected);
    assert_eq!(connected.key.as_deref(), Some("CONNECTED"));
}

// ============================================================================
// Connection loss
// ============================================================================

#[tokio::test]
async fn stream_end_notifies_listeners_and_removes_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(STATUS_FRAME))
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (listener, _events, mut closed) = channel_listener();
    stream.register_listener(HA_ID, listener);

    next(&mut closed).await;
    assert_eq!(stream.connection_count(), 0);
    assert!(!stream.is_connected(HA_ID));
}

#[tokio::test]
async fn unauthorized_stream_closes_and_invalidates_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (stream, tokens) = stream_with(&server, settings());
    let (listener, _events, mut closed) = channel_listener();
    stream.register_listener(HA_ID, listener);

    next(&mut closed).await;
    assert_eq!(stream.connection_count(), 0);
    assert!(tokens.token().await.unwrap().is_expired());
}

#[tokio::test]
async fn failed_open_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(STATUS_FRAME))
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (listener, mut events, _closed) = channel_listener();
    stream.register_listener(HA_ID, listener);

    assert_eq!(
        next(&mut events).await.key.as_deref(),
        Some("BSH.Common.Status.DoorState")
    );
}

#[tokio::test]
async fn exhausted_retries_notify_listeners() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (listener, mut events, mut closed) = channel_listener();
    stream.register_listener(HA_ID, listener);

    next(&mut closed).await;
    assert!(events.try_recv().is_err());
    assert_eq!(stream.connection_count(), 0);
}

#[tokio::test]
async fn silent_connection_is_torn_down_by_watchdog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(STATUS_FRAME).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let settings = settings()
        .with_watchdog_initial_delay(Duration::from_millis(100))
        .with_watchdog_interval(Duration::from_millis(50))
        .with_dead_connection_threshold(Duration::from_millis(200));
    let (stream, _) = stream_with(&server, settings);

    let closed_count = Arc::new(AtomicUsize::new(0));
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
    for _ in 0..2 {
        let closed_count = Arc::clone(&closed_count);
        let closed_tx = closed_tx.clone();
        stream.register_listener(
            HA_ID,
            EventListener::new(|_| {}).on_closed(move || {
                closed_count.fetch_add(1, Ordering::SeqCst);
                let _ = closed_tx.send(());
            }),
        );
    }

    next(&mut closed_rx).await;
    next(&mut closed_rx).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(closed_count.load(Ordering::SeqCst), 2);
    assert_eq!(stream.connection_count(), 0);
}

#[tokio::test]
async fn watchdog_closes_open_stream_that_goes_silent() {
    let base_url = raw_sse_server("event: KEEP-ALIVE\ndata: \n\n", 1).await;
    let settings = settings()
        .with_read_timeout(Duration::from_secs(60))
        .with_watchdog_initial_delay(Duration::from_millis(100))
        .with_watchdog_interval(Duration::from_millis(50))
        .with_dead_connection_threshold(Duration::from_millis(300));
    let (stream, _) = stream_at(&base_url, settings);

    let mut closed = register_closing_pair(&stream);
    wait_connected(&stream).await;

    next(&mut closed).await;
    next(&mut closed).await;
    assert!(closed.try_recv().is_err());
    assert_eq!(stream.connection_count(), 0);
    assert!(!stream.is_connected(HA_ID));
}

#[tokio::test]
async fn read_timeout_closes_open_stream_that_goes_silent() {
    let base_url = raw_sse_server("event: KEEP-ALIVE\ndata: \n\n", 1).await;
    let settings = settings()
        .with_read_timeout(Duration::from_millis(200))
        .with_watchdog_initial_delay(Duration::from_secs(3600));
    let (stream, _) = stream_at(&base_url, settings);

    let mut closed = register_closing_pair(&stream);
    wait_connected(&stream).await;

    next(&mut closed).await;
    next(&mut closed).await;
    assert!(closed.try_recv().is_err());
    assert_eq!(stream.connection_count(), 0);
}

// ============================================================================
// Unregistration and disposal
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_events_reach_listener_after_unregister_returns() {
    for _ in 0..20 {
        let base_url = raw_sse_server(STATUS_FRAME, 5000).await;
        let (stream, _) = stream_at(&base_url, settings());

        let delivered = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(AtomicUsize::new(0));
        let unregistered = Arc::new(AtomicBool::new(false));
        let id = {
            let delivered = Arc::clone(&delivered);
            let late = Arc::clone(&late);
            let unregistered = Arc::clone(&unregistered);
            stream.register_listener(
                HA_ID,
                EventListener::new(move |_| {
                    if unregistered.load(Ordering::SeqCst) {
                        late.fetch_add(1, Ordering::SeqCst);
                    }
                    delivered.fetch_add(1, Ordering::SeqCst);
                    std::thread::yield_now();
                }),
            )
        };
        stream.register_listener(HA_ID, EventListener::new(|_| {}));

        tokio::time::timeout(WAIT, async {
            while delivered.load(Ordering::SeqCst) < 100 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("events never arrived");

        assert!(stream.unregister_listener(HA_ID, id));
        unregistered.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(late.load(Ordering::SeqCst), 0);
        stream.dispose();
    }
}

#[tokio::test]
async fn unregistering_last_listener_closes_silently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(STATUS_FRAME).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (first, _first_events, mut first_closed) = channel_listener();
    let (second, _second_events, mut second_closed) = channel_listener();
    let first_id = stream.register_listener(HA_ID, first);
    let second_id = stream.register_listener(HA_ID, second);

    assert!(stream.unregister_listener(HA_ID, first_id));
    assert_eq!(stream.connection_count(), 1);
    assert!(stream.unregister_listener(HA_ID, second_id));
    assert_eq!(stream.connection_count(), 0);
    assert!(!stream.unregister_listener(HA_ID, second_id));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(first_closed.try_recv().is_err());
    assert!(second_closed.try_recv().is_err());
}

#[tokio::test]
async fn dispose_drops_everything_without_notifying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(sse(STATUS_FRAME).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let (stream, _) = stream_with(&server, settings());
    let (first, _first_events, mut first_closed) = channel_listener();
    let (second, _second_events, mut second_closed) = channel_listener();
    stream.register_listener(HA_ID, first);
    stream.register_listener("SIEMENS-HB676G5S6-68A40E251CAD", second);
    assert_eq!(stream.connection_count(), 2);

    stream.dispose();

    assert_eq!(stream.connection_count(), 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(first_closed.try_recv().is_err());
    assert!(second_closed.try_recv().is_err());
}

#[tokio::test]
async fn client_registers_through_its_event_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(events_path().as_str()))
        .respond_with(sse(STATUS_FRAME))
        .mount(&server)
        .await;

    let config = ApiConfig::new(server.uri(), "client-id", "client-secret")
        .with_stream_settings(settings().with_reregister_delay(Duration::from_millis(10)));
    let client = ApplianceApiClient::new(
        config,
        Token::from_ttl("access", "refresh", 3600, Utc::now()),
    )
    .unwrap();

    let (listener, mut events, mut closed) = channel_listener();
    client.register_event_listener(HA_ID, listener.clone());
    assert_eq!(
        next(&mut events).await.key.as_deref(),
        Some("BSH.Common.Status.DoorState")
    );
    assert_eq!(
        next(&mut events).await.key.as_deref(),
        Some("BSH.Common.Status.OperationState")
    );
    next(&mut closed).await;

    client.reregister_event_listener(HA_ID, listener).await;
    assert_eq!(
        next(&mut events).await.key.as_deref(),
        Some("BSH.Common.Status.DoorState")
    );
    assert!(!client.latest_events().is_empty());

    client.dispose();
    assert_eq!(client.event_stream().connection_count(), 0);
}
