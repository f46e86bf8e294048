// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One Server-Sent-Events connection per appliance, shared by its listeners.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::{Mutex, ReentrantMutex};
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use reqwest::{Client, StatusCode};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenStore;
use crate::error::{CommunicationError, Error, Result};
use crate::event::{Event, EventKind, events_from_frame};
use crate::protocol::{ApiConfig, EVENT_STREAM_MEDIA_TYPE, SseFrame, SseParser, StreamSettings};

use super::listener::{EventListener, SubscriptionId};

// ============================================================================
// Connection bookkeeping
// ============================================================================

/// A listener and its active flag.
///
/// The flag sits behind a reentrant lock held for the whole callback, so
/// deactivating waits for an in-flight delivery on another thread, while a
/// callback that unregisters itself re-enters on its own thread.
struct Registration {
    listener: EventListener,
    active: ReentrantMutex<Cell<bool>>,
}

impl Registration {
    fn new(listener: EventListener) -> Self {
        Self {
            listener,
            active: ReentrantMutex::new(Cell::new(true)),
        }
    }

    /// Delivers `event` unless deactivated. Returns `false` once deactivated.
    fn deliver(&self, event: &Event) -> bool {
        let active = self.active.lock();
        if !active.get() {
            return false;
        }
        self.listener.deliver(event);
        true
    }

    /// Stops delivery. Returns `true` if the registration was still active.
    fn deactivate(&self) -> bool {
        self.active.lock().replace(false)
    }
}

struct Connection {
    generation: u64,
    listeners: HashMap<SubscriptionId, Arc<Registration>>,
    cancel: CancellationToken,
    open: Arc<AtomicBool>,
}

/// Why a connection ended.
#[derive(Debug)]
enum CloseReason {
    /// The server answered 401 or 403.
    Rejected(StatusCode),
    /// Opening failed and the retries are used up.
    OpenFailed(String),
    /// The server closed the stream.
    Ended,
    /// Reading the stream failed or timed out.
    Stream(CommunicationError),
    /// The watchdog saw no frame within the dead-connection threshold.
    Dead(Duration),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(status) => write!(f, "rejected with HTTP {}", status.as_u16()),
            Self::OpenFailed(reason) => write!(f, "could not open: {reason}"),
            Self::Ended => f.write_str("closed by server"),
            Self::Stream(err) => write!(f, "stream failed: {err}"),
            Self::Dead(silence) => write!(f, "dead connection, silent for {} s", silence.as_secs()),
        }
    }
}

enum OpenError {
    Fatal(CloseReason),
    Retryable(String),
}

// ============================================================================
// EventStream
// ============================================================================

/// Manages the event streams of all appliances.
///
/// Holds at most one live connection per appliance id, no matter how many
/// listeners are registered for it. The first registration opens the
/// connection; removing the last listener closes it.
///
/// Each connection runs a reader task and a watchdog task. The reader
/// parses frames and fans events out to the listeners in frame order. The
/// watchdog tears the connection down if nothing (keep-alives included)
/// arrived within the dead-connection threshold. Any teardown other than
/// unregistration notifies every listener through `on_closed`; listeners
/// decide whether to register again.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use homeconnect_lib::auth::{Token, TokenStore};
/// use homeconnect_lib::protocol::ApiConfig;
/// use homeconnect_lib::subscription::{EventListener, EventStream};
///
/// # async fn example() -> homeconnect_lib::Result<()> {
/// let config = ApiConfig::simulator("client-id", "client-secret");
/// let tokens = Arc::new(TokenStore::new(&config, Some(Token::refresh_only("refresh")))?);
/// let stream = EventStream::new(&config, tokens)?;
///
/// let id = stream.register_listener(
///     "SIEMENS-HB676G5S6-68A40E251CAD",
///     EventListener::new(|event| println!("{event:?}")),
/// );
///
/// // Later
/// stream.unregister_listener("SIEMENS-HB676G5S6-68A40E251CAD", id);
/// # Ok(())
/// # }
/// ```
pub struct EventStream {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    settings: StreamSettings,
    connections: Mutex<HashMap<String, Connection>>,
    recent: Mutex<VecDeque<Event>>,
    next_id: AtomicU64,
    next_generation: AtomicU64,
}

impl EventStream {
    /// Creates an event stream manager.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &ApiConfig, tokens: Arc<TokenStore>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(CommunicationError::Http)?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url().to_string(),
                tokens,
                settings: config.stream_settings().clone(),
                connections: Mutex::new(HashMap::new()),
                recent: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(1),
                next_generation: AtomicU64::new(1),
            }),
        })
    }

    /// Registers `listener` for the events of `ha_id`.
    ///
    /// Opens the appliance's connection if it has none.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn register_listener(&self, ha_id: &str, listener: EventListener) -> SubscriptionId {
        let id = SubscriptionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Arc::new(Registration::new(listener));

        let mut connections = self.inner.connections.lock();
        if let Some(connection) = connections.get_mut(ha_id) {
            connection.listeners.insert(id, registration);
            tracing::debug!(
                ha_id = %ha_id,
                subscription = %id,
                listeners = connection.listeners.len(),
                "Added listener to existing event stream"
            );
            return id;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let open = Arc::new(AtomicBool::new(false));
        connections.insert(
            ha_id.to_string(),
            Connection {
                generation,
                listeners: HashMap::from([(id, registration)]),
                cancel: cancel.clone(),
                open: Arc::clone(&open),
            },
        );
        drop(connections);

        tracing::info!(ha_id = %ha_id, subscription = %id, "Opening event stream");

        let last_seen = Arc::new(Mutex::new(Instant::now()));
        tokio::spawn(Arc::clone(&self.inner).run_reader(
            ha_id.to_string(),
            generation,
            cancel.clone(),
            open,
            Arc::clone(&last_seen),
        ));
        tokio::spawn(Arc::clone(&self.inner).run_watchdog(
            ha_id.to_string(),
            generation,
            cancel,
            last_seen,
        ));

        id
    }

    /// Removes a listener.
    ///
    /// Delivery to the listener stops once this returns: a callback running
    /// on another thread is waited for. Removing the last listener of an
    /// appliance closes its connection without calling `on_closed`. Returns
    /// `false` if the registration was not found.
    pub fn unregister_listener(&self, ha_id: &str, id: SubscriptionId) -> bool {
        let (registration, closed) = {
            let mut connections = self.inner.connections.lock();
            let Some(connection) = connections.get_mut(ha_id) else {
                return false;
            };
            let Some(registration) = connection.listeners.remove(&id) else {
                return false;
            };

            let closed = if connection.listeners.is_empty() {
                connections.remove(ha_id)
            } else {
                None
            };
            (registration, closed)
        };
        registration.deactivate();

        tracing::debug!(ha_id = %ha_id, subscription = %id, "Removed event listener");
        if let Some(connection) = closed {
            connection.cancel.cancel();
            tracing::info!(ha_id = %ha_id, "Closed event stream, no listeners left");
        }
        true
    }

    /// Closes every connection and drops every registration.
    ///
    /// Listeners are not notified.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns the number of appliances with a connection.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().len()
    }

    /// Returns the number of listeners registered for `ha_id`.
    #[must_use]
    pub fn listener_count(&self, ha_id: &str) -> usize {
        self.inner
            .connections
            .lock()
            .get(ha_id)
            .map_or(0, |connection| connection.listeners.len())
    }

    /// Returns `true` if `ha_id` has a connection that the server accepted.
    #[must_use]
    pub fn is_connected(&self, ha_id: &str) -> bool {
        self.inner
            .connections
            .lock()
            .get(ha_id)
            .is_some_and(|connection| connection.open.load(Ordering::SeqCst))
    }

    /// Returns the most recently received events of all appliances, oldest first.
    #[must_use]
    pub fn latest_events(&self) -> Vec<Event> {
        self.inner.recent.lock().iter().cloned().collect()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("base_url", &self.inner.base_url)
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection tasks
// ============================================================================

impl Inner {
    async fn run_reader(
        self: Arc<Self>,
        ha_id: String,
        generation: u64,
        cancel: CancellationToken,
        opened: Arc<AtomicBool>,
        last_seen: Arc<Mutex<Instant>>,
    ) {
        let reason = tokio::select! {
            () = cancel.cancelled() => return,
            reason = self.read(&ha_id, generation, &opened, &last_seen) => reason,
        };
        self.teardown(&ha_id, generation, &reason);
    }

    async fn run_watchdog(
        self: Arc<Self>,
        ha_id: String,
        generation: u64,
        cancel: CancellationToken,
        last_seen: Arc<Mutex<Instant>>,
    ) {
        let threshold = self.settings.dead_connection_threshold();
        let mut delay = self.settings.watchdog_initial_delay();

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            let silence = last_seen.lock().elapsed();
            tracing::trace!(ha_id = %ha_id, silence_ms = silence.as_millis(), "Checking event stream");
            if silence > threshold {
                tracing::warn!(ha_id = %ha_id, silence_s = silence.as_secs(), "Dead event stream detected");
                self.teardown(&ha_id, generation, &CloseReason::Dead(silence));
                return;
            }
            delay = self.settings.watchdog_interval();
        }
    }

    /// Opens the stream and reads it until it ends.
    async fn read(
        &self,
        ha_id: &str,
        generation: u64,
        opened: &AtomicBool,
        last_seen: &Mutex<Instant>,
    ) -> CloseReason {
        let mut attempts = 0;
        let response = loop {
            match self.open(ha_id).await {
                Ok(response) => break response,
                Err(OpenError::Fatal(reason)) => return reason,
                Err(OpenError::Retryable(reason)) => {
                    attempts += 1;
                    if attempts > self.settings.max_retries() {
                        return CloseReason::OpenFailed(reason);
                    }
                    tracing::debug!(
                        ha_id = %ha_id,
                        attempt = attempts,
                        reason = %reason,
                        "Retrying event stream"
                    );
                    tokio::time::sleep(self.settings.retry_delay()).await;
                }
            }
        };

        opened.store(true, Ordering::SeqCst);
        *last_seen.lock() = Instant::now();
        tracing::debug!(ha_id = %ha_id, "Event stream opened");

        let read_timeout = self.settings.read_timeout();
        let mut parser = SseParser::new();
        let mut body = response.bytes_stream();

        loop {
            match tokio::time::timeout(read_timeout, body.next()).await {
                Err(_) => {
                    return CloseReason::Stream(CommunicationError::ReadTimeout(read_timeout));
                }
                Ok(None) => return CloseReason::Ended,
                Ok(Some(Err(e))) => return CloseReason::Stream(CommunicationError::Http(e)),
                Ok(Some(Ok(bytes))) => {
                    *last_seen.lock() = Instant::now();
                    for frame in parser.feed(&bytes) {
                        self.handle_frame(ha_id, generation, &frame);
                    }
                    if let Some(retry) = parser.retry() {
                        tracing::trace!(ha_id = %ha_id, retry_ms = retry.as_millis(), "Server retry hint");
                    }
                }
            }
        }
    }

    async fn open(&self, ha_id: &str) -> std::result::Result<reqwest::Response, OpenError> {
        let token = match self.tokens.valid_token().await {
            Ok(token) => token,
            Err(err @ (Error::Authorization(_) | Error::Configuration(_))) => {
                return Err(OpenError::Fatal(CloseReason::OpenFailed(err.to_string())));
            }
            Err(err) => return Err(OpenError::Retryable(err.to_string())),
        };

        let url = format!("{}{}/events", self.base_url, crate::protocol::appliance_path(ha_id));
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, EVENT_STREAM_MEDIA_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| OpenError::Retryable(e.to_string()))?;

        let status = response.status();
        tracing::debug!(ha_id = %ha_id, status = status.as_u16(), url = %url, "Event stream request");
        match status {
            StatusCode::OK => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if status == StatusCode::UNAUTHORIZED {
                    self.tokens.invalidate(token.access_token()).await;
                }
                Err(OpenError::Fatal(CloseReason::Rejected(status)))
            }
            _ => Err(OpenError::Retryable(format!("HTTP {}", status.as_u16()))),
        }
    }

    fn handle_frame(&self, ha_id: &str, generation: u64, frame: &SseFrame) {
        let kind: EventKind = match frame.event.parse() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::warn!(
                    ha_id = %ha_id,
                    event = %frame.event,
                    id = frame.id.as_deref().unwrap_or("-"),
                    data = %frame.data,
                    "Received unknown event type"
                );
                return;
            }
        };

        if kind == EventKind::KeepAlive {
            tracing::trace!(ha_id = %ha_id, "Keep-alive");
            return;
        }
        tracing::debug!(ha_id = %ha_id, kind = %kind, "Received event frame");

        let events = match events_from_frame(ha_id, kind, &frame.data) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(ha_id = %ha_id, kind = %kind, error = %e, "Could not parse event");
                return;
            }
        };
        self.remember(&events);

        let registrations: Vec<Arc<Registration>> = {
            let connections = self.connections.lock();
            match connections.get(ha_id) {
                Some(connection) if connection.generation == generation => {
                    connection.listeners.values().cloned().collect()
                }
                _ => return,
            }
        };

        for registration in &registrations {
            for event in &events {
                if !registration.deliver(event) {
                    break;
                }
            }
        }
    }

    fn remember(&self, events: &[Event]) {
        let capacity = self.settings.event_buffer_size();
        if capacity == 0 {
            return;
        }
        let mut recent = self.recent.lock();
        for event in events {
            while recent.len() >= capacity {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }
    }

    /// Removes the connection of `generation` and notifies its listeners.
    ///
    /// Does nothing if that connection was already replaced or removed.
    fn teardown(&self, ha_id: &str, generation: u64, reason: &CloseReason) {
        let connection = {
            let mut connections = self.connections.lock();
            match connections.get(ha_id) {
                Some(connection) if connection.generation == generation => {
                    connections.remove(ha_id)
                }
                _ => None,
            }
        };
        let Some(connection) = connection else {
            return;
        };

        connection.cancel.cancel();
        tracing::info!(ha_id = %ha_id, reason = %reason, "Event stream closed");

        for registration in connection.listeners.values() {
            if registration.deactivate() {
                registration.listener.closed(ha_id);
            }
        }
    }

    fn dispose(&self) {
        let connections: Vec<(String, Connection)> =
            self.connections.lock().drain().collect();

        for (ha_id, connection) in connections {
            for registration in connection.listeners.values() {
                registration.deactivate();
            }
            connection.cancel.cancel();
            tracing::debug!(ha_id = %ha_id, "Disposed event stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use std::sync::atomic::AtomicUsize;

    fn stream(settings: StreamSettings) -> EventStream {
        stream_at("http://127.0.0.1:9", settings)
    }

    fn stream_at(base_url: &str, settings: StreamSettings) -> EventStream {
        let config = ApiConfig::new(base_url, "client", "secret").with_stream_settings(settings);
        let token = Token::from_ttl("access", "refresh", 3600, chrono::Utc::now());
        let tokens = Arc::new(TokenStore::new(&config, Some(token)).unwrap());
        EventStream::new(&config, tokens).unwrap()
    }

    fn quiet() -> StreamSettings {
        StreamSettings::new()
            .with_retry_delay(Duration::from_secs(3600))
            .with_watchdog_initial_delay(Duration::from_secs(3600))
    }

    fn counting_listener(events: &Arc<AtomicUsize>) -> EventListener {
        let events = Arc::clone(events);
        EventListener::new(move |_| {
            events.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    fn generation_of(stream: &EventStream, ha_id: &str) -> u64 {
        stream.inner.connections.lock()[ha_id].generation
    }

    #[tokio::test]
    async fn listeners_share_one_connection() {
        let stream = stream(quiet());
        let a = stream.register_listener("HA1", EventListener::new(|_| {}));
        let b = stream.register_listener("HA1", EventListener::new(|_| {}));
        stream.register_listener("HA2", EventListener::new(|_| {}));

        assert_ne!(a, b);
        assert_eq!(stream.connection_count(), 2);
        assert_eq!(stream.listener_count("HA1"), 2);

        assert!(stream.unregister_listener("HA1", a));
        assert_eq!(stream.connection_count(), 2);
        assert!(stream.unregister_listener("HA1", b));
        assert_eq!(stream.connection_count(), 1);
        assert!(!stream.unregister_listener("HA1", b));
    }

    #[tokio::test]
    async fn frame_fans_out_to_every_listener() {
        let stream = stream(quiet());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        stream.register_listener("HA1", counting_listener(&first));
        stream.register_listener("HA1", counting_listener(&second));

        let generation = generation_of(&stream, "HA1");
        let data = r#"{"items":[{"key":"a","value":1},{"key":"b","value":2},{"key":"c","value":3}]}"#;
        stream.inner.handle_frame("HA1", generation, &frame("STATUS", data));

        assert_eq!(first.load(Ordering::SeqCst), 3);
        assert_eq!(second.load(Ordering::SeqCst), 3);
        assert_eq!(stream.latest_events().len(), 3);
    }

    #[tokio::test]
    async fn events_arrive_in_item_order() {
        let stream = stream(quiet());
        let keys = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&keys);
        stream.register_listener(
            "HA1",
            EventListener::new(move |event| seen.lock().push(event.key.clone().unwrap_or_default())),
        );

        let generation = generation_of(&stream, "HA1");
        let data = r#"{"items":[{"key":"z"},{"key":"a"},{"key":"m"}]}"#;
        stream.inner.handle_frame("HA1", generation, &frame("NOTIFY", data));

        assert_eq!(*keys.lock(), vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_block_others() {
        let stream = stream(quiet());
        let delivered = Arc::new(AtomicUsize::new(0));
        stream.register_listener("HA1", EventListener::new(|_| panic!("listener bug")));
        stream.register_listener("HA1", counting_listener(&delivered));

        let generation = generation_of(&stream, "HA1");
        stream.inner.handle_frame("HA1", generation, &frame("DISCONNECTED", ""));

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keep_alive_and_unknown_frames_are_not_delivered() {
        let stream = stream(quiet());
        let delivered = Arc::new(AtomicUsize::new(0));
        stream.register_listener("HA1", counting_listener(&delivered));

        let generation = generation_of(&stream, "HA1");
        stream.inner.handle_frame("HA1", generation, &frame("KEEP-ALIVE", ""));
        stream.inner.handle_frame("HA1", generation, &frame("MYSTERY", "{}"));

        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        assert!(stream.latest_events().is_empty());
    }

    #[tokio::test]
    async fn unregistered_listener_receives_nothing() {
        let stream = stream(quiet());
        let delivered = Arc::new(AtomicUsize::new(0));
        let id = stream.register_listener("HA1", counting_listener(&delivered));
        stream.register_listener("HA1", EventListener::new(|_| {}));

        let generation = generation_of(&stream, "HA1");
        stream.unregister_listener("HA1", id);
        stream.inner.handle_frame("HA1", generation, &frame("CONNECTED", ""));

        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn listener_can_unregister_itself() {
        let stream = Arc::new(stream(quiet()));
        let own_id = Arc::new(std::sync::OnceLock::new());
        let delivered = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&stream);
        let slot = Arc::clone(&own_id);
        let count = Arc::clone(&delivered);
        let id = stream.register_listener(
            "HA1",
            EventListener::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                if let (Some(stream), Some(id)) = (weak.upgrade(), slot.get()) {
                    stream.unregister_listener("HA1", *id);
                }
            }),
        );
        own_id.set(id).unwrap();
        stream.register_listener("HA1", EventListener::new(|_| {}));

        let generation = generation_of(&stream, "HA1");
        let data = r#"{"items":[{"key":"a"},{"key":"b"},{"key":"c"}]}"#;
        stream.inner.handle_frame("HA1", generation, &frame("STATUS", data));

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        assert_eq!(stream.listener_count("HA1"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unregister_waits_for_running_callback() {
        let stream = stream(quiet());
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let delivered = Arc::new(AtomicUsize::new(0));

        let done = Arc::clone(&finished);
        let count = Arc::clone(&delivered);
        let id = stream.register_listener(
            "HA1",
            EventListener::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                let _ = started_tx.send(());
                std::thread::sleep(Duration::from_millis(200));
                done.store(true, Ordering::SeqCst);
            }),
        );
        stream.register_listener("HA1", EventListener::new(|_| {}));

        let inner = Arc::clone(&stream.inner);
        let generation = generation_of(&stream, "HA1");
        let reader = std::thread::spawn(move || {
            let data = r#"{"items":[{"key":"a"},{"key":"b"}]}"#;
            inner.handle_frame("HA1", generation, &frame("STATUS", data));
        });

        started_rx.recv().unwrap();
        assert!(stream.unregister_listener("HA1", id));
        assert!(finished.load(Ordering::SeqCst));

        reader.join().unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    /// Serves one event stream that sends a keep-alive and then stays silent.
    async fn silent_sse_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 4096];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\r\n\
                      event: KEEP-ALIVE\ndata: \n\n",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(socket);
        });
        format!("http://{address}")
    }

    #[tokio::test]
    async fn silent_open_stream_ends_with_read_timeout() {
        let base_url = silent_sse_server().await;
        let stream = stream_at(
            &base_url,
            quiet().with_read_timeout(Duration::from_millis(200)),
        );

        let opened = AtomicBool::new(false);
        let last_seen = Mutex::new(Instant::now());
        let reason = stream.inner.read("HA1", 1, &opened, &last_seen).await;

        assert!(opened.load(Ordering::SeqCst));
        assert!(matches!(
            reason,
            CloseReason::Stream(CommunicationError::ReadTimeout(timeout))
                if timeout == Duration::from_millis(200)
        ));
    }

    #[tokio::test]
    async fn stale_teardown_leaves_new_connection() {
        let stream = stream(quiet());
        let closed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&closed);
        let id = stream.register_listener("HA1", EventListener::new(|_| {}));
        let old = generation_of(&stream, "HA1");
        stream.unregister_listener("HA1", id);

        stream.register_listener(
            "HA1",
            EventListener::new(|_| {}).on_closed(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        stream.inner.teardown("HA1", old, &CloseReason::Ended);

        assert_eq!(stream.connection_count(), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn teardown_notifies_each_listener_once() {
        let stream = stream(quiet());
        let closed = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let seen = Arc::clone(&closed);
            stream.register_listener(
                "HA1",
                EventListener::new(|_| {}).on_closed(move || {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let generation = generation_of(&stream, "HA1");
        stream.inner.teardown("HA1", generation, &CloseReason::Ended);
        stream.inner.teardown("HA1", generation, &CloseReason::Ended);

        assert_eq!(closed.load(Ordering::SeqCst), 2);
        assert_eq!(stream.connection_count(), 0);
    }

    #[tokio::test]
    async fn dispose_clears_everything_silently() {
        let stream = stream(quiet());
        let closed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&closed);
        stream.register_listener(
            "HA1",
            EventListener::new(|_| {}).on_closed(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        stream.register_listener("HA2", EventListener::new(|_| {}));

        stream.dispose();

        assert_eq!(stream.connection_count(), 0);
        assert_eq!(stream.listener_count("HA1"), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recent_events_are_bounded() {
        let stream = stream(quiet().with_event_buffer_size(2));
        stream.register_listener("HA1", EventListener::new(|_| {}));

        let generation = generation_of(&stream, "HA1");
        let data = r#"{"items":[{"key":"a"},{"key":"b"},{"key":"c"}]}"#;
        stream.inner.handle_frame("HA1", generation, &frame("EVENT", data));

        let keys: Vec<_> = stream
            .latest_events()
            .into_iter()
            .filter_map(|event| event.key)
            .collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_tears_down_silent_connection() {
        let settings = StreamSettings::new()
            .with_retry_delay(Duration::from_secs(3600))
            .with_max_retries(1_000)
            .with_watchdog_initial_delay(Duration::from_secs(60))
            .with_watchdog_interval(Duration::from_secs(300))
            .with_dead_connection_threshold(Duration::from_secs(180));
        let stream = stream(settings);

        let closed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&closed);
        stream.register_listener(
            "HA1",
            EventListener::new(|_| {}).on_closed(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // First check after 60 s finds 60 s of silence.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(stream.connection_count(), 1);

        // Second check at 360 s exceeds the threshold.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(stream.connection_count(), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
