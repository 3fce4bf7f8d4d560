#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff as _;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, Stream, StreamExt as _};
use secrecy::{ExposeSecret as _, SecretString};
use tokio::net::TcpStream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::codec::{self, DecodeError, Frame, Hello, Identify, OpCode, ReadyInfo, Resume};
use super::config::Config;
use super::dispatch::{DispatchRouter, Event, EventKind, HandlerError, HandlerId};
use super::error::GatewayError;
use super::heartbeat::heartbeat_loop;
use super::session::Session;
use crate::serde_helpers::deserialize_with_warnings;
use crate::{GATEWAY_VERSION, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Broadcast channel capacity for dispatched events.
const BROADCAST_CAPACITY: usize = 1024;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and no longer trying (reconnect budget exhausted)
    Disconnected,
    /// Attempting to open the transport
    Connecting,
    /// Transport open, waiting for the server's HELLO
    AwaitingHello,
    /// IDENTIFY sent, waiting for READY
    Identifying,
    /// RESUME sent, waiting for the replay to finish
    Resuming,
    /// Session established
    Connected {
        /// When the session was established
        since: Instant,
    },
    /// Waiting out the backoff before the next attempt
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
    /// Shut down by [`GatewayConnection::disconnect`]
    Closed,
}

impl ConnectionState {
    /// Check if the session is currently established.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Check if the connection has stopped for good.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }
}

/// What the supervisor should do after a connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Reconnect after the usual backoff delay
    Retry,
    /// Reconnect immediately; the server asked for it
    RetryNow,
    /// The application called disconnect; stop for good
    Close,
}

/// Handle to a supervised Gateway connection.
///
/// One background task owns the socket, the session state and all state
/// transitions. Everything observable flows out through channels: connection
/// state and session snapshots on `watch` channels, events on a `broadcast`
/// channel and through the [`DispatchRouter`].
///
/// # Example
///
/// ```ignore
/// let connection = GatewayConnection::connect(url, token, Config::default())?;
///
/// let mut events = connection.subscribe();
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// ```
#[derive(Clone)]
pub struct GatewayConnection {
    state_tx: watch::Sender<ConnectionState>,
    /// Kept alive so state sends still update the watch value when no
    /// external receiver is subscribed.
    _state_rx: watch::Receiver<ConnectionState>,
    session_rx: watch::Receiver<Session>,
    event_tx: broadcast::Sender<Event>,
    router: Arc<DispatchRouter>,
    shutdown: CancellationToken,
}

impl GatewayConnection {
    /// Open a connection to `endpoint` and start the supervision loop.
    pub fn connect(endpoint: String, token: SecretString, config: Config) -> Result<Self> {
        Self::with_router(endpoint, token, config, Arc::new(DispatchRouter::new()))
    }

    /// Like [`Self::connect`], but events route through an existing router,
    /// so handlers can be registered before any connection exists.
    pub fn with_router(
        endpoint: String,
        token: SecretString,
        config: Config,
        router: Arc<DispatchRouter>,
    ) -> Result<Self> {
        // Fail fast on an endpoint that can never dial
        let _: Url = gateway_url(&endpoint)?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (session_tx, session_rx) = watch::channel(Session::new());
        let (event_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let shutdown = CancellationToken::new();

        let task = ConnectionTask {
            endpoint,
            token,
            config,
            session: Session::new(),
            handshake_complete: false,
            state_tx: state_tx.clone(),
            session_tx,
            event_tx: event_tx.clone(),
            router: Arc::clone(&router),
            shutdown: shutdown.clone(),
        };

        tokio::spawn(task.run());

        Ok(Self {
            state_tx,
            _state_rx: state_rx,
            session_rx,
            event_tx,
            router,
            shutdown,
        })
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.subscribe().borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current session (id, last sequence, resume URL).
    #[must_use]
    pub fn session(&self) -> Session {
        self.session_rx.borrow().clone()
    }

    /// Subscribe to dispatched events.
    ///
    /// Each call returns a new independent receiver. A receiver that falls
    /// more than the channel capacity behind starts losing the oldest events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Adapt a broadcast receiver into a [`Stream`] of events.
    ///
    /// Lag is surfaced as an error item carrying the number of dropped
    /// events; the stream then continues with whatever is still buffered.
    #[must_use]
    pub fn event_stream(&self) -> impl Stream<Item = Result<Event>> + use<> {
        let mut rx = self.subscribe();

        async_stream::try_stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(count, "event stream lagged");
                        Err(GatewayError::Lagged { count })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Register an event handler. Returns a token for [`Self::off`].
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.router.on(kind, handler)
    }

    /// Unregister an event handler.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.router.off(kind, id)
    }

    /// Shut the connection down.
    ///
    /// Idempotent and callable from any state: pending reads, backoff sleeps
    /// and heartbeat waits all unblock, the socket closes, no reconnection is
    /// attempted, and the state settles on [`ConnectionState::Closed`].
    pub fn disconnect(&self) {
        self.shutdown.cancel();
    }
}

/// Build the dial URL: endpoint plus protocol version and encoding.
fn gateway_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut()
        .append_pair("v", &GATEWAY_VERSION.to_string())
        .append_pair("encoding", "json");
    Ok(url)
}

/// State owned by the background connection task. Nothing outside the task
/// ever mutates the session or publishes a state transition.
struct ConnectionTask {
    endpoint: String,
    token: SecretString,
    config: Config,
    session: Session,
    /// Whether the current connection reached READY or RESUMED
    handshake_complete: bool,
    state_tx: watch::Sender<ConnectionState>,
    session_tx: watch::Sender<Session>,
    event_tx: broadcast::Sender<Event>,
    router: Arc<DispatchRouter>,
    shutdown: CancellationToken,
}

impl ConnectionTask {
    /// Supervision loop: dial, run, classify the exit, back off, repeat.
    async fn run(mut self) {
        let mut attempt = 0_u32;
        let mut backoff: backoff::ExponentialBackoff = self.config.reconnect.clone().into();

        loop {
            if self.shutdown.is_cancelled() {
                self.set_state(ConnectionState::Closed);
                return;
            }

            self.set_state(ConnectionState::Connecting);

            let url = match self.dial_url() {
                Ok(url) => url,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "gateway endpoint is not a valid URL");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
            };

            let connected = tokio::select! {
                () = self.shutdown.cancelled() => {
                    self.set_state(ConnectionState::Closed);
                    return;
                }
                result = connect_async(url.as_str()) => result,
            };

            self.handshake_complete = false;
            let disposition = match connected {
                Ok((ws_stream, _)) => self.run_connection(ws_stream).await,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "unable to connect to gateway");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                    Disposition::Retry
                }
            };

            if self.handshake_complete {
                attempt = 0;
                backoff.reset();
            } else {
                attempt = attempt.saturating_add(1);
            }

            match disposition {
                Disposition::Close => {
                    self.set_state(ConnectionState::Closed);
                    return;
                }
                Disposition::RetryNow => {
                    // Server-requested reconnect: no backoff, session intact.
                    // Yield so state watchers see the transition before the
                    // redial overwrites it.
                    self.set_state(ConnectionState::Reconnecting { attempt });
                    tokio::task::yield_now().await;
                    continue;
                }
                Disposition::Retry => {}
            }

            if let Some(max) = self.config.reconnect.max_attempts
                && attempt >= max
            {
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            self.set_state(ConnectionState::Reconnecting { attempt });

            if let Some(duration) = backoff.next_backoff() {
                tokio::select! {
                    () = self.shutdown.cancelled() => {
                        self.set_state(ConnectionState::Closed);
                        return;
                    }
                    () = sleep(duration) => {}
                }
            }
        }
    }

    /// Handle one open transport from HELLO to whatever ends it.
    async fn run_connection(&mut self, ws_stream: WsStream) -> Disposition {
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::AwaitingHello);

        // The server speaks first: HELLO carries the heartbeat interval.
        let hello = tokio::select! {
            () = self.shutdown.cancelled() => return Disposition::Close,
            result = read_hello(&mut read, self.config.hello_timeout) => match result {
                Ok(hello) => hello,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "gateway handshake failed");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                    return Disposition::Retry;
                }
            },
        };

        let (beat_tx, mut beat_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = watch::channel(Instant::now());
        let (missed_tx, mut missed_rx) = mpsc::unbounded_channel();

        let heartbeat_handle = tokio::spawn(heartbeat_loop(
            Duration::from_millis(hello.heartbeat_interval),
            beat_tx,
            ack_rx,
            missed_tx,
            self.shutdown.child_token(),
        ));

        // RESUME when we still hold a live session, IDENTIFY otherwise.
        let opening = if self.session.can_resume() {
            self.set_state(ConnectionState::Resuming);
            self.resume_frame()
        } else {
            self.set_state(ConnectionState::Identifying);
            self.identify_frame()
        };

        let mut early_exit = None;
        match opening {
            Ok(json) => {
                if write.send(Message::Text(json.into())).await.is_err() {
                    early_exit = Some(Disposition::Retry);
                }
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %e, "could not encode handshake frame");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                early_exit = Some(Disposition::Retry);
            }
        }

        let disposition = if let Some(disposition) = early_exit {
            disposition
        } else {
            loop {
                tokio::select! {
                    () = self.shutdown.cancelled() => {
                        _ = write.send(Message::Close(None)).await;
                        break Disposition::Close;
                    }

                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            match codec::decode(text.as_bytes()) {
                                Ok(frame) => {
                                    if let Some(disposition) =
                                        self.handle_frame(frame, &mut write, &ack_tx).await
                                    {
                                        break disposition;
                                    }
                                }
                                Err(e) => {
                                    // Forward compatibility: drop, never die
                                    #[cfg(feature = "tracing")]
                                    tracing::warn!(error = %e, "dropping undecodable gateway frame");
                                    #[cfg(not(feature = "tracing"))]
                                    let _: &DecodeError = &e;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("gateway transport closed");
                            break Disposition::Retry;
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, ping and pong frames
                        }
                        Some(Err(e)) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(error = %e, "gateway transport error");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                            break Disposition::Retry;
                        }
                    },

                    // Scheduled beat requested by the heartbeat task
                    Some(()) = beat_rx.recv() => {
                        if self.send_heartbeat(&mut write).await.is_err() {
                            break Disposition::Retry;
                        }
                    }

                    // Heartbeat task declared the connection dead
                    Some(()) = missed_rx.recv() => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("heartbeat ack missed, reconnecting");
                        break Disposition::Retry;
                    }
                }
            }
        };

        heartbeat_handle.abort();
        disposition
    }

    /// React to one decoded frame. `Some` ends the connection.
    async fn handle_frame(
        &mut self,
        frame: Frame,
        write: &mut WsSink,
        ack_tx: &watch::Sender<Instant>,
    ) -> Option<Disposition> {
        match frame.op {
            OpCode::Dispatch => {
                self.handle_dispatch(frame);
                None
            }
            OpCode::Heartbeat => {
                // The server may demand an immediate beat
                if self.send_heartbeat(write).await.is_err() {
                    return Some(Disposition::Retry);
                }
                None
            }
            OpCode::HeartbeatAck => {
                _ = ack_tx.send(Instant::now());
                None
            }
            OpCode::Reconnect => {
                #[cfg(feature = "tracing")]
                tracing::info!("server requested reconnect");
                Some(Disposition::RetryNow)
            }
            OpCode::InvalidSession => {
                let resumable = frame.data.as_bool().unwrap_or(false);
                #[cfg(feature = "tracing")]
                tracing::warn!(resumable, "session invalidated by server");
                self.session.invalidate(resumable);
                self.publish_session();
                Some(Disposition::Retry)
            }
            OpCode::Hello | OpCode::Identify | OpCode::Resume => {
                // Not expected mid-connection; drop
                #[cfg(feature = "tracing")]
                tracing::debug!(op = ?frame.op, "ignoring unexpected gateway frame");
                None
            }
        }
    }

    /// Record sequencing, track the handshake, and fan the event out.
    fn handle_dispatch(&mut self, frame: Frame) {
        // READY first: its sequence number belongs to the session it
        // announces, and a new session id discards the old numbering.
        if frame.event_name.as_deref() == Some("READY") {
            match deserialize_with_warnings::<ReadyInfo>(frame.data.clone()) {
                Ok(info) => {
                    self.session.record_ready(info.session_id, info.resume_gateway_url);
                    self.publish_session();
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "READY payload missing session fields");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                }
            }
        }

        if let Some(sequence) = frame.sequence {
            self.session.record_sequence(sequence);
            self.publish_session();
        }

        let Some(name) = frame.event_name else {
            #[cfg(feature = "tracing")]
            tracing::debug!("dispatch frame without an event name");
            return;
        };

        if name == "READY" || name == "RESUMED" {
            self.handshake_complete = true;
            self.set_state(ConnectionState::Connected {
                since: Instant::now(),
            });
        }

        match Event::decode(&name, frame.data) {
            Ok(event) => {
                self.router.route(&event);
                _ = self.event_tx.send(event);
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(event = %name, error = %e, "dropping malformed dispatch payload");
                #[cfg(not(feature = "tracing"))]
                let _ = (&name, &e);
            }
        }
    }

    async fn send_heartbeat(
        &self,
        write: &mut WsSink,
    ) -> std::result::Result<(), tokio_tungstenite::tungstenite::Error> {
        let frame = Frame::heartbeat(self.session.last_sequence());
        match codec::encode(&frame) {
            Ok(json) => write.send(Message::Text(json.into())).await,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %e, "could not encode heartbeat frame");
                #[cfg(not(feature = "tracing"))]
                let _: &DecodeError = &e;
                Ok(())
            }
        }
    }

    fn identify_frame(&self) -> std::result::Result<String, DecodeError> {
        let identify = Identify {
            token: self.token.expose_secret(),
            properties: &self.config.properties,
            intents: self.config.intents.bits(),
            shard: self.config.shard.map(|shard| [shard.id, shard.total]),
        };
        codec::encode_payload(OpCode::Identify, &identify)
    }

    fn resume_frame(&self) -> std::result::Result<String, DecodeError> {
        match (self.session.id(), self.session.last_sequence()) {
            (Some(session_id), Some(seq)) => codec::encode_payload(
                OpCode::Resume,
                &Resume {
                    token: self.token.expose_secret(),
                    session_id,
                    seq,
                },
            ),
            // Caller checked can_resume(); fall back to a fresh handshake
            _ => self.identify_frame(),
        }
    }

    /// Prefer the resume endpoint the server handed us in READY.
    fn dial_url(&self) -> Result<Url> {
        let base = self.session.resume_url().unwrap_or(&self.endpoint);
        gateway_url(base)
    }

    fn set_state(&self, state: ConnectionState) {
        _ = self.state_tx.send(state);
    }

    fn publish_session(&self) {
        _ = self.session_tx.send(self.session.clone());
    }
}

/// Wait for the HELLO frame, tolerating noise but not silence.
async fn read_hello(read: &mut WsSource, wait: Duration) -> Result<Hello> {
    let frame = timeout(wait, async {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match codec::decode(text.as_bytes()) {
                    Ok(frame) if frame.op == OpCode::Hello => break Ok(frame),
                    Ok(frame) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(op = ?frame.op, "expected HELLO, ignoring frame");
                        #[cfg(not(feature = "tracing"))]
                        let _ = &frame;
                    }
                    Err(e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %e, "dropping undecodable frame before HELLO");
                        #[cfg(not(feature = "tracing"))]
                        let _: &DecodeError = &e;
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    break Err(crate::error::Error::from(GatewayError::ConnectionClosed));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(GatewayError::Connection(e).into()),
            }
        }
    })
    .await
    .map_err(|_elapsed| crate::error::Error::from(GatewayError::HelloTimeout))??;

    deserialize_with_warnings(frame.data)
}
