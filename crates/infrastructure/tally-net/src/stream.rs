use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tally_core::Frame;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnect behaviour of a stream: fixed delay between attempts, and an
/// optional budget of consecutive attempts before the client gives up until
/// an explicit restart. The budget resets on every successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnState {
    #[default]
    Connecting,
    Open,
    Closed,
    /// Attempt budget exhausted. Only a fresh `spawn` revives the stream.
    GaveUp,
}

/// What a stream task reports into its owner's event funnel. `Frame`s arrive
/// in wire order; lifecycle events interleave where they happened.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Opened,
    Frame(Frame),
    Closed,
    GaveUp,
}

/// Caller's grip on a running stream task.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    outbound: mpsc::Sender<String>,
    state: watch::Receiver<ConnState>,
    cancel: CancellationToken,
}

impl StreamHandle {
    pub fn state(&self) -> ConnState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnState::Open
    }

    /// Sends one JSON message, best effort. Anything submitted while the
    /// connection is not open is dropped, never queued for a later
    /// reconnect. Returns whether the message was handed to the transport.
    pub fn send_json(&self, payload: &impl Serialize) -> bool {
        if !self.is_open() {
            debug!("stream not open, dropping outbound message");
            return false;
        }
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(err) => {
                warn!("outbound message failed to serialize: {err}");
                return false;
            }
        };
        self.outbound.try_send(text).is_ok()
    }

    /// Stops the stream permanently. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawns a stream task that owns one connection to `url` at a time,
/// reconnecting per `policy`. Inbound text frames are parsed and forwarded
/// over `events`; unparseable frames are dropped without touching the
/// connection.
pub fn spawn(
    url: impl Into<String>,
    policy: ReconnectPolicy,
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) -> StreamHandle {
    let (outbound_tx, outbound_rx) = mpsc::channel(16);
    let (state_tx, state_rx) = watch::channel(ConnState::Connecting);

    let task = StreamTask {
        url: url.into(),
        policy,
        events,
        outbound_rx,
        state_tx,
        cancel: cancel.clone(),
    };
    tokio::spawn(task.run());

    StreamHandle {
        outbound: outbound_tx,
        state: state_rx,
        cancel,
    }
}

struct StreamTask {
    url: String,
    policy: ReconnectPolicy,
    events: mpsc::Sender<StreamEvent>,
    outbound_rx: mpsc::Receiver<String>,
    state_tx: watch::Sender<ConnState>,
    cancel: CancellationToken,
}

impl StreamTask {
    async fn run(mut self) {
        // Consecutive closed cycles since the last successful open.
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            // Messages submitted while the previous connection was dying do
            // not survive into the next one.
            while self.outbound_rx.try_recv().is_ok() {}

            self.set_state(ConnState::Connecting);
            match connect_async(&self.url).await {
                Ok((socket, _response)) => {
                    attempts = 0;
                    self.set_state(ConnState::Open);
                    if self.events.send(StreamEvent::Opened).await.is_err() {
                        break;
                    }
                    let keep_going = self.drive(socket).await;
                    self.set_state(ConnState::Closed);
                    if !keep_going || self.events.send(StreamEvent::Closed).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!("stream connect to {} failed: {err}", self.url);
                    self.set_state(ConnState::Closed);
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }

            attempts += 1;
            if let Some(max) = self.policy.max_attempts {
                if attempts > max {
                    warn!(
                        "stream to {} gave up after {max} reconnect attempts",
                        self.url
                    );
                    self.set_state(ConnState::GaveUp);
                    let _ = self.events.send(StreamEvent::GaveUp).await;
                    return;
                }
            }

            debug!(
                "stream to {} reconnecting in {:?} (attempt {attempts})",
                self.url, self.policy.delay
            );
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
        }

        self.set_state(ConnState::Closed);
    }

    /// Pumps one live connection until it drops. Returns false when the task
    /// should stop for good instead of reconnecting.
    async fn drive(&mut self, socket: Socket) -> bool {
        let (mut sink, mut source) = socket.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return false;
                }
                outbound = self.outbound_rx.recv() => {
                    match outbound {
                        Some(text) => {
                            if let Err(err) = sink.send(Message::Text(text)).await {
                                debug!("stream write failed: {err}");
                                return true;
                            }
                        }
                        // Every handle is gone; nobody can stop or use us.
                        None => return false,
                    }
                }
                inbound = source.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match Frame::parse(&text) {
                                Some(frame) => {
                                    if self
                                        .events
                                        .send(StreamEvent::Frame(frame))
                                        .await
                                        .is_err()
                                    {
                                        return false;
                                    }
                                }
                                None => debug!("dropping malformed frame ({} bytes)", text.len()),
                            }
                        }
                        // Binary payloads and control frames are transport
                        // noise for this protocol.
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            debug!("stream read failed: {err}");
                            return true;
                        }
                        None => return true,
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ConnState) {
        let _ = self.state_tx.send(state);
    }
}
