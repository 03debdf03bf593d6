use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use tally_config::{ASSISTANT_RECONNECT_DELAY, VRAM_POLL, VRAM_POLL_INITIAL_DELAY};
use tally_core::service::{ServiceActionDelta, ServiceStatus, REGISTRY};
use tally_core::telemetry::VramReport;
use tally_core::{Frame, Subscribe};
use tally_net::{
    spawn_poll, ApiError, ApiErrorKind, ChatRequest, ConnState, GatewayClient, MonitoringClient,
    ReconnectPolicy, ServiceAction, StreamEvent, StreamHandle,
};

use crate::store::Store;
use crate::vram::VramGuard;

use super::events::AssistantEvent;
use super::reducer::reduce;
use super::state::AssistantState;

pub type AssistantStore = Store<AssistantState, AssistantEvent>;

/// Everything funneled into the assistant kernel. Signals are applied in
/// arrival order by a single consumer, so state changes never race.
pub enum Signal {
    Stream(StreamEvent),
    Vram(VramReport),
    Event(AssistantEvent),
}

#[derive(Debug, Deserialize)]
struct EmotionPayload {
    emotion: String,
}

/// Drives the voice-assistant console: startup sequence, chat requests,
/// the gateway event stream and the VRAM guard poll.
pub struct AssistantKernel {
    pub store: AssistantStore,
    gateway: Arc<GatewayClient>,
    monitoring: Arc<MonitoringClient>,
    guard: VramGuard,
    user_id: String,
    tts_mode: String,
    tx: mpsc::Sender<Signal>,
    rx: mpsc::Receiver<Signal>,
    cancel: CancellationToken,
    stream: Option<StreamHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl AssistantKernel {
    pub fn new(
        client: Client,
        gateway_base: impl Into<String>,
        monitoring_base: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(100);
        // Ephemeral viewer identity, fresh per session.
        let user_id = format!("viewer_{}", &Uuid::new_v4().simple().to_string()[..5]);
        Self {
            store: Store::new(AssistantState::default(), reduce),
            gateway: Arc::new(GatewayClient::new(client.clone(), gateway_base)),
            monitoring: Arc::new(MonitoringClient::new(client, monitoring_base)),
            guard: VramGuard::new(),
            user_id,
            tts_mode: "blips".to_owned(),
            tx,
            rx,
            cancel: CancellationToken::new(),
            stream: None,
            tasks: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn set_tts_mode(&mut self, mode: impl Into<String>) {
        self.tts_mode = mode.into();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn sender(&self) -> mpsc::Sender<Signal> {
        self.tx.clone()
    }

    /// Connects the gateway event stream. Retries forever on drops; frames
    /// land in the funnel in wire order.
    pub fn connect(&mut self, ws_url: impl Into<String>) {
        let (stream_tx, mut stream_rx) = mpsc::channel(64);
        let handle = tally_net::stream::spawn(
            ws_url,
            ReconnectPolicy::unbounded(ASSISTANT_RECONNECT_DELAY),
            stream_tx,
            self.cancel.child_token(),
        );
        self.stream = Some(handle);

        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(ev) = stream_rx.recv().await {
                if tx.send(Signal::Stream(ev)).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Probes current service status once.
    pub fn probe(&mut self) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let ev = match gateway.service_statuses().await {
                Ok(statuses) => AssistantEvent::StatusesLoaded { statuses },
                Err(err) => {
                    warn!("status probe failed: {err}");
                    AssistantEvent::ProbeFailed {
                        detail: err.detail(),
                    }
                }
            };
            let _ = tx.send(Signal::Event(ev)).await;
        }));
    }

    /// Runs the startup sequence: every registry service in order, one at a
    /// time, skipping members already online. Bootstrap members start
    /// through the monitoring service, the rest through the gateway. A
    /// critical failure abandons the remainder.
    pub fn start_services(&mut self) {
        let gateway = self.gateway.clone();
        let monitoring = self.monitoring.clone();
        let store = self.store.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let _ = tx.send(Signal::Event(AssistantEvent::SequenceStarted)).await;
            for spec in REGISTRY {
                if store.state().services.status(spec.id) == Some(ServiceStatus::Online) {
                    continue;
                }
                let _ = tx
                    .send(Signal::Event(AssistantEvent::ServiceStarting {
                        id: spec.id.to_owned(),
                    }))
                    .await;
                let started = if spec.bootstrap {
                    monitoring
                        .control_service(spec.id, ServiceAction::Start)
                        .await
                } else {
                    gateway.start_service(spec.id).await
                };
                match started {
                    Ok(()) => {
                        let _ = tx
                            .send(Signal::Event(AssistantEvent::ServiceStarted {
                                id: spec.id.to_owned(),
                            }))
                            .await;
                    }
                    Err(err) => {
                        let _ = tx
                            .send(Signal::Event(AssistantEvent::ServiceFailed {
                                id: spec.id.to_owned(),
                                critical: spec.critical,
                                detail: err.detail(),
                                at: Instant::now(),
                            }))
                            .await;
                        if spec.critical {
                            return;
                        }
                    }
                }
            }
            let _ = tx.send(Signal::Event(AssistantEvent::SequenceFinished)).await;
        }));
    }

    /// Starts the VRAM guard poll against the monitoring service.
    pub fn start_vram_poll(&mut self) {
        let monitoring = self.monitoring.clone();
        let tx = self.tx.clone();
        let handle = spawn_poll(
            "vram",
            VRAM_POLL_INITIAL_DELAY,
            VRAM_POLL,
            self.cancel.child_token(),
            move || {
                let monitoring = monitoring.clone();
                let tx = tx.clone();
                async move {
                    let report = monitoring.vram_status().await?;
                    let _ = tx.send(Signal::Vram(report)).await;
                    Ok::<(), ApiError>(())
                }
            },
        );
        self.tasks.push(handle);
    }

    /// Sends one chat message. The user line shows immediately; the reply,
    /// a rejection, or an unreachable-gateway line follows. Empty input and
    /// sends while a request is in flight are dropped.
    pub fn send_chat(&mut self, text: impl Into<String>) {
        let text = text.into();
        let text = text.trim();
        if text.is_empty() || self.store.state().sending {
            return;
        }
        let request = ChatRequest {
            text: text.to_owned(),
            user_id: self.user_id.clone(),
            tts_mode: self.tts_mode.clone(),
        };
        self.store.apply(AssistantEvent::MessageSent {
            text: text.to_owned(),
        });

        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let ev = match gateway.chat(&request).await {
                Ok(reply) => AssistantEvent::ReplyReceived(reply),
                Err(err) if err.kind() == ApiErrorKind::Rejected => AssistantEvent::ChatRejected {
                    detail: err.detail(),
                    at: Instant::now(),
                },
                Err(err) => {
                    warn!("chat request failed: {err}");
                    AssistantEvent::GatewayUnreachable { at: Instant::now() }
                }
            };
            let _ = tx.send(Signal::Event(ev)).await;
        }));
    }

    /// Uploads recorded audio for transcription; the recognized text lands
    /// in the draft.
    pub fn transcribe(&mut self, audio: Vec<u8>, filename: impl Into<String>) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        let filename = filename.into();
        self.tasks.push(tokio::spawn(async move {
            let ev = match gateway.transcribe(audio, &filename).await {
                Ok(text) => AssistantEvent::TranscriptReady { text },
                Err(err) if err.kind() == ApiErrorKind::Rejected => {
                    AssistantEvent::TranscriptFailed {
                        detail: err.detail(),
                        at: Instant::now(),
                    }
                }
                Err(err) => {
                    warn!("transcription request failed: {err}");
                    AssistantEvent::SttUnavailable { at: Instant::now() }
                }
            };
            let _ = tx.send(Signal::Event(ev)).await;
        }));
    }

    /// Drives the kernel until cancelled or every sender is gone.
    pub async fn run(&mut self) {
        let cancel = self.cancel.clone();
        loop {
            let signal = tokio::select! {
                _ = cancel.cancelled() => break,
                signal = self.rx.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
            };
            self.handle(signal);
        }
    }

    /// Drives the kernel until `done` holds for the state.
    pub async fn run_until(&mut self, mut done: impl FnMut(&AssistantState) -> bool) {
        if done(&self.store.state()) {
            return;
        }
        let cancel = self.cancel.clone();
        loop {
            let signal = tokio::select! {
                _ = cancel.cancelled() => break,
                signal = self.rx.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
            };
            self.handle(signal);
            if done(&self.store.state()) {
                break;
            }
        }
    }

    fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Stream(StreamEvent::Opened) => {
                self.store.apply(AssistantEvent::Conn(ConnState::Open));
                if let Some(stream) = &self.stream {
                    let subscribed = stream
                        .send_json(&Subscribe::new(["utterance", "emotion", "service-status"]));
                    if !subscribed {
                        debug!("subscribe request dropped");
                    }
                }
            }
            Signal::Stream(StreamEvent::Frame(frame)) => self.apply_frame(frame),
            Signal::Stream(StreamEvent::Closed) => {
                self.store.apply(AssistantEvent::Conn(ConnState::Closed));
            }
            Signal::Stream(StreamEvent::GaveUp) => {
                self.store.apply(AssistantEvent::Conn(ConnState::GaveUp));
            }
            Signal::Vram(report) => match self.guard.observe(&report) {
                Some(update) => self.store.apply(AssistantEvent::VramObserved {
                    update,
                    at: Instant::now(),
                }),
                None => self.store.apply(AssistantEvent::VramUnreadable),
            },
            Signal::Event(ev) => self.store.apply(ev),
        }
    }

    fn apply_frame(&mut self, frame: Frame) {
        match frame.kind.as_str() {
            "emotion" => {
                if let Some(payload) = frame.data::<EmotionPayload>() {
                    self.store.apply(AssistantEvent::EmotionChanged {
                        emotion: payload.emotion,
                    });
                }
            }
            "service-status" => {
                if let Some(delta) = frame.data::<ServiceActionDelta>() {
                    self.store.apply(AssistantEvent::ServiceDelta(delta));
                }
            }
            other => debug!("ignoring frame kind {other:?}"),
        }
    }
}
