use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tally_config::{MONITOR_MAX_RECONNECT_ATTEMPTS, MONITOR_RECONNECT_DELAY, TELEMETRY_POLL};
use tally_core::health::DashboardSnapshot;
use tally_core::Frame;
use tally_net::{
    spawn_poll, ApiError, ConnState, DockerAction, MonitoringClient, ReconnectPolicy,
    ServiceAction, StreamEvent, StreamHandle,
};

use crate::store::Store;

use super::events::MonitorEvent;
use super::reducer::reduce;
use super::state::MonitorState;

pub type MonitorStore = Store<MonitorState, MonitorEvent>;

pub enum Signal {
    Stream(StreamEvent),
    Event(MonitorEvent),
}

/// Drives the monitoring console: the dashboard stream, Docker and GPU
/// telemetry, and service lifecycle controls.
pub struct MonitorKernel {
    pub store: MonitorStore,
    api: Arc<MonitoringClient>,
    reconnect: ReconnectPolicy,
    tx: mpsc::Sender<Signal>,
    rx: mpsc::Receiver<Signal>,
    cancel: CancellationToken,
    stream: Option<StreamHandle>,
    stream_url: Option<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorKernel {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            store: Store::new(MonitorState::default(), reduce),
            api: Arc::new(MonitoringClient::new(client, base)),
            reconnect: ReconnectPolicy::bounded(
                MONITOR_RECONNECT_DELAY,
                MONITOR_MAX_RECONNECT_ATTEMPTS,
            ),
            tx,
            rx,
            cancel: CancellationToken::new(),
            stream: None,
            stream_url: None,
            tasks: Vec::new(),
        }
    }

    /// Overrides the default bounded reconnect budget, e.g. to retry
    /// forever on long-lived watch sessions.
    pub fn set_reconnect_policy(&mut self, policy: ReconnectPolicy) {
        self.reconnect = policy;
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn sender(&self) -> mpsc::Sender<Signal> {
        self.tx.clone()
    }

    /// Connects the dashboard stream, replacing any previous connection.
    pub fn connect(&mut self, ws_url: impl Into<String>) {
        let ws_url = ws_url.into();
        if let Some(old) = self.stream.take() {
            old.stop();
        }
        let (stream_tx, mut stream_rx) = mpsc::channel(64);
        let handle = tally_net::stream::spawn(
            ws_url.clone(),
            self.reconnect,
            stream_tx,
            self.cancel.child_token(),
        );
        self.stream = Some(handle);
        self.stream_url = Some(ws_url);

        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(ev) = stream_rx.recv().await {
                if tx.send(Signal::Stream(ev)).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Restarts the stream after the reconnect budget ran out.
    pub fn reconnect(&mut self) {
        if let Some(url) = self.stream_url.clone() {
            self.connect(url);
        }
    }

    /// Starts the Docker/GPU telemetry poll, firing immediately.
    pub fn start_telemetry_poll(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let handle = spawn_poll(
            "telemetry",
            Duration::ZERO,
            TELEMETRY_POLL,
            self.cancel.child_token(),
            move || {
                let api = api.clone();
                let tx = tx.clone();
                async move {
                    telemetry_sweep(api, tx).await;
                    Ok::<(), ApiError>(())
                }
            },
        );
        self.tasks.push(handle);
    }

    /// Requests a lifecycle action on one service. Success refreshes the
    /// status and metrics sections the way the stream would.
    pub fn control_service(&mut self, service: impl Into<String>, action: ServiceAction) {
        let service = service.into();
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.control_service(&service, action).await {
                Ok(()) => {
                    let _ = tx
                        .send(Signal::Event(MonitorEvent::ControlAccepted {
                            service: service.clone(),
                            action,
                            at: Instant::now(),
                        }))
                        .await;
                    let services = api.service_statuses().await.ok();
                    let metrics = api.metrics().await.ok();
                    let snapshot = DashboardSnapshot {
                        health: None,
                        services,
                        metrics,
                    };
                    let _ = tx.send(Signal::Event(MonitorEvent::Snapshot(snapshot))).await;
                }
                Err(err) => {
                    let _ = tx
                        .send(Signal::Event(MonitorEvent::ControlRejected {
                            service,
                            action,
                            detail: err.detail(),
                            at: Instant::now(),
                        }))
                        .await;
                }
            }
        }));
    }

    /// Requests a container lifecycle action. Success triggers a telemetry
    /// sweep so the panel reflects the new container state.
    pub fn control_docker(&mut self, action: DockerAction) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.docker_control(action).await {
                Ok(()) => {
                    let _ = tx
                        .send(Signal::Event(MonitorEvent::DockerAccepted {
                            action,
                            at: Instant::now(),
                        }))
                        .await;
                    telemetry_sweep(api, tx).await;
                }
                Err(err) => {
                    let _ = tx
                        .send(Signal::Event(MonitorEvent::DockerRejected {
                            action,
                            detail: err.detail(),
                            at: Instant::now(),
                        }))
                        .await;
                }
            }
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
    pub async fn run_until(&mut self, mut done: impl FnMut(&MonitorState) -> bool) {
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
                self.store.apply(MonitorEvent::Conn(ConnState::Open));
            }
            Signal::Stream(StreamEvent::Frame(frame)) => self.apply_frame(frame),
            Signal::Stream(StreamEvent::Closed) => {
                self.store.apply(MonitorEvent::Conn(ConnState::Closed));
            }
            Signal::Stream(StreamEvent::GaveUp) => {
                self.store.apply(MonitorEvent::Conn(ConnState::GaveUp));
            }
            Signal::Event(ev) => self.store.apply(ev),
        }
    }

    fn apply_frame(&mut self, frame: Frame) {
        match frame.kind.as_str() {
            // The monitoring feed is flat: sections sit beside `type`.
            "init" | "update" => {
                if let Some(snapshot) = frame.body::<DashboardSnapshot>() {
                    self.store.apply(MonitorEvent::Snapshot(snapshot));
                    // Every stream snapshot refreshes telemetry too.
                    let api = self.api.clone();
                    let tx = self.tx.clone();
                    self.tasks.push(tokio::spawn(async move {
                        telemetry_sweep(api, tx).await;
                    }));
                }
            }
            other => debug!("ignoring frame kind {other:?}"),
        }
    }
}

/// One parallel probe of container status, container stats and GPU stats.
/// Failed probes and payloads carrying an error string land as `None`,
/// which leaves the previous panel value in place.
async fn telemetry_sweep(api: Arc<MonitoringClient>, tx: mpsc::Sender<Signal>) {
    let (status, stats, gpu) = tokio::join!(api.docker_status(), api.docker_stats(), api.gpu_stats());
    let docker = match status {
        Ok(status) => Some(status),
        Err(err) => {
            debug!("docker status probe failed: {err}");
            None
        }
    };
    let stats = match stats {
        Ok(stats) if stats.error.is_none() => Some(stats),
        Ok(_) => None,
        Err(err) => {
            debug!("docker stats probe failed: {err}");
            None
        }
    };
    let gpu = match gpu {
        Ok(gpu) if gpu.error.is_none() => Some(gpu),
        Ok(_) => None,
        Err(err) => {
            debug!("gpu stats probe failed: {err}");
            None
        }
    };
    let _ = tx
        .send(Signal::Event(MonitorEvent::Telemetry { docker, stats, gpu }))
        .await;
}
