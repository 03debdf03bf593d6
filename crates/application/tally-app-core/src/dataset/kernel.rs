use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tally_config::{
    DATASET_BACKEND, DATASET_PARALLEL_WORKERS, DATASET_RECONNECT_DELAY, DATASET_SERVICES_POLL,
    DATASET_STATUS_POLL, ENTRY_PAGE_SIZE, STOP_REFRESH_DELAY,
};
use tally_core::entry::{EntryStatus, RunSnapshot};
use tally_core::Frame;
use tally_net::{
    spawn_poll, ApiError, ConnState, DatasetClient, ReconnectPolicy, StreamEvent, StreamHandle,
    SyncOutcome,
};

use crate::store::Store;

use super::events::DatasetEvent;
use super::reducer::reduce;
use super::state::DatasetState;

pub type DatasetStore = Store<DatasetState, DatasetEvent>;

pub enum Signal {
    Stream(StreamEvent),
    /// Outcome of the one-shot disk sync.
    Synced(SyncOutcome),
    Event(DatasetEvent),
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

/// Drives the dataset console: run controls, the entry table, the live
/// feed and the status/health polls.
pub struct DatasetKernel {
    pub store: DatasetStore,
    api: Arc<DatasetClient>,
    tx: mpsc::Sender<Signal>,
    rx: mpsc::Receiver<Signal>,
    cancel: CancellationToken,
    stream: Option<StreamHandle>,
    /// The disk sync runs at most once per session, on the first status
    /// report that shows an initialized dataset.
    synced_once: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl DatasetKernel {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            store: Store::new(DatasetState::default(), reduce),
            api: Arc::new(DatasetClient::new(client, base)),
            tx,
            rx,
            cancel: CancellationToken::new(),
            stream: None,
            synced_once: false,
            tasks: Vec::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn sender(&self) -> mpsc::Sender<Signal> {
        self.tx.clone()
    }

    /// Connects the dataset event stream. Retries forever on drops.
    pub fn connect(&mut self, ws_url: impl Into<String>) {
        let (stream_tx, mut stream_rx) = mpsc::channel(64);
        let handle = tally_net::stream::spawn(
            ws_url,
            ReconnectPolicy::unbounded(DATASET_RECONNECT_DELAY),
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

    /// Starts the status and backend-health polls, both firing immediately.
    pub fn start_polls(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let handle = spawn_poll(
            "dataset-status",
            Duration::ZERO,
            DATASET_STATUS_POLL,
            self.cancel.child_token(),
            move || {
                let api = api.clone();
                let tx = tx.clone();
                async move {
                    let snapshot = api.status().await?;
                    let _ = tx
                        .send(Signal::Event(DatasetEvent::StatusReported { snapshot }))
                        .await;
                    Ok::<(), ApiError>(())
                }
            },
        );
        self.tasks.push(handle);

        let api = self.api.clone();
        let tx = self.tx.clone();
        let handle = spawn_poll(
            "dataset-services",
            Duration::ZERO,
            DATASET_SERVICES_POLL,
            self.cancel.child_token(),
            move || {
                let api = api.clone();
                let tx = tx.clone();
                async move {
                    let health = api.services().await?;
                    let _ = tx
                        .send(Signal::Event(DatasetEvent::BackendsReported(health)))
                        .await;
                    Ok::<(), ApiError>(())
                }
            },
        );
        self.tasks.push(handle);
    }

    pub fn initialize(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let ev = match api.initialize().await {
                Ok(total_clips) => DatasetEvent::Initialized {
                    total_clips,
                    at: Instant::now(),
                },
                Err(err) => rejected("initialize", err),
            };
            let _ = tx.send(Signal::Event(ev)).await;
        }));
    }

    pub fn start(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.start(DATASET_PARALLEL_WORKERS, DATASET_BACKEND).await {
                Ok(()) => refresh_status(api, tx).await,
                Err(err) => {
                    let _ = tx.send(Signal::Event(rejected("start", err))).await;
                }
            }
        }));
    }

    pub fn pause(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.pause().await {
                Ok(()) => refresh_status(api, tx).await,
                Err(err) => {
                    let _ = tx.send(Signal::Event(rejected("pause", err))).await;
                }
            }
        }));
    }

    pub fn resume(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.resume().await {
                Ok(()) => refresh_status(api, tx).await,
                Err(err) => {
                    let _ = tx.send(Signal::Event(rejected("resume", err))).await;
                }
            }
        }));
    }

    /// Stops the run. The display flips to stopping immediately; a refused
    /// stop reverts it, an accepted one settles through a delayed refetch.
    pub fn stop(&mut self) {
        self.store.apply(DatasetEvent::StopRequested);
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.stop().await {
                Ok(()) => {
                    let _ = tx
                        .send(Signal::Event(DatasetEvent::StopAccepted {
                            at: Instant::now(),
                        }))
                        .await;
                    tokio::time::sleep(STOP_REFRESH_DELAY).await;
                    refresh_status(api, tx).await;
                }
                Err(err) => {
                    let _ = tx
                        .send(Signal::Event(DatasetEvent::StopRejected {
                            detail: err.detail(),
                            at: Instant::now(),
                        }))
                        .await;
                }
            }
        }));
    }

    pub fn force_priority_check(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let ev = match api.force_priority_check().await {
                Ok(()) => DatasetEvent::PriorityCheckQueued { at: Instant::now() },
                Err(err) => rejected("priority check", err),
            };
            let _ = tx.send(Signal::Event(ev)).await;
        }));
    }

    /// Queues one entry for regeneration. Progress arrives as entry deltas.
    pub fn regenerate(&mut self, entry_id: u64, emotion: Option<String>) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.regenerate(entry_id, emotion.as_deref()).await {
                Ok(()) => debug!("entry {entry_id} queued for regeneration"),
                Err(err) => {
                    let _ = tx.send(Signal::Event(rejected("regenerate", err))).await;
                }
            }
        }));
    }

    pub fn reset_from(&mut self, start_from_id: u64) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let ev = match api.reset_from(start_from_id).await {
                Ok(reset_count) => DatasetEvent::ResetDone {
                    reset_count,
                    from: start_from_id,
                    at: Instant::now(),
                },
                Err(err) => rejected("reset", err),
            };
            let _ = tx.send(Signal::Event(ev)).await;
        }));
    }

    /// Fetches one listing page. The fetched entries become the visible
    /// page; records outside it keep whatever the stream last said.
    pub fn load_page(&mut self, page: u64, filter: Option<EntryStatus>) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let ev = match api
                .entries(ENTRY_PAGE_SIZE, page * ENTRY_PAGE_SIZE, filter)
                .await
            {
                Ok(listing) => DatasetEvent::PageLoaded {
                    page,
                    filter,
                    entries: listing.entries,
                    total: listing.total,
                },
                Err(err) => DatasetEvent::PageLoadFailed {
                    detail: err.detail(),
                    at: Instant::now(),
                },
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
    pub async fn run_until(&mut self, mut done: impl FnMut(&DatasetState) -> bool) {
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
                self.store.apply(DatasetEvent::Conn(ConnState::Open));
            }
            Signal::Stream(StreamEvent::Frame(frame)) => self.apply_frame(frame),
            Signal::Stream(StreamEvent::Closed) => {
                self.store.apply(DatasetEvent::Conn(ConnState::Closed));
            }
            Signal::Stream(StreamEvent::GaveUp) => {
                self.store.apply(DatasetEvent::Conn(ConnState::GaveUp));
            }
            Signal::Synced(outcome) => {
                debug!(
                    "dataset sync: {} found, {} missing, {} synced",
                    outcome.files_found, outcome.files_missing, outcome.synced_entries
                );
                if outcome.synced_entries > 0 {
                    let state = self.store.state();
                    self.load_page(state.page, state.filter);
                }
            }
            Signal::Event(ev) => {
                if let DatasetEvent::StatusReported { snapshot } = &ev {
                    self.maybe_sync_on_load(snapshot);
                }
                if let DatasetEvent::ResetDone { .. } = &ev {
                    self.refresh_after_reset();
                }
                self.store.apply(ev);
            }
        }
    }

    /// One-shot reconciliation of entry records against what is on disk.
    /// Runs only while no generation is active; the attempt is spent either
    /// way.
    fn maybe_sync_on_load(&mut self, snapshot: &RunSnapshot) {
        if self.synced_once || snapshot.total_clips == 0 {
            return;
        }
        self.synced_once = true;
        if !snapshot.status.can_start() {
            return;
        }
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match api.sync_state().await {
                Ok(outcome) => {
                    let _ = tx.send(Signal::Synced(outcome)).await;
                }
                Err(err) => warn!("dataset sync failed: {err}"),
            }
        }));
    }

    fn refresh_after_reset(&mut self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            refresh_status(api, tx).await;
        }));
        let state = self.store.state();
        self.load_page(state.page, state.filter);
    }

    fn apply_frame(&mut self, frame: Frame) {
        match frame.kind.as_str() {
            "status" => {
                if let Some(snapshot) = frame.data() {
                    // Stream-origin reports do not trigger the disk sync;
                    // only the poll does.
                    self.store.apply(DatasetEvent::StatusReported { snapshot });
                }
            }
            "progress" => {
                if let Some(delta) = frame.data() {
                    self.store.apply(DatasetEvent::ProgressReported(delta));
                }
            }
            "entry_update" => {
                if let Some(patch) = frame.data() {
                    self.store.apply(DatasetEvent::EntryPatched {
                        patch,
                        at: Instant::now(),
                    });
                }
            }
            "service_status" => {
                if let Some(health) = frame.data() {
                    self.store.apply(DatasetEvent::BackendsReported(health));
                }
            }
            "log" => {
                if let Some(line) = frame.data() {
                    self.store.apply(DatasetEvent::LogAppended(line));
                }
            }
            "error" => {
                if let Some(payload) = frame.data::<ErrorPayload>() {
                    self.store.apply(DatasetEvent::StreamError {
                        message: payload.message,
                        at: Instant::now(),
                    });
                }
            }
            other => debug!("ignoring frame kind {other:?}"),
        }
    }
}

fn rejected(action: &'static str, err: ApiError) -> DatasetEvent {
    DatasetEvent::ControlRejected {
        action,
        detail: err.detail(),
        at: Instant::now(),
    }
}

async fn refresh_status(api: Arc<DatasetClient>, tx: mpsc::Sender<Signal>) {
    match api.status().await {
        Ok(snapshot) => {
            let _ = tx
                .send(Signal::Event(DatasetEvent::StatusReported { snapshot }))
                .await;
        }
        Err(err) => warn!("status refresh failed: {err}"),
    }
}
