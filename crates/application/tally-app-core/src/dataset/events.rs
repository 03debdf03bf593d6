use std::time::Instant;

use tally_core::entry::{
    BackendHealth, DatasetEntry, EntryPatch, EntryStatus, LogLine, ProgressDelta, RunSnapshot,
};
use tally_net::ConnState;

#[derive(Debug, Clone)]
pub enum DatasetEvent {
    Conn(ConnState),

    // --- Run lifecycle ---
    /// Full snapshot, from `status` frames and the status poll.
    StatusReported {
        snapshot: RunSnapshot,
    },
    /// Incremental counters from `progress` frames.
    ProgressReported(ProgressDelta),
    Initialized {
        total_clips: u64,
        at: Instant,
    },
    StopRequested,
    StopAccepted {
        at: Instant,
    },
    StopRejected {
        detail: String,
        at: Instant,
    },
    /// A control request the backend refused; start, pause, resume and the
    /// like.
    ControlRejected {
        action: &'static str,
        detail: String,
        at: Instant,
    },
    PriorityCheckQueued {
        at: Instant,
    },
    ResetDone {
        reset_count: u64,
        from: u64,
        at: Instant,
    },

    // --- Entries ---
    EntryPatched {
        patch: EntryPatch,
        at: Instant,
    },
    PageLoaded {
        page: u64,
        filter: Option<EntryStatus>,
        entries: Vec<DatasetEntry>,
        total: u64,
    },
    PageLoadFailed {
        detail: String,
        at: Instant,
    },

    // --- Feed and backends ---
    BackendsReported(BackendHealth),
    LogAppended(LogLine),
    StreamError {
        message: String,
        at: Instant,
    },
}
