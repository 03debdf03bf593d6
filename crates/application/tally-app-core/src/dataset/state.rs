use std::collections::VecDeque;

use tally_core::entry::{BackendHealth, EntryStatus, EntryTable, LogLine, RunSnapshot};
use tally_net::ConnState;

use crate::notify::{HintSlot, NoticeSlot};

#[derive(Debug, Clone, Default)]
pub struct DatasetState {
    pub run: RunSnapshot,
    pub backends: BackendHealth,
    pub entries: EntryTable,
    /// Zero-based page currently shown.
    pub page: u64,
    pub filter: Option<EntryStatus>,
    /// Entries matching the active filter, from the last page fetch.
    pub total: u64,
    /// Live activity feed, oldest first, capped.
    pub feed: VecDeque<LogLine>,
    /// An optimistic stop is showing; the next status report settles it.
    pub stop_pending: bool,
    pub conn: ConnState,
    pub notices: NoticeSlot,
    pub hint: HintSlot,
}
