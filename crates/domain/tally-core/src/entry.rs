use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl RunStatus {
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped | Self::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Error,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: u64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub file_size_kb: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Bumped on every write that reaches this record. Not wire data.
    #[serde(skip)]
    pub revision: u64,
}

impl DatasetEntry {
    fn from_patch(patch: &EntryPatch) -> Self {
        let mut entry = Self {
            id: patch.id,
            filename: String::new(),
            text: String::new(),
            status: EntryStatus::Pending,
            duration_seconds: None,
            file_size_kb: None,
            error_message: None,
            revision: 0,
        };
        entry.merge(patch);
        entry
    }

    /// Merges only the fields the patch supplies. A status move away from
    /// error clears any stale error text.
    pub fn merge(&mut self, patch: &EntryPatch) {
        if let Some(filename) = &patch.filename {
            self.filename = filename.clone();
        }
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status != EntryStatus::Error {
                self.error_message = None;
            }
        }
        if let Some(duration) = patch.duration_seconds {
            self.duration_seconds = Some(duration);
        }
        if let Some(size) = patch.file_size_kb {
            self.file_size_kb = Some(size);
        }
        if let Some(message) = &patch.error_message {
            self.error_message = Some(message.clone());
        }
        self.revision += 1;
    }
}

/// Payload of an `entry_update` stream delta. Absent fields leave the stored
/// record untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntryPatch {
    pub id: u64,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub status: Option<EntryStatus>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub file_size_kb: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Reconciling table over dataset entries. The identifier set is open: page
/// fetches refresh the records they mention and deltas may discover new
/// identifiers. Records never fetched or patched stay untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryTable {
    records: BTreeMap<u64, DatasetEntry>,
    visible: Vec<u64>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one page fetch: the listed entries become the visible page and
    /// their records are replaced wholesale. Everything else is left alone.
    pub fn apply_page(&mut self, entries: Vec<DatasetEntry>) {
        self.visible = entries.iter().map(|e| e.id).collect();
        for mut entry in entries {
            entry.revision = self
                .records
                .get(&entry.id)
                .map(|old| old.revision + 1)
                .unwrap_or(1);
            self.records.insert(entry.id, entry);
        }
    }

    /// Merges one delta, inserting the record if the identifier is new.
    pub fn apply_patch(&mut self, patch: &EntryPatch) {
        match self.records.get_mut(&patch.id) {
            Some(entry) => entry.merge(patch),
            None => {
                self.records.insert(patch.id, DatasetEntry::from_patch(patch));
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<&DatasetEntry> {
        self.records.get(&id)
    }

    pub fn is_visible(&self, id: u64) -> bool {
        self.visible.contains(&id)
    }

    /// Entries of the current page, in fetch order.
    pub fn visible_entries(&self) -> Vec<&DatasetEntry> {
        self.visible.iter().filter_map(|id| self.records.get(id)).collect()
    }

    pub fn known(&self) -> usize {
        self.records.len()
    }
}

/// Zero-based page that holds an entry, for page-size `page_size` listings.
pub fn page_for(entry_id: u64, page_size: u64) -> u64 {
    entry_id.saturating_sub(1) / page_size
}

/// Full run snapshot as reported by `status` frames and the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSnapshot {
    pub status: RunStatus,
    pub completed: u64,
    pub failed: u64,
    pub total_clips: u64,
    pub total_duration_formatted: String,
    pub progress_percentage: f64,
}

/// Incremental counters from `progress` frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressDelta {
    pub completed: u64,
    pub failed: u64,
    pub percentage: f64,
}

/// Health of the generation backends, from `service_status` frames and the
/// services endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendHealth {
    pub tts_available: bool,
    pub fish_available: bool,
}

/// One `log` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogLine {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub message: String,
}

fn default_log_level() -> String {
    "info".to_owned()
}
