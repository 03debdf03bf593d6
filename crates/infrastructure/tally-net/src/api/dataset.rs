use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use tally_core::entry::{BackendHealth, DatasetEntry, EntryStatus, RunSnapshot};

use crate::api::{decode, expect_acked, expect_ok};
use crate::error::ApiError;

/// One page of the entry listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryPage {
    pub entries: Vec<DatasetEntry>,
    pub total: u64,
}

/// Result of reconciling tracked state against the files on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncOutcome {
    pub files_found: u64,
    pub files_missing: u64,
    pub synced_entries: u64,
}

/// Client for the dataset generation backend. Every endpoint answers with
/// the `{ok, error?}` acknowledgement flavour; `ok: false` surfaces as a
/// rejection and is never retried here.
#[derive(Debug, Clone)]
pub struct DatasetClient {
    client: Client,
    base: String,
}

impl DatasetClient {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    async fn get_acked(&self, path: &str) -> Result<Value, ApiError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await?;
        expect_acked(decode(expect_ok(resp).await?).await?)
    }

    async fn post_acked(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let mut req = self.client.post(format!("{}{path}", self.base));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        expect_acked(decode(expect_ok(resp).await?).await?)
    }

    /// Initializes the dataset. Returns the number of clips it holds.
    pub async fn initialize(&self) -> Result<u64, ApiError> {
        let ack = self.post_acked("/api/initialize", None).await?;
        Ok(ack.get("total_clips").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn start(&self, parallel_workers: u32, backend: &str) -> Result<(), ApiError> {
        self.post_acked(
            "/api/start",
            Some(json!({ "parallel_workers": parallel_workers, "backend": backend })),
        )
        .await?;
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), ApiError> {
        self.post_acked("/api/pause", None).await?;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), ApiError> {
        self.post_acked("/api/resume", None).await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), ApiError> {
        self.post_acked("/api/stop", None).await?;
        Ok(())
    }

    /// Asks the run loop to re-check regeneration priorities now instead of
    /// at its own pace.
    pub async fn force_priority_check(&self) -> Result<(), ApiError> {
        self.post_acked("/api/force_priority_check", None).await?;
        Ok(())
    }

    /// Queues one entry for regeneration. `emotion: None` lets the backend
    /// pick one.
    pub async fn regenerate(&self, entry_id: u64, emotion: Option<&str>) -> Result<(), ApiError> {
        self.post_acked(
            "/api/regenerate",
            Some(json!({ "entry_id": entry_id, "emotion": emotion })),
        )
        .await?;
        Ok(())
    }

    pub async fn sync_state(&self) -> Result<SyncOutcome, ApiError> {
        let ack = self.post_acked("/api/sync_state", None).await?;
        Ok(serde_json::from_value(ack)?)
    }

    /// Marks every entry from `start_from_id` on as pending again. Returns
    /// how many entries were reset.
    pub async fn reset_from(&self, start_from_id: u64) -> Result<u64, ApiError> {
        let ack = self
            .post_acked("/api/reset_from", Some(json!({ "start_from_id": start_from_id })))
            .await?;
        Ok(ack.get("reset_count").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn status(&self) -> Result<RunSnapshot, ApiError> {
        let ack = self.get_acked("/api/status").await?;
        let status = ack.get("status").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(status)?)
    }

    pub async fn entries(
        &self,
        limit: u64,
        offset: u64,
        status_filter: Option<EntryStatus>,
    ) -> Result<EntryPage, ApiError> {
        let mut path = format!("/api/entries?limit={limit}&offset={offset}");
        if let Some(filter) = status_filter {
            path.push_str(&format!("&status_filter={filter}"));
        }
        let ack = self.get_acked(&path).await?;
        Ok(serde_json::from_value(ack)?)
    }

    pub async fn services(&self) -> Result<BackendHealth, ApiError> {
        let ack = self.get_acked("/api/services").await?;
        let services = ack.get("services").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(services).unwrap_or_default())
    }
}
