use std::collections::HashMap;
use std::fmt;

use reqwest::Client;
use serde_json::Value;

use tally_core::health::{MonitorService, ServiceLogRecord, ServiceMetrics};
use tally_core::telemetry::{DockerStats, DockerStatus, GpuSample, VramReport};

use crate::api::{decode, expect_acked, expect_ok};
use crate::error::ApiError;

/// Lifecycle verb for a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle verb for the synthesis container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerAction {
    Start,
    Stop,
    Restart,
    /// Tears the container down entirely. The backend refuses this one
    /// without an explicit confirmation flag on the query string.
    Remove,
}

impl DockerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for DockerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the monitoring backend: probe snapshots, GPU and container
/// telemetry, service lifecycle control, and the audit log.
#[derive(Debug, Clone)]
pub struct MonitoringClient {
    client: Client,
    base: String,
}

impl MonitoringClient {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    async fn get_value(&self, path: &str) -> Result<Value, ApiError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await?;
        decode(expect_ok(resp).await?).await
    }

    async fn post_acked(&self, path: &str) -> Result<Value, ApiError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base))
            .send()
            .await?;
        expect_acked(decode(expect_ok(resp).await?).await?)
    }

    /// Probe results for every monitored service, keyed by identifier.
    pub async fn service_statuses(&self) -> Result<HashMap<String, MonitorService>, ApiError> {
        let value = self.get_value("/api/services/status").await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Uptime accounting per service.
    pub async fn metrics(&self) -> Result<HashMap<String, ServiceMetrics>, ApiError> {
        let ack = expect_acked(self.get_value("/api/monitoring/metrics").await?)?;
        let metrics = ack.get("metrics").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(metrics).unwrap_or_default())
    }

    /// Combined GPU sample and guard state. Either half may be missing when
    /// the collector has nothing fresh.
    pub async fn vram_status(&self) -> Result<VramReport, ApiError> {
        let value = self.get_value("/api/vram/status").await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn gpu_stats(&self) -> Result<GpuSample, ApiError> {
        let ack = expect_acked(self.get_value("/api/gpu/stats").await?)?;
        let gpu = ack.get("gpu").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(gpu).unwrap_or_default())
    }

    pub async fn docker_status(&self) -> Result<DockerStatus, ApiError> {
        let ack = expect_acked(self.get_value("/api/docker/status").await?)?;
        Ok(serde_json::from_value(ack).unwrap_or_default())
    }

    pub async fn docker_stats(&self) -> Result<DockerStats, ApiError> {
        let ack = expect_acked(self.get_value("/api/docker/stats").await?)?;
        let stats = ack.get("stats").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(stats).unwrap_or_default())
    }

    /// Starts, stops or restarts a managed service. Rejections carry the
    /// backend's reason, for example a service that is not manageable.
    pub async fn control_service(&self, id: &str, action: ServiceAction) -> Result<(), ApiError> {
        self.post_acked(&format!("/api/services/{id}/{action}"))
            .await?;
        Ok(())
    }

    pub async fn docker_control(&self, action: DockerAction) -> Result<(), ApiError> {
        let path = match action {
            DockerAction::Remove => "/api/docker/remove?confirm=true".to_owned(),
            other => format!("/api/docker/{other}"),
        };
        self.post_acked(&path).await?;
        Ok(())
    }

    /// Recent audit records for one service, newest first.
    pub async fn service_log(&self, id: &str, limit: u32) -> Result<Vec<ServiceLogRecord>, ApiError> {
        let ack = expect_acked(
            self.get_value(&format!("/api/logs/service/{id}?limit={limit}"))
                .await?,
        )?;
        let logs = ack.get("logs").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(logs).unwrap_or_default())
    }
}
