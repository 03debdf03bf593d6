use std::collections::HashMap;

use tally_core::health::{MonitorService, ResponseHistory, ServiceMetrics, SystemHealth};
use tally_core::telemetry::{DockerStats, DockerStatus, GpuSample};
use tally_net::ConnState;

use crate::notify::NoticeSlot;

#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub health: SystemHealth,
    /// Monitored services by identifier. The set is open: each snapshot
    /// replaces it wholesale with whatever the monitor reports.
    pub services: HashMap<String, MonitorService>,
    pub metrics: HashMap<String, ServiceMetrics>,
    /// Recent response times per service, fed by snapshots.
    pub history: HashMap<String, ResponseHistory>,
    pub docker: Option<DockerStatus>,
    pub docker_stats: Option<DockerStats>,
    pub gpu: Option<GpuSample>,
    pub conn: ConnState,
    pub notices: NoticeSlot,
}
