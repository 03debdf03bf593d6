use std::time::Instant;

use tally_core::health::DashboardSnapshot;
use tally_core::telemetry::{DockerStats, DockerStatus, GpuSample};
use tally_net::{ConnState, DockerAction, ServiceAction};

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Conn(ConnState),

    /// Dashboard sections from `init`/`update` frames or a status refetch.
    /// Absent sections leave the corresponding state untouched.
    Snapshot(DashboardSnapshot),

    /// One telemetry sweep. `None` fields mean that probe failed or
    /// reported an error and the previous value stands.
    Telemetry {
        docker: Option<DockerStatus>,
        stats: Option<DockerStats>,
        gpu: Option<GpuSample>,
    },

    ControlAccepted {
        service: String,
        action: ServiceAction,
        at: Instant,
    },
    ControlRejected {
        service: String,
        action: ServiceAction,
        detail: String,
        at: Instant,
    },
    DockerAccepted {
        action: DockerAction,
        at: Instant,
    },
    DockerRejected {
        action: DockerAction,
        detail: String,
        at: Instant,
    },
}
