use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Offline,
    Starting,
    Online,
    Warning,
    Error,
}

impl ServiceStatus {
    /// Lenient mapping for status strings coming off the wire. Anything the
    /// vocabulary does not cover reads as offline rather than failing the
    /// whole snapshot.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "online" => Self::Online,
            "starting" => Self::Starting,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Offline,
        }
    }

    /// Maps a lifecycle action from a `service-status` delta onto the status
    /// it implies.
    pub fn from_action(action: &str) -> Self {
        match action {
            "started" => Self::Online,
            "stopped" => Self::Offline,
            "starting" | "restarting" => Self::Starting,
            _ => Self::Offline,
        }
    }

    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Offline => "offline",
            Self::Starting => "starting",
            Self::Online => "online",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub critical: bool,
    /// Started through the monitoring service directly; the gateway cannot
    /// route a start request to itself while it is down.
    pub bootstrap: bool,
}

/// The managed service set, in startup order.
pub const REGISTRY: [ServiceSpec; 7] = [
    ServiceSpec { id: "gateway", label: "Gateway", critical: true, bootstrap: true },
    ServiceSpec { id: "memory-api", label: "Memory API", critical: false, bootstrap: false },
    ServiceSpec { id: "conversation", label: "Conversation", critical: true, bootstrap: false },
    ServiceSpec { id: "tts-blips", label: "TTS Blips", critical: false, bootstrap: false },
    ServiceSpec { id: "tts-router", label: "TTS Router", critical: false, bootstrap: false },
    ServiceSpec { id: "tts-casiopy", label: "TTS Casiopy", critical: false, bootstrap: false },
    ServiceSpec { id: "stt", label: "STT (Voice)", critical: false, bootstrap: false },
];

/// The chat surface is usable once this service is online.
pub const CORE_SERVICE: &str = "conversation";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub spec: ServiceSpec,
    pub status: ServiceStatus,
}

/// Status table over the fixed registry. The identifier set is closed: a
/// snapshot covers every member (absent means offline) and identifiers
/// outside the registry are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTable {
    records: Vec<ServiceRecord>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self {
            records: REGISTRY
                .iter()
                .map(|spec| ServiceRecord {
                    spec: *spec,
                    status: ServiceStatus::Offline,
                })
                .collect(),
        }
    }

    /// Reconciles a full status snapshot: every registry member picks up the
    /// reported status, members the snapshot does not mention go offline.
    pub fn apply_snapshot(&mut self, statuses: &HashMap<String, ServiceStatus>) {
        for rec in &mut self.records {
            rec.status = statuses
                .get(rec.spec.id)
                .copied()
                .unwrap_or(ServiceStatus::Offline);
        }
    }

    /// Sets one member's status. Returns false (and changes nothing) for
    /// identifiers outside the registry.
    pub fn set_status(&mut self, id: &str, status: ServiceStatus) -> bool {
        match self.records.iter_mut().find(|r| r.spec.id == id) {
            Some(rec) => {
                rec.status = status;
                true
            }
            None => false,
        }
    }

    pub fn status(&self, id: &str) -> Option<ServiceStatus> {
        self.records
            .iter()
            .find(|r| r.spec.id == id)
            .map(|r| r.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_online()).count()
    }

    pub fn core_ready(&self) -> bool {
        self.status(CORE_SERVICE)
            .map(ServiceStatus::is_online)
            .unwrap_or(false)
    }
}

impl Default for ServiceTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload of a `service-status` stream delta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceActionDelta {
    pub id: String,
    #[serde(default)]
    pub action: String,
}
