use std::collections::{HashMap, VecDeque};

use serde::Deserialize;

/// Aggregate system health from the monitoring feed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemHealth {
    pub health_status: String,
    pub online: u32,
    pub total_services: u32,
    pub overall_uptime_percentage: f64,
    pub unresolved_alerts: u32,
}

/// One monitored service. Status stays a raw string: the monitor's
/// vocabulary is its own and is displayed verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorService {
    pub name: String,
    pub status: String,
    pub port: Option<u16>,
    pub response_time_ms: Option<f64>,
    pub manageable: bool,
    pub managed_by: Option<String>,
}

impl MonitorService {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceMetrics {
    pub uptime_percentage: f64,
}

/// Body of `init` and `update` monitoring frames. All sections optional; an
/// absent section leaves the corresponding state untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardSnapshot {
    pub health: Option<SystemHealth>,
    pub services: Option<HashMap<String, MonitorService>>,
    pub metrics: Option<HashMap<String, ServiceMetrics>>,
}

/// Recent response-time samples for one service, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHistory {
    samples: VecDeque<f64>,
}

impl ResponseHistory {
    pub fn push_capped(&mut self, sample: f64, cap: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > cap {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

/// Positionwise mean of all per-service histories: sample i of the result
/// averages sample i of every history that has one. Chart input.
pub fn average_response_series(histories: &HashMap<String, ResponseHistory>) -> Vec<f64> {
    let longest = histories.values().map(ResponseHistory::len).max().unwrap_or(0);
    let mut series = Vec::with_capacity(longest);
    for i in 0..longest {
        let mut sum = 0.0;
        let mut count = 0usize;
        for history in histories.values() {
            if let Some(sample) = history.iter().nth(i) {
                sum += sample;
                count += 1;
            }
        }
        series.push(if count > 0 { sum / count as f64 } else { 0.0 });
    }
    series
}

/// One record from the service action log endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceLogRecord {
    pub timestamp: Option<String>,
    pub action: Option<String>,
    pub event_type: Option<String>,
    pub success: bool,
    pub duration_ms: Option<f64>,
    pub final_status: Option<String>,
    pub error: Option<String>,
    pub port: Option<u16>,
}

impl ServiceLogRecord {
    pub fn action_label(&self) -> &str {
        self.action
            .as_deref()
            .or(self.event_type.as_deref())
            .unwrap_or("unknown")
    }

    pub fn status_label(&self) -> &str {
        match self.final_status.as_deref() {
            Some(status) => status,
            None if self.success => "success",
            None => "error",
        }
    }
}
