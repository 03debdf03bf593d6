//! Pure projections from console state to display-ready rows and lines.

use tally_config::ENTRY_PAGE_SIZE;
use tally_core::entry::{DatasetEntry, RunStatus};
use tally_core::health::{average_response_series, SystemHealth};
use tally_core::notify::{Notice, Severity};
use tally_core::service::ServiceRecord;
use tally_net::ConnState;

use crate::assistant::{AssistantState, ChatLine, Speaker};
use crate::dataset::DatasetState;
use crate::monitor::MonitorState;

fn format_response(ms: Option<f64>) -> String {
    match ms {
        Some(ms) if ms > 0.0 => format!("{} ms", ms.round() as u64),
        _ => "n/a".to_owned(),
    }
}

fn format_duration(secs: Option<f64>) -> String {
    secs.map(|s| format!("{s:.1}s")).unwrap_or_default()
}

fn format_size(kb: Option<f64>) -> String {
    kb.map(|kb| format!("{kb:.1} KB")).unwrap_or_default()
}

pub fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Warning => "warn",
        Severity::Error => "error",
    }
}

pub fn notice_line(notice: &Notice) -> String {
    format!("[{}] {}", severity_label(notice.severity), notice.text)
}

pub fn conn_label(conn: ConnState) -> &'static str {
    match conn {
        ConnState::Connecting => "connecting",
        ConnState::Open => "live",
        ConnState::Closed => "reconnecting",
        ConnState::GaveUp => "offline",
    }
}

// --- Assistant console ---

#[derive(Debug, Clone)]
pub struct ServiceRowVm {
    pub id: String,
    pub label: String,
    pub status_label: String,
    pub online: bool,
    pub critical: bool,
}

impl From<&ServiceRecord> for ServiceRowVm {
    fn from(rec: &ServiceRecord) -> Self {
        Self {
            id: rec.spec.id.to_owned(),
            label: rec.spec.label.to_owned(),
            status_label: rec.status.to_string(),
            online: rec.status.is_online(),
            critical: rec.spec.critical,
        }
    }
}

pub fn service_rows(state: &AssistantState) -> Vec<ServiceRowVm> {
    state.services.iter().map(ServiceRowVm::from).collect()
}

#[derive(Debug, Clone)]
pub struct ChatLineVm {
    pub prefix: &'static str,
    pub text: String,
    /// The line carries a speech payload a renderer could play.
    pub has_audio: bool,
}

impl From<&ChatLine> for ChatLineVm {
    fn from(line: &ChatLine) -> Self {
        let text = match (&line.speaker, &line.emotion) {
            (Speaker::Assistant, Some(emotion)) => format!("{} [{emotion}]", line.text),
            _ => line.text.clone(),
        };
        Self {
            prefix: match line.speaker {
                Speaker::User => "you",
                Speaker::Assistant => "cas",
            },
            text,
            has_audio: line.audio_b64.is_some(),
        }
    }
}

pub fn chat_lines(state: &AssistantState) -> Vec<ChatLineVm> {
    state.chat.iter().map(ChatLineVm::from).collect()
}

/// GPU badge text for the assistant header.
pub fn vram_badge(state: &AssistantState) -> String {
    match state.vram.gpu.as_ref().and_then(|gpu| gpu.memory_pct()) {
        Some(pct) => format!("VRAM {pct:.0}% {}", state.vram.level),
        None => "VRAM n/a".to_owned(),
    }
}

// --- Dataset console ---

#[derive(Debug, Clone)]
pub struct EntryRowVm {
    pub id: u64,
    pub filename: String,
    pub text: String,
    pub status_label: String,
    pub duration: String,
    pub size: String,
    pub error: Option<String>,
}

impl From<&DatasetEntry> for EntryRowVm {
    fn from(entry: &DatasetEntry) -> Self {
        Self {
            id: entry.id,
            filename: entry.filename.clone(),
            text: entry.text.clone(),
            status_label: entry.status.to_string(),
            duration: format_duration(entry.duration_seconds),
            size: format_size(entry.file_size_kb),
            error: entry.error_message.clone(),
        }
    }
}

/// Run status label; an in-flight stop shows as stopping until a report
/// settles it.
pub fn run_status_label(state: &DatasetState) -> String {
    if state.stop_pending {
        "stopping".to_owned()
    } else {
        state.run.status.to_string()
    }
}

pub fn run_line(state: &DatasetState) -> String {
    let run = &state.run;
    format!(
        "{}  {}/{} ({:.1}%)  failed {}  audio {}",
        run_status_label(state),
        run.completed,
        run.total_clips,
        run.progress_percentage,
        run.failed,
        if run.total_duration_formatted.is_empty() {
            "0s"
        } else {
            run.total_duration_formatted.as_str()
        },
    )
}

pub fn backend_line(state: &DatasetState) -> String {
    let up = |available: bool| if available { "up" } else { "down" };
    format!(
        "tts {}  fish {}",
        up(state.backends.tts_available),
        up(state.backends.fish_available)
    )
}

pub fn page_line(state: &DatasetState) -> String {
    let pages = state.total.div_ceil(ENTRY_PAGE_SIZE).max(1);
    format!(
        "page {} of {pages}  ({} entries)",
        state.page + 1,
        state.total
    )
}

/// Which run controls apply in the current status. A settling stop holds
/// everything off until the next report lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunActionsVm {
    pub start: bool,
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
    pub priority_check: bool,
    pub reset: bool,
}

pub fn run_actions(state: &DatasetState) -> RunActionsVm {
    if state.stop_pending {
        return RunActionsVm::default();
    }
    let status = state.run.status;
    RunActionsVm {
        start: status.can_start(),
        pause: status == RunStatus::Running,
        resume: status == RunStatus::Paused,
        stop: matches!(status, RunStatus::Running | RunStatus::Paused),
        priority_check: status == RunStatus::Running,
        reset: status != RunStatus::Running,
    }
}

// --- Monitoring console ---

#[derive(Debug, Clone)]
pub struct MonitorRowVm {
    pub id: String,
    pub name: String,
    pub status_label: String,
    pub port: String,
    pub response: String,
    pub uptime: String,
}

/// Service table rows, ordered by identifier for a stable listing.
pub fn monitor_rows(state: &MonitorState) -> Vec<MonitorRowVm> {
    let mut ids: Vec<&String> = state.services.keys().collect();
    ids.sort();
    ids.into_iter()
        .map(|id| {
            let svc = &state.services[id];
            let uptime = state
                .metrics
                .get(id)
                .map(|m| format!("{:.1}%", m.uptime_percentage))
                .unwrap_or_else(|| "n/a".to_owned());
            MonitorRowVm {
                id: id.clone(),
                name: if svc.name.is_empty() {
                    id.clone()
                } else {
                    svc.name.clone()
                },
                status_label: svc.status.clone(),
                port: svc.port.map(|p| p.to_string()).unwrap_or_default(),
                response: format_response(svc.response_time_ms),
                uptime,
            }
        })
        .collect()
}

pub fn health_line(health: &SystemHealth) -> String {
    format!(
        "{}: {}/{} online, uptime {:.1}%, {} unresolved alerts",
        if health.health_status.is_empty() {
            "unknown"
        } else {
            &health.health_status
        },
        health.online,
        health.total_services,
        health.overall_uptime_percentage,
        health.unresolved_alerts
    )
}

pub fn docker_line(state: &MonitorState) -> String {
    let running = match &state.docker {
        Some(status) if status.running => "running",
        Some(_) => "stopped",
        None => "unknown",
    };
    match &state.docker_stats {
        Some(stats) => format!(
            "docker {running}  cpu {}  mem {}",
            stats.cpu_percent.as_deref().unwrap_or("n/a"),
            stats.memory_usage.as_deref().unwrap_or("n/a")
        ),
        None => format!("docker {running}"),
    }
}

pub fn gpu_line(state: &MonitorState) -> String {
    match &state.gpu {
        Some(gpu) => {
            let pct = |v: Option<f64>| {
                v.map(|v| format!("{v:.0}%")).unwrap_or_else(|| "n/a".to_owned())
            };
            let temp = gpu
                .temperature_celsius
                .map(|t| format!("{t:.0}C"))
                .unwrap_or_else(|| "n/a".to_owned());
            format!(
                "gpu mem {}  util {}  temp {temp}",
                pct(gpu.memory_percent),
                pct(gpu.gpu_utilization_percent)
            )
        }
        None => "gpu n/a".to_owned(),
    }
}

const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Compact response-time trend over the averaged per-service histories.
pub fn response_sparkline(state: &MonitorState) -> String {
    let series = average_response_series(&state.history);
    if series.is_empty() {
        return String::new();
    }
    let max = series.iter().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return SPARK_GLYPHS[0].to_string().repeat(series.len());
    }
    series
        .iter()
        .map(|v| {
            let idx = ((v / max) * (SPARK_GLYPHS.len() - 1) as f64).round() as usize;
            SPARK_GLYPHS[idx.min(SPARK_GLYPHS.len() - 1)]
        })
        .collect()
}
