use std::collections::HashMap;
use std::time::Instant;

use tally_app_core::monitor::{reduce, MonitorEvent, MonitorState};
use tally_app_core::viewmodel::response_sparkline;
use tally_config::RESPONSE_HISTORY_CAP;
use tally_core::health::{DashboardSnapshot, MonitorService, SystemHealth};
use tally_core::notify::Severity;
use tally_core::telemetry::{DockerStats, DockerStatus, GpuSample};
use tally_net::{DockerAction, ServiceAction};

fn online(name: &str, ms: f64) -> MonitorService {
    MonitorService {
        name: name.to_owned(),
        status: "online".to_owned(),
        port: Some(8000),
        response_time_ms: Some(ms),
        manageable: true,
        managed_by: None,
    }
}

fn offline(name: &str) -> MonitorService {
    MonitorService {
        name: name.to_owned(),
        status: "offline".to_owned(),
        ..MonitorService::default()
    }
}

fn services_snapshot(services: HashMap<String, MonitorService>) -> DashboardSnapshot {
    DashboardSnapshot {
        health: None,
        services: Some(services),
        metrics: None,
    }
}

#[test]
fn each_snapshot_replaces_the_service_set_wholesale() {
    let mut first = HashMap::new();
    first.insert("stt".to_owned(), online("Whisper STT", 12.0));
    first.insert("legacy".to_owned(), offline("Legacy Bridge"));
    let mut state = reduce(
        MonitorState::default(),
        MonitorEvent::Snapshot(services_snapshot(first)),
    );
    assert_eq!(state.services.len(), 2);

    // The monitor dropped "legacy" from its report, so it disappears here.
    let mut second = HashMap::new();
    second.insert("stt".to_owned(), online("Whisper STT", 14.0));
    state = reduce(state, MonitorEvent::Snapshot(services_snapshot(second)));

    assert_eq!(state.services.len(), 1);
    assert!(state.services.contains_key("stt"));
    assert!(!state.services.contains_key("legacy"));
}

#[test]
fn histories_collect_only_real_samples_from_online_services() {
    let mut services = HashMap::new();
    services.insert("stt".to_owned(), online("Whisper STT", 12.5));
    // Online but the probe never measured it.
    services.insert("tts".to_owned(), online("Piper TTS", 0.0));
    // Reported a time while down; a stale number, not a sample.
    let mut down = offline("Conversation");
    down.response_time_ms = Some(80.0);
    services.insert("conversation".to_owned(), down);

    let state = reduce(
        MonitorState::default(),
        MonitorEvent::Snapshot(services_snapshot(services)),
    );

    assert_eq!(state.history.get("stt").map(|h| h.len()), Some(1));
    assert!(!state.history.contains_key("tts"));
    assert!(!state.history.contains_key("conversation"));
}

#[test]
fn histories_cap_and_survive_a_service_going_quiet() {
    let mut state = MonitorState::default();
    for i in 0..(RESPONSE_HISTORY_CAP + 4) {
        let mut services = HashMap::new();
        services.insert("stt".to_owned(), online("Whisper STT", 10.0 + i as f64));
        state = reduce(state, MonitorEvent::Snapshot(services_snapshot(services)));
    }
    assert_eq!(
        state.history.get("stt").map(|h| h.len()),
        Some(RESPONSE_HISTORY_CAP)
    );
    let oldest = state.history.get("stt").unwrap().iter().next().unwrap();
    assert_eq!(oldest, 14.0);

    // A snapshot without the service drops the row but keeps its history.
    state = reduce(
        state,
        MonitorEvent::Snapshot(services_snapshot(HashMap::new())),
    );
    assert!(state.services.is_empty());
    assert_eq!(
        state.history.get("stt").map(|h| h.len()),
        Some(RESPONSE_HISTORY_CAP)
    );
    assert_eq!(response_sparkline(&state).chars().count(), RESPONSE_HISTORY_CAP);
}

#[test]
fn absent_snapshot_sections_leave_state_untouched() {
    let mut services = HashMap::new();
    services.insert("stt".to_owned(), online("Whisper STT", 12.0));
    let mut state = reduce(
        MonitorState::default(),
        MonitorEvent::Snapshot(DashboardSnapshot {
            health: Some(SystemHealth {
                health_status: "healthy".to_owned(),
                online: 5,
                total_services: 7,
                overall_uptime_percentage: 99.2,
                unresolved_alerts: 0,
            }),
            services: Some(services),
            metrics: None,
        }),
    );

    // A services-only refresh must not blank the health panel.
    let mut refreshed = HashMap::new();
    refreshed.insert("stt".to_owned(), online("Whisper STT", 13.0));
    state = reduce(state, MonitorEvent::Snapshot(services_snapshot(refreshed)));

    assert_eq!(state.health.health_status, "healthy");
    assert_eq!(state.health.online, 5);
    assert_eq!(state.services["stt"].response_time_ms, Some(13.0));
}

#[test]
fn missing_telemetry_probes_keep_the_previous_panels() {
    let mut state = reduce(
        MonitorState::default(),
        MonitorEvent::Telemetry {
            docker: Some(DockerStatus { running: true }),
            stats: Some(DockerStats {
                cpu_percent: Some("12.3%".to_owned()),
                memory_usage: Some("1.2GiB / 15.5GiB".to_owned()),
                error: None,
            }),
            gpu: Some(GpuSample {
                memory_percent: Some(41.0),
                ..GpuSample::default()
            }),
        },
    );

    // The next sweep lost the stats and gpu probes.
    state = reduce(
        state,
        MonitorEvent::Telemetry {
            docker: Some(DockerStatus { running: false }),
            stats: None,
            gpu: None,
        },
    );

    assert_eq!(state.docker, Some(DockerStatus { running: false }));
    assert_eq!(
        state.docker_stats.as_ref().and_then(|s| s.cpu_percent.as_deref()),
        Some("12.3%")
    );
    assert_eq!(state.gpu.as_ref().and_then(|g| g.memory_percent), Some(41.0));
}

#[test]
fn control_outcomes_surface_as_notices() {
    let now = Instant::now();
    let state = reduce(
        MonitorState::default(),
        MonitorEvent::ControlAccepted {
            service: "stt".to_owned(),
            action: ServiceAction::Restart,
            at: now,
        },
    );
    let notice = state.notices.visible(now).unwrap();
    assert_eq!(notice.severity, Severity::Success);
    assert_eq!(notice.text, "stt restart succeeded");

    let state = reduce(
        state,
        MonitorEvent::ControlRejected {
            service: "tts".to_owned(),
            action: ServiceAction::Stop,
            detail: "not manageable".to_owned(),
            at: now,
        },
    );
    assert_eq!(
        state.notices.visible(now).unwrap().text,
        "tts stop failed: not manageable"
    );

    let state = reduce(
        state,
        MonitorEvent::DockerRejected {
            action: DockerAction::Remove,
            detail: "confirmation required".to_owned(),
            at: now,
        },
    );
    let notice = state.notices.visible(now).unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.text, "docker remove failed: confirmation required");
}
