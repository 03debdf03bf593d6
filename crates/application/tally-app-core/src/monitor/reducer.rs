use tally_config::RESPONSE_HISTORY_CAP;
use tally_core::notify::Notice;

use super::events::MonitorEvent;
use super::state::MonitorState;

pub fn reduce(mut state: MonitorState, ev: MonitorEvent) -> MonitorState {
    match ev {
        MonitorEvent::Conn(conn) => state.conn = conn,

        MonitorEvent::Snapshot(snapshot) => {
            if let Some(health) = snapshot.health {
                state.health = health;
            }
            if let Some(services) = snapshot.services {
                state.services = services;
                // One history sample per service that is up and actually
                // reported a time.
                for (id, svc) in &state.services {
                    match svc.response_time_ms {
                        Some(ms) if svc.is_online() && ms > 0.0 => {
                            state
                                .history
                                .entry(id.clone())
                                .or_default()
                                .push_capped(ms, RESPONSE_HISTORY_CAP);
                        }
                        _ => {}
                    }
                }
            }
            if let Some(metrics) = snapshot.metrics {
                state.metrics = metrics;
            }
        }

        MonitorEvent::Telemetry { docker, stats, gpu } => {
            if docker.is_some() {
                state.docker = docker;
            }
            if stats.is_some() {
                state.docker_stats = stats;
            }
            if gpu.is_some() {
                state.gpu = gpu;
            }
        }

        MonitorEvent::ControlAccepted {
            service,
            action,
            at,
        } => {
            state
                .notices
                .show(Notice::success(format!("{service} {action} succeeded")), at);
        }

        MonitorEvent::ControlRejected {
            service,
            action,
            detail,
            at,
        } => {
            state.notices.show(
                Notice::error(format!("{service} {action} failed: {detail}")),
                at,
            );
        }

        MonitorEvent::DockerAccepted { action, at } => {
            state
                .notices
                .show(Notice::success(format!("docker {action} succeeded")), at);
        }

        MonitorEvent::DockerRejected { action, detail, at } => {
            state.notices.show(
                Notice::error(format!("docker {action} failed: {detail}")),
                at,
            );
        }
    }
    state
}
