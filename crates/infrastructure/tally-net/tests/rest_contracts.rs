use std::net::SocketAddr;

use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::mpsc;

use tally_core::entry::{EntryStatus, RunStatus};
use tally_core::service::ServiceStatus;
use tally_net::{
    ApiError, ApiErrorKind, ChatRequest, DatasetClient, DockerAction, GatewayClient,
    MonitoringClient, ServiceAction,
};

async fn start_api_server(app: Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

#[tokio::test]
async fn rejected_stop_surfaces_the_backend_reason() {
    let app = Router::new().route(
        "/api/stop",
        post(|| async { r#"{"ok": false, "error": "generation is busy"}"# }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = DatasetClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let err = client.stop().await.unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Rejected);
    assert_eq!(err.detail(), "generation is busy");
}

#[tokio::test]
async fn run_status_decodes_from_the_acknowledgement_envelope() {
    let app = Router::new().route(
        "/api/status",
        get(|| async {
            r#"{"ok": true, "status": {
                "status": "running",
                "completed": 12,
                "failed": 3,
                "total_clips": 100,
                "total_duration_formatted": "8m 12s",
                "progress_percentage": 15.0
            }}"#
        }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = DatasetClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let snapshot = client.status().await.unwrap();
    assert_eq!(snapshot.status, RunStatus::Running);
    assert_eq!(snapshot.completed, 12);
    assert_eq!(snapshot.failed, 3);
    assert_eq!(snapshot.total_duration_formatted, "8m 12s");
}

#[tokio::test]
async fn entry_listing_sends_pagination_and_filter() {
    let app = Router::new().route(
        "/api/entries",
        get(|uri: Uri| async move {
            if uri.query() != Some("limit=50&offset=100&status_filter=error") {
                return (StatusCode::BAD_REQUEST, r#"{"detail": "unexpected query"}"#);
            }
            (
                StatusCode::OK,
                r#"{"ok": true, "entries": [
                    {"id": 101, "filename": "clip_101.wav", "text": "hola", "status": "error", "error_message": "tts timeout"}
                ], "total": 731}"#,
            )
        }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = DatasetClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let page = client
        .entries(50, 100, Some(EntryStatus::Error))
        .await
        .unwrap();
    assert_eq!(page.total, 731);
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].id, 101);
    assert_eq!(page.entries[0].status, EntryStatus::Error);
    assert_eq!(page.entries[0].error_message.as_deref(), Some("tts timeout"));
}

#[tokio::test]
async fn chat_round_trip_carries_the_request_and_decodes_the_reply() {
    let (seen_tx, mut seen) = mpsc::channel::<String>(1);
    let app = Router::new().route(
        "/orchestrate/chat",
        post(move |body: String| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.try_send(body);
                r#"{"reply": "hola!", "emotion": "happy"}"#
            }
        }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = GatewayClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let reply = client
        .chat(&ChatRequest {
            text: "hola".into(),
            user_id: "viewer-123".into(),
            tts_mode: "blips".into(),
        })
        .await
        .unwrap();

    assert_eq!(reply.reply, "hola!");
    assert_eq!(reply.emotion.as_deref(), Some("happy"));
    assert!(reply.audio_b64.is_none());

    let sent: serde_json::Value = serde_json::from_str(&seen.recv().await.unwrap()).unwrap();
    assert_eq!(sent["text"], "hola");
    assert_eq!(sent["user_id"], "viewer-123");
    assert_eq!(sent["tts_mode"], "blips");
}

#[tokio::test]
async fn chat_rejection_carries_the_gateway_detail() {
    let app = Router::new().route(
        "/orchestrate/chat",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                r#"{"detail": "Conversation offline"}"#,
            )
        }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = GatewayClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let err = client
        .chat(&ChatRequest {
            text: "hola".into(),
            user_id: "viewer-123".into(),
            tts_mode: "off".into(),
        })
        .await
        .unwrap_err();

    match err {
        ApiError::Rejected { status, detail } => {
            assert_eq!(status, 503);
            assert_eq!(detail, "Conversation offline");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_status_words_read_as_offline() {
    let app = Router::new().route(
        "/services/status",
        get(|| async {
            r#"{
                "gateway": {"status": "online"},
                "conversation": {"status": "degraded?"},
                "stt": {}
            }"#
        }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = GatewayClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let statuses = client.service_statuses().await.unwrap();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses["gateway"], ServiceStatus::Online);
    assert_eq!(statuses["conversation"], ServiceStatus::Offline);
    assert_eq!(statuses["stt"], ServiceStatus::Offline);
}

#[tokio::test]
async fn service_control_rejection_carries_the_detail() {
    let app = Router::new().route(
        "/api/services/tts-casiopy/restart",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                r#"{"detail": "Service 'tts-casiopy' is not manageable"}"#,
            )
        }),
    );
    let (addr, _server) = start_api_server(app).await;

    let client = MonitoringClient::new(reqwest::Client::new(), format!("http://{addr}"));
    let err = client
        .control_service("tts-casiopy", ServiceAction::Restart)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Rejected);
    assert_eq!(err.detail(), "Service 'tts-casiopy' is not manageable");
}

#[tokio::test]
async fn docker_remove_sends_the_confirmation_flag() {
    let app = Router::new()
        .route(
            "/api/docker/remove",
            post(|uri: Uri| async move {
                if uri.query() == Some("confirm=true") {
                    (StatusCode::OK, r#"{"ok": true}"#)
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        r#"{"detail": "Container removal requires confirmation"}"#,
                    )
                }
            }),
        )
        .route("/api/docker/stop", post(|| async { r#"{"ok": true}"# }));
    let (addr, _server) = start_api_server(app).await;

    let client = MonitoringClient::new(reqwest::Client::new(), format!("http://{addr}"));
    client.docker_control(DockerAction::Remove).await.unwrap();
    client.docker_control(DockerAction::Stop).await.unwrap();
}

#[tokio::test]
async fn monitor_snapshot_endpoints_decode() {
    let app = Router::new()
        .route(
            "/api/services/status",
            get(|| async {
                r#"{
                    "gateway": {"name": "Gateway", "status": "online", "port": 8800,
                                "response_time_ms": 12.5, "manageable": true},
                    "tts-fish": {"name": "Fish TTS", "status": "offline", "port": 8990,
                                 "response_time_ms": null, "manageable": true, "managed_by": "docker"}
                }"#
            }),
        )
        .route(
            "/api/monitoring/metrics",
            get(|| async { r#"{"ok": true, "metrics": {"gateway": {"uptime_percentage": 99.5}}}"# }),
        )
        .route(
            "/api/logs/service/gateway",
            get(|| async {
                r#"{"ok": true, "logs": [
                    {"timestamp": "2025-11-02T10:00:00", "action": "start_gateway", "success": true, "duration_ms": 812.0, "final_status": "online"},
                    {"timestamp": "2025-11-02T09:00:00", "event_type": "health_check", "success": false, "error": "timeout"}
                ]}"#
            }),
        );
    let (addr, _server) = start_api_server(app).await;

    let client = MonitoringClient::new(reqwest::Client::new(), format!("http://{addr}"));

    let services = client.service_statuses().await.unwrap();
    assert!(services["gateway"].is_online());
    assert_eq!(services["gateway"].port, Some(8800));

    let metrics = client.metrics().await.unwrap();
    assert_eq!(metrics["gateway"].uptime_percentage, 99.5);

    let logs = client.service_log("gateway", 50).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_label(), "start_gateway");
    assert_eq!(logs[1].action_label(), "health_check");
}

#[tokio::test]
async fn telemetry_endpoints_decode() {
    let app = Router::new()
        .route(
            "/api/vram/status",
            get(|| async {
                r#"{"gpu": {"memory_percent": 41.3, "memory_used_mb": 9912.0,
                            "memory_total_mb": 24000.0, "gpu_utilization_percent": 35.0,
                            "temperature_celsius": 61.0},
                    "guard": {"warn_pct": 80, "critical_pct": 90, "recovery_pct": 70,
                              "paused_services": ["tts-casiopy"]}}"#
            }),
        )
        .route(
            "/api/docker/status",
            get(|| async { r#"{"ok": true, "container": "fish-speech-ngc", "running": true, "exists": true}"# }),
        )
        .route(
            "/api/docker/stats",
            get(|| async {
                r#"{"ok": true, "stats": {"cpu_percent": "12.5%", "memory_usage": "3.2GiB / 24GiB"}}"#
            }),
        );
    let (addr, _server) = start_api_server(app).await;

    let client = MonitoringClient::new(reqwest::Client::new(), format!("http://{addr}"));

    let report = client.vram_status().await.unwrap();
    let gpu = report.gpu.unwrap();
    assert_eq!(gpu.memory_pct(), Some(41.3));
    let guard = report.guard.unwrap();
    assert_eq!(guard.paused_services, vec!["tts-casiopy".to_string()]);

    let status = client.docker_status().await.unwrap();
    assert!(status.running);

    let stats = client.docker_stats().await.unwrap();
    assert_eq!(stats.cpu_percent.as_deref(), Some("12.5%"));
    assert_eq!(stats.memory_usage.as_deref(), Some("3.2GiB / 24GiB"));
}
