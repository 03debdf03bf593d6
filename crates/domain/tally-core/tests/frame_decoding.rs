use tally_core::entry::EntryPatch;
use tally_core::health::DashboardSnapshot;
use tally_core::service::ServiceActionDelta;
use tally_core::{Frame, Subscribe};

#[test]
fn test_parse_rejects_malformed_text() {
    assert!(Frame::parse("not json at all").is_none());
    assert!(Frame::parse("{\"no_type\": 1}").is_none());
    assert!(Frame::parse("{\"type\": 42}").is_none(), "type must be a string");
    assert!(Frame::parse("[1, 2, 3]").is_none());
}

#[test]
fn test_data_envelope_decoding() {
    let frame = Frame::parse(
        r#"{"type": "service-status", "data": {"id": "tts-blips", "action": "started"}}"#,
    )
    .unwrap();

    assert_eq!(frame.kind, "service-status");
    let delta: ServiceActionDelta = frame.data().unwrap();
    assert_eq!(delta.id, "tts-blips");
    assert_eq!(delta.action, "started");
}

#[test]
fn test_data_decoding_fails_without_required_fields() {
    // No id: the delta is unusable and the frame gets dropped.
    let frame = Frame::parse(r#"{"type": "service-status", "data": {"action": "started"}}"#).unwrap();
    assert!(frame.data::<ServiceActionDelta>().is_none());

    // Missing data key entirely.
    let frame = Frame::parse(r#"{"type": "entry_update"}"#).unwrap();
    assert!(frame.data::<EntryPatch>().is_none());
}

#[test]
fn test_flat_body_decoding() {
    let frame = Frame::parse(
        r#"{
            "type": "update",
            "health": {"health_status": "healthy", "online": 3, "total_services": 5,
                       "overall_uptime_percentage": 99.2, "unresolved_alerts": 0},
            "services": {"tts": {"name": "TTS", "status": "online", "port": 8080,
                                 "response_time_ms": 12.5, "manageable": true}},
            "metrics": {"tts": {"uptime_percentage": 99.9}}
        }"#,
    )
    .unwrap();

    let body: DashboardSnapshot = frame.body().unwrap();
    let health = body.health.unwrap();
    assert_eq!(health.health_status, "healthy");
    assert_eq!(health.online, 3);

    let services = body.services.unwrap();
    assert!(services["tts"].is_online());
    assert_eq!(services["tts"].response_time_ms, Some(12.5));
    assert_eq!(body.metrics.unwrap()["tts"].uptime_percentage, 99.9);
}

#[test]
fn test_flat_body_sections_default_to_absent() {
    let frame = Frame::parse(r#"{"type": "update"}"#).unwrap();
    let body: DashboardSnapshot = frame.body().unwrap();
    assert!(body.health.is_none());
    assert!(body.services.is_none());
    assert!(body.metrics.is_none());
}

#[test]
fn test_unknown_payload_fields_are_ignored() {
    let frame = Frame::parse(
        r#"{"type": "service-status", "data": {"id": "stt", "action": "stopped", "extra": [1]}}"#,
    )
    .unwrap();
    assert!(frame.data::<ServiceActionDelta>().is_some());
}

#[test]
fn test_subscribe_wire_shape() {
    let subscribe = Subscribe::new(["utterance", "emotion", "service-status"]);
    let text = serde_json::to_string(&subscribe).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value["type"], "subscribe");
    assert_eq!(value["topics"][2], "service-status");
}
