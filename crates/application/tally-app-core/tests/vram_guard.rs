use tally_app_core::vram::VramGuard;
use tally_core::notify::Severity;
use tally_core::telemetry::{GpuSample, GuardStatus, PressureLevel, VramReport};

fn report(pct: f64, paused: &[&str]) -> VramReport {
    VramReport {
        gpu: Some(GpuSample {
            memory_percent: Some(pct),
            ..GpuSample::default()
        }),
        guard: Some(GuardStatus {
            paused_services: paused.iter().map(|s| s.to_string()).collect(),
            ..GuardStatus::default()
        }),
    }
}

#[test]
fn level_changes_notify_once_per_transition() {
    let mut guard = VramGuard::new();
    let readings = [50.0, 50.0, 85.0, 85.0, 95.0, 50.0];

    let notices: Vec<_> = readings
        .iter()
        .filter_map(|&pct| guard.observe(&report(pct, &[])).unwrap().notice)
        .collect();

    assert_eq!(notices.len(), 3);
    assert_eq!(notices[0].severity, Severity::Warning);
    assert_eq!(notices[1].severity, Severity::Error);
    assert_eq!(notices[2].severity, Severity::Success);
    assert!(notices[2].text.contains("back to normal"));
}

#[test]
fn pause_churn_outranks_a_level_change() {
    let mut guard = VramGuard::new();

    let update = guard.observe(&report(95.0, &["tts-casiopy"])).unwrap();
    assert_eq!(update.level, PressureLevel::Critical);
    assert_eq!(update.newly_paused, vec!["tts-casiopy".to_owned()]);
    let notice = update.notice.unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.text.contains("paused tts-casiopy"));

    // Same report again: level and paused set already known, no notice.
    let update = guard.observe(&report(95.0, &["tts-casiopy"])).unwrap();
    assert!(update.notice.is_none());
}

#[test]
fn newly_paused_lists_only_the_additions() {
    let mut guard = VramGuard::new();
    guard.observe(&report(92.0, &["tts-casiopy"])).unwrap();

    let update = guard.observe(&report(93.0, &["tts-casiopy", "stt"])).unwrap();
    assert_eq!(update.newly_paused, vec!["stt".to_owned()]);
    let notice = update.notice.unwrap();
    assert!(notice.text.contains("stt"));
    assert!(!notice.text.contains("tts-casiopy"));
}

#[test]
fn a_clearing_paused_set_notifies_success() {
    let mut guard = VramGuard::new();
    guard.observe(&report(95.0, &["tts-casiopy", "stt"])).unwrap();

    let update = guard.observe(&report(60.0, &[])).unwrap();
    assert_eq!(update.level, PressureLevel::Ok);
    let notice = update.notice.unwrap();
    assert_eq!(notice.severity, Severity::Success);
    assert!(notice.text.contains("relieved"));

    // Settled: nothing further to say.
    assert!(guard.observe(&report(60.0, &[])).unwrap().notice.is_none());
}

#[test]
fn unreadable_samples_leave_the_guard_untouched() {
    let mut guard = VramGuard::new();
    guard.observe(&report(85.0, &["stt"])).unwrap();

    let broken = VramReport {
        gpu: Some(GpuSample {
            memory_percent: Some(10.0),
            error: Some("nvidia-smi not found".to_owned()),
            ..GpuSample::default()
        }),
        guard: Some(GuardStatus::default()),
    };
    assert!(guard.observe(&broken).is_none());
    assert!(guard.observe(&VramReport::default()).is_none());

    // The remembered level and paused set survived the broken samples, so
    // an identical readable report is not a transition.
    let update = guard.observe(&report(85.0, &["stt"])).unwrap();
    assert!(update.notice.is_none());
}

#[test]
fn reported_thresholds_override_the_defaults() {
    let mut guard = VramGuard::new();
    let mut rep = report(60.0, &[]);
    rep.guard = Some(GuardStatus {
        warn_pct: Some(50.0),
        critical_pct: Some(75.0),
        ..GuardStatus::default()
    });

    let update = guard.observe(&rep).unwrap();
    assert_eq!(update.level, PressureLevel::Warn);
    assert_eq!(update.thresholds.warn_pct, 50.0);
    assert_eq!(update.thresholds.critical_pct, 75.0);
    // Unreported bounds keep their defaults.
    assert_eq!(update.thresholds.recovery_pct, 70.0);
}
