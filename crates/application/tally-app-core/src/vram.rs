use tally_config::{VRAM_CRITICAL_PCT, VRAM_RECOVERY_PCT, VRAM_WARN_PCT};
use tally_core::notify::Notice;
use tally_core::telemetry::{GpuSample, PressureLevel, VramReport, VramThresholds};

/// Thresholds in effect until the guard service reports its own.
pub const DEFAULT_THRESHOLDS: VramThresholds = VramThresholds {
    warn_pct: VRAM_WARN_PCT,
    critical_pct: VRAM_CRITICAL_PCT,
    recovery_pct: VRAM_RECOVERY_PCT,
};

/// Watches GPU memory pressure across polls and raises one notice per
/// transition: services newly paused by the guard, the paused set clearing,
/// or the pressure level moving.
///
/// An unreadable sample (no GPU, driver error) yields no update and leaves
/// the remembered level and paused set exactly as they were, so transitions
/// are always judged against the last readable report.
#[derive(Debug, Clone)]
pub struct VramGuard {
    level: PressureLevel,
    paused: Vec<String>,
}

/// Everything one readable report yields: figures for display plus at most
/// one transition notice.
#[derive(Debug, Clone, PartialEq)]
pub struct VramUpdate {
    pub gpu: GpuSample,
    pub level: PressureLevel,
    pub thresholds: VramThresholds,
    pub paused: Vec<String>,
    /// Services that joined the paused set with this report.
    pub newly_paused: Vec<String>,
    pub notice: Option<Notice>,
}

impl VramGuard {
    pub fn new() -> Self {
        Self {
            level: PressureLevel::Ok,
            paused: Vec::new(),
        }
    }

    pub fn level(&self) -> PressureLevel {
        self.level
    }

    /// Feeds one report through the guard. `None` when the sample is
    /// unreadable.
    pub fn observe(&mut self, report: &VramReport) -> Option<VramUpdate> {
        let gpu = report.gpu.clone()?;
        let pct = gpu.memory_pct()?;

        let guard = report.guard.clone().unwrap_or_default();
        let thresholds = guard.thresholds(DEFAULT_THRESHOLDS);
        let level = PressureLevel::from_pct(pct, thresholds);
        let paused = guard.paused_services;

        let newly_paused: Vec<String> = paused
            .iter()
            .filter(|id| !self.paused.contains(id))
            .cloned()
            .collect();

        // Pause churn outranks a level change; one notice per report.
        let notice = if !newly_paused.is_empty() {
            Some(Notice::error(format!(
                "VRAM {pct:.0}%: paused {}",
                newly_paused.join(", ")
            )))
        } else if !self.paused.is_empty() && paused.is_empty() {
            Some(Notice::success(format!(
                "VRAM {pct:.0}%: pressure relieved. Restart paused services if needed."
            )))
        } else if level != self.level {
            Some(match level {
                PressureLevel::Critical => Notice::error(format!(
                    "VRAM at {pct:.0}%: pausing non-critical services"
                )),
                PressureLevel::Warn => Notice::warning(format!(
                    "VRAM at {pct:.0}%: GPU memory pressure is high"
                )),
                PressureLevel::Ok => Notice::success(format!(
                    "VRAM at {pct:.0}%: pressure back to normal"
                )),
            })
        } else {
            None
        };

        self.level = level;
        self.paused = paused.clone();

        Some(VramUpdate {
            gpu,
            level,
            thresholds,
            paused,
            newly_paused,
            notice,
        })
    }
}

impl Default for VramGuard {
    fn default() -> Self {
        Self::new()
    }
}
