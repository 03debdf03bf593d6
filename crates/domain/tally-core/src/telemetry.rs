use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    #[default]
    Ok,
    Warn,
    Critical,
}

impl PressureLevel {
    pub fn from_pct(pct: f64, thresholds: VramThresholds) -> Self {
        if pct >= thresholds.critical_pct {
            Self::Critical
        } else if pct >= thresholds.warn_pct {
            Self::Warn
        } else {
            Self::Ok
        }
    }
}

impl fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// VRAM pressure thresholds in percent of total memory. The recovery bound
/// is informational here; the guard service uses it to decide when paused
/// services may come back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VramThresholds {
    pub warn_pct: f64,
    pub critical_pct: f64,
    pub recovery_pct: f64,
}

/// One GPU sample. All fields optional: a host without `nvidia-smi` reports
/// an error string and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GpuSample {
    pub memory_percent: Option<f64>,
    pub memory_used_mb: Option<f64>,
    pub memory_total_mb: Option<f64>,
    pub gpu_utilization_percent: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub error: Option<String>,
}

impl GpuSample {
    /// A sample is readable when the GPU reported memory use and no error.
    pub fn memory_pct(&self) -> Option<f64> {
        if self.error.is_some() {
            return None;
        }
        self.memory_percent
    }
}

/// Guard-side status attached to a VRAM report: active thresholds plus the
/// services the guard paused to relieve pressure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuardStatus {
    pub warn_pct: Option<f64>,
    pub critical_pct: Option<f64>,
    pub recovery_pct: Option<f64>,
    pub paused_services: Vec<String>,
}

impl GuardStatus {
    /// Thresholds for this report, falling back to `defaults` per field.
    pub fn thresholds(&self, defaults: VramThresholds) -> VramThresholds {
        VramThresholds {
            warn_pct: self.warn_pct.unwrap_or(defaults.warn_pct),
            critical_pct: self.critical_pct.unwrap_or(defaults.critical_pct),
            recovery_pct: self.recovery_pct.unwrap_or(defaults.recovery_pct),
        }
    }
}

/// Response of the VRAM status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VramReport {
    pub gpu: Option<GpuSample>,
    pub guard: Option<GuardStatus>,
}

/// Container runtime state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DockerStatus {
    pub running: bool,
}

/// Container resource usage. The runtime reports preformatted strings
/// (`"12.34%"`, `"1.2GiB / 15.5GiB"`), passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DockerStats {
    pub cpu_percent: Option<String>,
    pub memory_usage: Option<String>,
    pub error: Option<String>,
}
