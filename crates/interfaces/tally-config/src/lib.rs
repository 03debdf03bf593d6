//! Central configuration constants: endpoints, intervals, thresholds.

use std::time::Duration;

/// Gateway REST base when endpoint discovery is unavailable.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8800";

/// Gateway WebSocket base when endpoint discovery is unavailable.
pub const DEFAULT_GATEWAY_WS: &str = "ws://127.0.0.1:8800";

/// Monitoring service base when endpoint discovery is unavailable.
pub const DEFAULT_MONITORING_URL: &str = "http://127.0.0.1:8900";

/// Dataset generation backend base. Not part of endpoint discovery; the
/// dataset server runs standalone.
pub const DEFAULT_DATASET_URL: &str = "http://127.0.0.1:8801";

/// Reconnect delay for the assistant stream. Retries forever.
pub const ASSISTANT_RECONNECT_DELAY: Duration = Duration::from_millis(4000);

/// Reconnect delay for the dataset stream. Retries forever.
pub const DATASET_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Reconnect delay for the monitoring stream.
pub const MONITOR_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Consecutive reconnect attempts the monitoring stream makes before giving
/// up until an explicit restart. Resets on every successful open.
pub const MONITOR_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Dataset run status poll period.
pub const DATASET_STATUS_POLL: Duration = Duration::from_secs(5);

/// Dataset backend health poll period.
pub const DATASET_SERVICES_POLL: Duration = Duration::from_secs(30);

/// Docker/GPU telemetry poll period on the monitoring console.
pub const TELEMETRY_POLL: Duration = Duration::from_secs(10);

/// VRAM guard poll period.
pub const VRAM_POLL: Duration = Duration::from_secs(30);

/// Delay before the first VRAM poll, giving services time to settle after
/// startup.
pub const VRAM_POLL_INITIAL_DELAY: Duration = Duration::from_secs(5);

/// How long a notification stays visible unless replaced.
pub const NOTICE_TTL: Duration = Duration::from_millis(3500);

/// How long an off-page entry hint stays visible.
pub const PAGE_HINT_TTL: Duration = Duration::from_secs(10);

/// How long the priority-check confirmation stays visible.
pub const PRIORITY_HINT_TTL: Duration = Duration::from_secs(8);

/// Pause between an acknowledged stop and the status refetch that settles
/// the optimistic display.
pub const STOP_REFRESH_DELAY: Duration = Duration::from_millis(500);

/// Entries per dataset listing page.
pub const ENTRY_PAGE_SIZE: u64 = 50;

/// Dataset log feed capacity; the oldest line falls off beyond this.
pub const LOG_FEED_CAP: usize = 500;

/// Response-time samples kept per monitored service.
pub const RESPONSE_HISTORY_CAP: usize = 10;

/// VRAM warn threshold (percent of total memory) when the guard does not
/// report its own.
pub const VRAM_WARN_PCT: f64 = 80.0;

/// VRAM critical threshold (percent) when the guard does not report its own.
pub const VRAM_CRITICAL_PCT: f64 = 90.0;

/// VRAM recovery threshold (percent) when the guard does not report its own.
pub const VRAM_RECOVERY_PCT: f64 = 70.0;

/// Workers requested when starting a dataset generation run.
pub const DATASET_PARALLEL_WORKERS: u32 = 2;

/// Generation backend requested when starting a dataset run.
pub const DATASET_BACKEND: &str = "http";
