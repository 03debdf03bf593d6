use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawns a fixed-period fetch loop. The first fetch runs after
/// `first_delay` (pass `Duration::ZERO` to fetch immediately), then every
/// `period`. A fetch that outlives its period causes later ticks to be
/// skipped, never to stack: at most one fetch is in flight per loop.
/// Failures are logged and swallowed; the loop only ends through `cancel`.
pub fn spawn_poll<F, Fut, E>(
    name: &'static str,
    first_delay: Duration,
    period: Duration,
    cancel: CancellationToken,
    mut fetch: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Display,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + first_delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = fetch().await {
                        warn!("{name} poll failed: {err}");
                    }
                }
            }
        }
        debug!("{name} poll loop stopped");
    })
}
