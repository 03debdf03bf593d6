//! Service-monitoring console: dashboard stream, telemetry panels and
//! lifecycle controls.

mod events;
mod kernel;
mod reducer;
mod state;

pub use events::MonitorEvent;
pub use kernel::{MonitorKernel, MonitorStore, Signal};
pub use reducer::reduce;
pub use state::MonitorState;
