//! Application layer for the three operator consoles. Each console owns a
//! state store fed by a single event funnel; kernels turn stream frames,
//! poll results and user requests into events, reducers fold them into
//! state, and the viewmodel projects state for display.

pub mod assistant;
pub mod dataset;
pub mod monitor;
pub mod notify;
pub mod store;
pub mod viewmodel;
pub mod vram;

pub use assistant::{AssistantKernel, AssistantState};
pub use dataset::{DatasetKernel, DatasetState};
pub use monitor::{MonitorKernel, MonitorState};
pub use notify::{Hint, HintSlot, NoticeSlot};
pub use store::Store;
pub use viewmodel::*;
pub use vram::{VramGuard, VramUpdate, DEFAULT_THRESHOLDS};
