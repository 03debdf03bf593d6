//! Dataset-generation console: run controls, the reconciling entry table,
//! backend health and the live feed.

mod events;
mod kernel;
mod reducer;
mod state;

pub use events::DatasetEvent;
pub use kernel::{DatasetKernel, DatasetStore, Signal};
pub use reducer::reduce;
pub use state::DatasetState;
