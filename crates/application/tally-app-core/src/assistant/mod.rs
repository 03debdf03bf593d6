//! Voice-assistant console: startup sequence, chat, the gateway event
//! stream and the VRAM guard badge.

mod events;
mod kernel;
mod reducer;
mod state;

pub use events::AssistantEvent;
pub use kernel::{AssistantKernel, AssistantStore, Signal};
pub use reducer::reduce;
pub use state::{AssistantState, BootPhase, ChatLine, Speaker, VramView};
