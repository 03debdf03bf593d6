use tally_core::service::ServiceTable;
use tally_core::telemetry::{GpuSample, PressureLevel, VramThresholds};
use tally_net::ConnState;

use crate::notify::NoticeSlot;
use crate::vram::DEFAULT_THRESHOLDS;

/// Boot progression of the assistant console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootPhase {
    /// Initial status probe in flight.
    #[default]
    Probing,
    /// Probe settled; waiting for a start request.
    Standby,
    /// Startup sequence running.
    Starting,
    /// Startup sequence finished.
    Ready,
    /// A critical service failed to start; the rest of the sequence was
    /// abandoned.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the conversation transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
    /// Emotion tag the reply carried, if any.
    pub emotion: Option<String>,
    /// Base64 speech payload from the reply, carried opaquely for whoever
    /// renders the transcript.
    pub audio_b64: Option<String>,
}

impl ChatLine {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            emotion: None,
            audio_b64: None,
        }
    }

    pub fn assistant(text: impl Into<String>, emotion: Option<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            emotion,
            audio_b64: None,
        }
    }
}

/// GPU badge state. `gpu: None` renders as unavailable; level and paused
/// set carry over from the last readable report.
#[derive(Debug, Clone, PartialEq)]
pub struct VramView {
    pub gpu: Option<GpuSample>,
    pub level: PressureLevel,
    pub thresholds: VramThresholds,
    pub paused: Vec<String>,
}

impl Default for VramView {
    fn default() -> Self {
        Self {
            gpu: None,
            level: PressureLevel::Ok,
            thresholds: DEFAULT_THRESHOLDS,
            paused: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistantState {
    pub phase: BootPhase,
    /// One-line readout of the startup sequence.
    pub status_line: String,
    pub services: ServiceTable,
    pub conn: ConnState,
    pub chat: Vec<ChatLine>,
    /// A chat request is in flight.
    pub sending: bool,
    /// Latest transcription, waiting to be sent or edited.
    pub draft: Option<String>,
    /// Current avatar emotion, unset until the first report.
    pub emotion: Option<String>,
    pub vram: VramView,
    pub notices: NoticeSlot,
}

impl Default for AssistantState {
    fn default() -> Self {
        Self {
            phase: BootPhase::Probing,
            status_line: "Probing services".to_owned(),
            services: ServiceTable::new(),
            conn: ConnState::Connecting,
            chat: Vec::new(),
            sending: false,
            draft: None,
            emotion: None,
            vram: VramView::default(),
            notices: NoticeSlot::default(),
        }
    }
}

impl AssistantState {
    /// The chat surface works once the conversation service is up.
    pub fn chat_ready(&self) -> bool {
        self.services.core_ready()
    }
}
