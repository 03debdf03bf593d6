use tally_core::notify::Notice;
use tally_core::service::{ServiceStatus, REGISTRY};

use super::events::AssistantEvent;
use super::state::{AssistantState, BootPhase, ChatLine};

fn label_for(id: &str) -> &str {
    REGISTRY
        .iter()
        .find(|spec| spec.id == id)
        .map(|spec| spec.label)
        .unwrap_or(id)
}

pub fn reduce(mut state: AssistantState, ev: AssistantEvent) -> AssistantState {
    match ev {
        AssistantEvent::StatusesLoaded { statuses } => {
            state.services.apply_snapshot(&statuses);
            if state.phase == BootPhase::Probing {
                state.phase = BootPhase::Standby;
            }
            state.status_line = format!(
                "{} of {} services online",
                state.services.online_count(),
                state.services.len()
            );
        }

        AssistantEvent::ProbeFailed { detail } => {
            if state.phase == BootPhase::Probing {
                state.phase = BootPhase::Standby;
            }
            state.status_line = format!("Gateway unreachable: {detail}");
        }

        AssistantEvent::SequenceStarted => {
            state.phase = BootPhase::Starting;
            state.status_line = "Starting services".to_owned();
        }

        AssistantEvent::ServiceStarting { id } => {
            state.status_line = format!("Starting {}", label_for(&id));
            state.services.set_status(&id, ServiceStatus::Starting);
        }

        AssistantEvent::ServiceStarted { id } => {
            // Optimistic: the start was accepted, status frames correct it
            // later if the process dies.
            state.services.set_status(&id, ServiceStatus::Online);
        }

        AssistantEvent::ServiceFailed {
            id,
            critical,
            detail,
            at,
        } => {
            let label = label_for(&id).to_owned();
            if critical {
                state.services.set_status(&id, ServiceStatus::Error);
                state.phase = BootPhase::Failed;
                state.status_line = format!("{label} failed to start");
                state
                    .notices
                    .show(Notice::error(format!("{label} failed: {detail}")), at);
            } else {
                // The sequence carries on; the member is degraded, not dead.
                state.services.set_status(&id, ServiceStatus::Warning);
                state
                    .notices
                    .show(Notice::warning(format!("{label} failed: {detail}")), at);
            }
        }

        AssistantEvent::SequenceFinished => {
            if state.phase == BootPhase::Starting {
                state.phase = BootPhase::Ready;
                state.status_line = format!(
                    "Ready, {} of {} services online",
                    state.services.online_count(),
                    state.services.len()
                );
            }
        }

        AssistantEvent::Conn(conn) => state.conn = conn,

        AssistantEvent::EmotionChanged { emotion } => {
            state.emotion = Some(emotion);
        }

        AssistantEvent::ServiceDelta(delta) => {
            // Identifiers outside the registry are dropped.
            state
                .services
                .set_status(&delta.id, ServiceStatus::from_action(&delta.action));
        }

        AssistantEvent::MessageSent { text } => {
            state.chat.push(ChatLine::user(text));
            state.sending = true;
            state.draft = None;
        }

        AssistantEvent::ReplyReceived(reply) => {
            state.sending = false;
            if reply.emotion.is_some() {
                state.emotion = reply.emotion.clone();
            }
            let mut line = ChatLine::assistant(reply.reply, reply.emotion);
            line.audio_b64 = reply.audio_b64;
            state.chat.push(line);
        }

        AssistantEvent::ChatRejected { detail, at } => {
            state.sending = false;
            state
                .chat
                .push(ChatLine::assistant(format!("[Error: {detail}]"), None));
            state.notices.show(Notice::error(detail), at);
        }

        AssistantEvent::GatewayUnreachable { at } => {
            state.sending = false;
            state.chat.push(ChatLine::assistant(
                "[Error: could not reach the gateway]",
                None,
            ));
            state.notices.show(Notice::error("Gateway unreachable"), at);
        }

        AssistantEvent::TranscriptReady { text } => {
            state.draft = Some(text);
        }

        AssistantEvent::TranscriptFailed { detail, at } => {
            state
                .notices
                .show(Notice::error(format!("Transcription failed: {detail}")), at);
        }

        AssistantEvent::SttUnavailable { at } => {
            state.notices.show(Notice::warning("STT unavailable"), at);
        }

        AssistantEvent::VramObserved { update, at } => {
            for id in &update.newly_paused {
                state.services.set_status(id, ServiceStatus::Offline);
            }
            if let Some(notice) = update.notice {
                state.notices.show(notice, at);
            }
            state.vram.gpu = Some(update.gpu);
            state.vram.level = update.level;
            state.vram.thresholds = update.thresholds;
            state.vram.paused = update.paused;
        }

        AssistantEvent::VramUnreadable => {
            state.vram.gpu = None;
        }
    }
    state
}
