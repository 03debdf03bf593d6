//! Delta printers for the watch commands. Each view remembers what it last
//! showed and prints only what changed, so a long-running watch reads like a
//! log tail instead of a repainted screen.

use std::time::Instant;

use chrono::Local;

use tally_app_core::assistant::AssistantState;
use tally_app_core::dataset::DatasetState;
use tally_app_core::monitor::MonitorState;
use tally_app_core::notify::NoticeSlot;
use tally_app_core::viewmodel::{
    backend_line, chat_lines, conn_label, docker_line, gpu_line, health_line, notice_line,
    page_line, response_sparkline, run_actions, run_line, vram_badge,
};
use tally_net::ConnState;

fn emit(line: &str) {
    println!("[{}] {line}", Local::now().format("%H:%M:%S"));
}

/// Prints the notice when a new one shows; expiry resets the memory so a
/// repeat of the same text later prints again.
fn notice_delta(last: &mut Option<String>, slot: &NoticeSlot) {
    let current = slot.visible(Instant::now()).map(notice_line);
    if let Some(text) = &current {
        if last.as_ref() != Some(text) {
            emit(text);
        }
    }
    *last = current;
}

fn conn_delta(last: &mut Option<ConnState>, conn: ConnState) {
    if *last != Some(conn) {
        *last = Some(conn);
        emit(&format!("stream {}", conn_label(conn)));
    }
}

fn line_delta(last: &mut String, line: String) {
    if *last != line {
        emit(&line);
        *last = line;
    }
}

#[derive(Default)]
pub struct AssistantView {
    conn: Option<ConnState>,
    status_line: String,
    chat_seen: usize,
    badge: String,
    notice: Option<String>,
}

impl AssistantView {
    pub fn observe(&mut self, state: &AssistantState) {
        conn_delta(&mut self.conn, state.conn);
        line_delta(&mut self.status_line, state.status_line.clone());
        for line in chat_lines(state).iter().skip(self.chat_seen) {
            let audio = if line.has_audio { "  [audio]" } else { "" };
            emit(&format!("{}: {}{audio}", line.prefix, line.text));
        }
        self.chat_seen = state.chat.len();
        line_delta(&mut self.badge, vram_badge(state));
        notice_delta(&mut self.notice, &state.notices);
    }
}

#[derive(Default)]
pub struct MonitorView {
    conn: Option<ConnState>,
    health: String,
    snapshot: String,
    docker: String,
    gpu: String,
    notice: Option<String>,
}

impl MonitorView {
    pub fn observe(&mut self, state: &MonitorState) {
        conn_delta(&mut self.conn, state.conn);
        line_delta(&mut self.health, health_line(&state.health));
        // The sparkline shifts on every snapshot, so this doubles as a
        // heartbeat line while the stream is live.
        if !state.services.is_empty() {
            let online = state.services.values().filter(|s| s.is_online()).count();
            line_delta(
                &mut self.snapshot,
                format!(
                    "{online} of {} services online  {}",
                    state.services.len(),
                    response_sparkline(state)
                ),
            );
        }
        line_delta(&mut self.docker, docker_line(state));
        line_delta(&mut self.gpu, gpu_line(state));
        notice_delta(&mut self.notice, &state.notices);
    }
}

#[derive(Default)]
pub struct DatasetView {
    conn: Option<ConnState>,
    run: String,
    actions: String,
    backends: String,
    page: String,
    last_feed: Option<(String, String)>,
    hint: Option<String>,
    notice: Option<String>,
}

/// One line naming the run controls that currently apply.
fn controls_line(state: &DatasetState) -> String {
    let a = run_actions(state);
    let names: Vec<&str> = [
        ("start", a.start),
        ("pause", a.pause),
        ("resume", a.resume),
        ("stop", a.stop),
        ("priority-check", a.priority_check),
        ("reset", a.reset),
    ]
    .iter()
    .filter(|(_, on)| *on)
    .map(|(name, _)| *name)
    .collect();
    if names.is_empty() {
        "controls: (settling)".to_owned()
    } else {
        format!("controls: {}", names.join(" "))
    }
}

impl DatasetView {
    pub fn observe(&mut self, state: &DatasetState) {
        conn_delta(&mut self.conn, state.conn);
        line_delta(&mut self.run, run_line(state));
        line_delta(&mut self.actions, controls_line(state));
        line_delta(&mut self.backends, backend_line(state));
        line_delta(&mut self.page, page_line(state));
        // Feed lines arrive one per event, so tracking the newest one is
        // enough to tail the whole feed.
        if let Some(line) = state.feed.back() {
            let key = (line.level.clone(), line.message.clone());
            if self.last_feed.as_ref() != Some(&key) {
                emit(&format!("{}: {}", line.level, line.message));
                self.last_feed = Some(key);
            }
        }
        let hint = state.hint.visible(Instant::now()).map(|h| h.text.clone());
        if let Some(text) = &hint {
            if self.hint.as_ref() != Some(text) {
                emit(text);
            }
        }
        self.hint = hint;
        notice_delta(&mut self.notice, &state.notices);
    }
}
