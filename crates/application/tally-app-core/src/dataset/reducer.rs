use tally_config::{ENTRY_PAGE_SIZE, LOG_FEED_CAP, PAGE_HINT_TTL, PRIORITY_HINT_TTL};
use tally_core::entry::{page_for, EntryStatus, LogLine, RunStatus};
use tally_core::notify::Notice;

use crate::notify::Hint;

use super::events::DatasetEvent;
use super::state::DatasetState;

pub fn reduce(mut state: DatasetState, ev: DatasetEvent) -> DatasetState {
    match ev {
        DatasetEvent::Conn(conn) => state.conn = conn,

        DatasetEvent::StatusReported { snapshot } => {
            state.run = snapshot;
            // Whatever the report says beats the optimistic stop.
            state.stop_pending = false;
        }

        DatasetEvent::ProgressReported(delta) => {
            state.run.completed = delta.completed;
            state.run.failed = delta.failed;
            state.run.progress_percentage = delta.percentage;
        }

        DatasetEvent::Initialized { total_clips, at } => {
            state.run.total_clips = total_clips;
            state.notices.show(
                Notice::success(format!("Initialized {total_clips} clips")),
                at,
            );
        }

        DatasetEvent::StopRequested => state.stop_pending = true,

        DatasetEvent::StopAccepted { at } => {
            state.stop_pending = false;
            state.run.status = RunStatus::Stopped;
            state.notices.show(Notice::success("Generation stopped"), at);
        }

        DatasetEvent::StopRejected { detail, at } => {
            state.stop_pending = false;
            state
                .notices
                .show(Notice::error(format!("Error: {detail}")), at);
        }

        DatasetEvent::ControlRejected { action, detail, at } => {
            state
                .notices
                .show(Notice::error(format!("{action} failed: {detail}")), at);
        }

        DatasetEvent::PriorityCheckQueued { at } => {
            state.hint.show(
                Hint {
                    text: "Priority check queued; failed entries go first".to_owned(),
                    page: None,
                },
                PRIORITY_HINT_TTL,
                at,
            );
        }

        DatasetEvent::ResetDone {
            reset_count,
            from,
            at,
        } => {
            state.notices.show(
                Notice::success(format!("Reset {reset_count} entries from entry {from}")),
                at,
            );
        }

        DatasetEvent::EntryPatched { patch, at } => {
            state.entries.apply_patch(&patch);
            // Terminal updates landing off the visible page leave a hint
            // pointing at the page that has them.
            let label = match patch.status {
                Some(EntryStatus::Completed) => Some("completed"),
                Some(EntryStatus::Error) => Some("failed"),
                _ => None,
            };
            if let Some(label) = label {
                if !state.entries.is_visible(patch.id) {
                    let page = page_for(patch.id, ENTRY_PAGE_SIZE);
                    state.hint.show(
                        Hint {
                            text: format!("Entry {} {} (page {})", patch.id, label, page + 1),
                            page: Some(page),
                        },
                        PAGE_HINT_TTL,
                        at,
                    );
                }
            }
        }

        DatasetEvent::PageLoaded {
            page,
            filter,
            entries,
            total,
        } => {
            state.entries.apply_page(entries);
            state.page = page;
            state.filter = filter;
            state.total = total;
        }

        DatasetEvent::PageLoadFailed { detail, at } => {
            state
                .notices
                .show(Notice::error(format!("Could not load entries: {detail}")), at);
        }

        DatasetEvent::BackendsReported(health) => state.backends = health,

        DatasetEvent::LogAppended(line) => {
            state.feed.push_back(line);
            while state.feed.len() > LOG_FEED_CAP {
                state.feed.pop_front();
            }
        }

        DatasetEvent::StreamError { message, at } => {
            state.feed.push_back(LogLine {
                level: "error".to_owned(),
                message: message.clone(),
            });
            while state.feed.len() > LOG_FEED_CAP {
                state.feed.pop_front();
            }
            state.notices.show(Notice::error(message), at);
        }
    }
    state
}
