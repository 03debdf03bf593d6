use std::time::{Duration, Instant};

use tally_config::NOTICE_TTL;
use tally_core::notify::Notice;

/// Single-slot notification display. A new notice replaces whatever is
/// showing; nothing queues. Expiry compares against a caller-supplied
/// instant, which keeps reducers clock-free and tests deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoticeSlot {
    shown: Option<(Notice, Instant)>,
}

impl NoticeSlot {
    /// Shows `notice` from `now` until the standard TTL runs out.
    pub fn show(&mut self, notice: Notice, now: Instant) {
        self.shown = Some((notice, now + NOTICE_TTL));
    }

    /// The notice on screen at `now`, if it has not expired.
    pub fn visible(&self, now: Instant) -> Option<&Notice> {
        match &self.shown {
            Some((notice, until)) if now < *until => Some(notice),
            _ => None,
        }
    }
}

/// Pointer to activity the current view does not show, e.g. an entry that
/// finished on another page.
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub text: String,
    /// Zero-based page the reader can jump to, when the hint targets one.
    pub page: Option<u64>,
}

/// Single-slot hint display with a per-hint lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HintSlot {
    shown: Option<(Hint, Instant)>,
}

impl HintSlot {
    pub fn show(&mut self, hint: Hint, ttl: Duration, now: Instant) {
        self.shown = Some((hint, now + ttl));
    }

    pub fn visible(&self, now: Instant) -> Option<&Hint> {
        match &self.shown {
            Some((hint, until)) if now < *until => Some(hint),
            _ => None,
        }
    }
}
