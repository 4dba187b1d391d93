//! Wall-clock countdown bookkeeping.
//!
//! Remaining time is consumed only by [`TimeKeeper::flush`], which
//! subtracts the time since the last anchor and moves the anchor to `now`.
//! Because every flush reanchors, each instant of wall-clock time is
//! subtracted at most once, no matter how many ticks or recovery passes
//! observe it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeKeeper {
    remaining_ms: u64,
    /// Start of the current running period; `None` while frozen.
    #[serde(default)]
    anchor: Option<DateTime<Utc>>,
}

impl TimeKeeper {
    pub fn new(total_ms: u64) -> Self {
        Self {
            remaining_ms: total_ms,
            anchor: None,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Whole seconds left, rounded up: reaches 0 only once the interval is
    /// fully consumed.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Begin (or continue) counting from `now`.
    pub fn anchor_at(&mut self, now: DateTime<Utc>) {
        self.anchor = Some(now);
    }

    /// Consume the time since the anchor and reanchor. Returns the
    /// milliseconds that were consumed. A clock that went backwards
    /// consumes nothing.
    pub fn flush(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(anchor) = self.anchor else {
            return 0;
        };
        let elapsed = now
            .signed_duration_since(anchor)
            .num_milliseconds()
            .max(0) as u64;
        let consumed = elapsed.min(self.remaining_ms);
        self.remaining_ms -= consumed;
        self.anchor = Some(now);
        consumed
    }

    /// Flush and stop counting.
    pub fn freeze(&mut self, now: DateTime<Utc>) -> u64 {
        let consumed = self.flush(now);
        self.anchor = None;
        consumed
    }

    /// Time since the anchor without consuming it.
    pub fn pending_ms(&self, now: DateTime<Utc>) -> u64 {
        self.anchor
            .map(|a| now.signed_duration_since(a).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }
}
