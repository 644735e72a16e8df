//! Debounced auto-rerank timer.
//!
//! Each transform change bumps a generation counter. A pending rerank only
//! fires if no newer change happened since it was armed and the mode and
//! manual-sort state still allow it at fire time.

use super::mode::Mode;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRerank {
    pub due: Instant,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct AutoRerankScheduler {
    delay: Duration,
    generation: u64,
    pending: Option<PendingRerank>,
    manual_sort: bool,
    resume_after_manual_sort: bool,
}

impl AutoRerankScheduler {
    pub fn new(delay: Duration, resume_after_manual_sort: bool) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
            manual_sort: false,
            resume_after_manual_sort,
        }
    }

    pub fn pending(&self) -> Option<PendingRerank> {
        self.pending
    }

    pub fn manual_sort(&self) -> bool {
        self.manual_sort
    }

    fn suppressed(&self, mode: Mode) -> bool {
        mode != Mode::Normal || self.manual_sort
    }

    /// Called after a user transform change. Cancels any pending rerank and,
    /// when allowed, schedules a new one. Returns whether a rerank is pending.
    pub fn arm(&mut self, now: Instant, mode: Mode) -> bool {
        self.generation += 1;
        self.pending = None;
        if self.manual_sort && self.resume_after_manual_sort {
            self.manual_sort = false;
        }
        if self.suppressed(mode) {
            return false;
        }
        self.pending = Some(PendingRerank {
            due: now + self.delay,
            generation: self.generation,
        });
        true
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Latch manual sort and drop anything pending.
    pub fn note_manual_sort(&mut self) {
        self.manual_sort = true;
        self.cancel();
    }

    /// Returns true exactly once when a still-valid pending rerank is due.
    pub fn poll(&mut self, now: Instant, mode: Mode) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if now < pending.due {
            return false;
        }
        self.pending = None;
        pending.generation == self.generation && !self.suppressed(mode)
    }
}
