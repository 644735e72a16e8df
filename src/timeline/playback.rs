//! Theater playback: proportional step timing, autoplay and the strip view.

use super::render::{lane_layout, marker_radius, BandScale};
use super::scale::TimeScale;
use super::types::{Rating, Record, RecordId, RecordStore};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackEntry {
    pub id: RecordId,
    pub timestamp: i64,
}

impl PlaybackEntry {
    pub fn from_records(records: &[&Record]) -> Vec<Self> {
        records
            .iter()
            .map(|r| PlaybackEntry {
                id: r.id,
                timestamp: r.timestamp,
            })
            .collect()
    }
}

/// Maps real inter-record gaps onto a wall-clock target duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    pub target: Duration,
    pub min_step: Duration,
    pub final_hold: Duration,
}

impl StepTiming {
    /// Delay after showing `index`. The rate is fixed by the whole session's
    /// real span, so resuming mid-way keeps the remaining steps proportional.
    pub fn delay_after(&self, entries: &[PlaybackEntry], index: usize) -> Duration {
        let (Some(cur), Some(next)) = (entries.get(index), entries.get(index + 1)) else {
            return self.final_hold;
        };
        let total_span = match (entries.first(), entries.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp) as f64,
            _ => 0.0,
        };
        if total_span <= 0.0 {
            return self.min_step;
        }
        let gap = (next.timestamp - cur.timestamp).max(0) as f64;
        let scaled_ms = gap * self.target.as_secs_f64() * 1000.0 / total_span;
        Duration::from_secs_f64(scaled_ms / 1000.0).max(self.min_step)
    }
}

/// Outcome of a theater tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Advanced(usize),
    Finished,
}

#[derive(Debug, Clone)]
pub struct TheaterSession {
    entries: Vec<PlaybackEntry>,
    index: usize,
    timing: StepTiming,
    next_due: Option<Instant>,
    /// Vertical scroll of the focused record's text
    text_scroll: f32,
    text_scroll_request: Option<f32>,
}

impl TheaterSession {
    /// `entries` must be sorted by timestamp. Returns None for an empty list.
    pub fn new(entries: Vec<PlaybackEntry>, start_index: usize, timing: StepTiming) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let index = start_index.min(entries.len() - 1);
        Some(Self {
            entries,
            index,
            timing,
            next_due: None,
            text_scroll: 0.0,
            text_scroll_request: Some(0.0),
        })
    }

    pub fn entries(&self) -> &[PlaybackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<PlaybackEntry> {
        self.entries.get(self.index).copied()
    }

    pub fn timing(&self) -> StepTiming {
        self.timing
    }

    pub fn is_playing(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Start (or resume) autoplay from the current index.
    pub fn play(&mut self, now: Instant) {
        self.next_due = Some(now + self.timing.delay_after(&self.entries, self.index));
    }

    pub fn pause(&mut self) {
        self.next_due = None;
    }

    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
        self.is_playing()
    }

    /// Manual ±1 step. Always stops autoplay. Returns true if the index moved.
    pub fn navigate(&mut self, delta: isize) -> bool {
        self.pause();
        let target = self.index as isize + delta;
        if target < 0 || target as usize >= self.entries.len() {
            return false;
        }
        self.index = target as usize;
        self.reset_text_scroll();
        true
    }

    pub fn text_scroll(&self) -> f32 {
        self.text_scroll
    }

    /// Keyboard scroll of the focused text, relative to where the view is now.
    pub fn scroll_text(&mut self, dy: f32) {
        self.text_scroll = (self.text_scroll + dy).max(0.0);
        self.text_scroll_request = Some(self.text_scroll);
    }

    /// Record the offset the view actually shows, e.g. after a mouse wheel.
    pub fn sync_text_scroll(&mut self, offset: f32) {
        self.text_scroll = offset.max(0.0);
    }

    /// Offset the view should jump to, if a key or record change asked for one.
    pub fn take_text_scroll_request(&mut self) -> Option<f32> {
        self.text_scroll_request.take()
    }

    fn reset_text_scroll(&mut self) {
        self.text_scroll = 0.0;
        self.text_scroll_request = Some(0.0);
    }

    /// Advance autoplay if a step is due. After the last record has been
    /// held for the final hold time, autoplay stops and the session stays open.
    pub fn tick(&mut self, now: Instant) -> Option<PlaybackEvent> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        if self.index + 1 < self.entries.len() {
            self.index += 1;
            self.reset_text_scroll();
            self.next_due = Some(now + self.timing.delay_after(&self.entries, self.index));
            Some(PlaybackEvent::Advanced(self.index))
        } else {
            self.next_due = None;
            Some(PlaybackEvent::Finished)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripMarker {
    pub id: RecordId,
    pub x: f64,
    pub y: f64,
    pub radius: f32,
    pub rating: Option<Rating>,
    pub current: bool,
}

/// Miniature timeline of a theater session.
#[derive(Debug, Clone)]
pub struct TheaterStrip {
    pub scale: TimeScale,
    pub lanes: BandScale,
    pub markers: Vec<StripMarker>,
}

/// Emphasis factor for the focused strip marker.
pub const CURRENT_MARKER_GROWTH: f32 = 1.5;

impl TheaterStrip {
    pub fn build(session: &TheaterSession, store: &RecordStore, width: f64, height: f64) -> Self {
        let records = store.sorted_by_time(session.entries().iter().map(|e| e.id));
        let (start, end) = match (records.first(), records.last()) {
            (Some(first), Some(last)) => (first.timestamp as f64, last.timestamp as f64),
            _ => (0.0, 0.0),
        };
        let scale = TimeScale::new(start, end, 0.0, width);

        let projects: BTreeSet<&str> = records.iter().map(|r| r.project_id()).collect();
        let (lanes, _) = lane_layout(projects.into_iter().map(String::from).collect(), height);

        let max_len = records.iter().map(|r| r.display_len()).max().unwrap_or(0);
        let current = session.current().map(|e| e.id);
        let markers = records
            .iter()
            .filter_map(|r| {
                let y = lanes.center(r.project_id())?;
                let base = marker_radius(r.display_len(), max_len);
                let is_current = Some(r.id) == current;
                Some(StripMarker {
                    id: r.id,
                    x: scale.project(r.timestamp as f64),
                    y,
                    radius: if is_current { base * CURRENT_MARKER_GROWTH } else { base },
                    rating: r.rating,
                    current: is_current,
                })
            })
            .collect();
        Self { scale, lanes, markers }
    }
}
