//! Crawl mode: scroll-synchronised highlight over the selection and the
//! starfield backdrop.

use super::axis::local_time;
use super::playback::PlaybackEntry;
use chrono::FixedOffset;
use rand::Rng;
use std::time::{Duration, Instant};

/// How long centre observations are ignored after a programmatic scroll.
pub const SCROLL_GUARD: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingScroll {
    index: usize,
    until: Instant,
}

#[derive(Debug, Clone)]
pub struct CrawlSession {
    entries: Vec<PlaybackEntry>,
    current: usize,
    pending_scroll: Option<PendingScroll>,
    scroll_request: Option<usize>,
    last_offset: Option<f32>,
}

impl CrawlSession {
    /// `entries` must be sorted by timestamp. Returns None for an empty list.
    pub fn new(entries: Vec<PlaybackEntry>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        Some(Self {
            entries,
            current: 0,
            pending_scroll: None,
            scroll_request: None,
            last_offset: None,
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

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<PlaybackEntry> {
        self.entries.get(self.current).copied()
    }

    /// User-driven highlight (click or arrow key). Requests a scroll into view
    /// and guards against the scroll's own centre observations.
    pub fn highlight(&mut self, index: usize, now: Instant) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.current = index;
        self.pending_scroll = Some(PendingScroll {
            index,
            until: now + SCROLL_GUARD,
        });
        self.scroll_request = Some(index);
        true
    }

    pub fn navigate(&mut self, delta: isize, now: Instant) -> bool {
        let target = self.current as isize + delta;
        if target < 0 {
            return false;
        }
        self.highlight(target as usize, now)
    }

    /// The entry the view should bring to centre, if one was requested.
    pub fn take_scroll_request(&mut self) -> Option<usize> {
        self.scroll_request.take()
    }

    /// Report which entry sits at the viewport centre for scroll offset
    /// `offset`.
    ///
    /// Only a change of offset counts; the first report just records it.
    /// Ignored while a programmatic scroll is in flight; the guard lifts once
    /// the target reaches the centre or the guard time runs out.
    pub fn observe_center(&mut self, index: usize, offset: f32, now: Instant) -> bool {
        let previous = self.last_offset.replace(offset);
        match previous {
            Some(prev) if prev != offset => {}
            _ => return false,
        }
        if let Some(pending) = self.pending_scroll {
            if index == pending.index || now >= pending.until {
                self.pending_scroll = None;
            } else {
                return false;
            }
        }
        if index >= self.entries.len() || index == self.current {
            return false;
        }
        self.current = index;
        true
    }

    /// `HH:MM:SS` of the current entry.
    pub fn clock_label(&self, offset: FixedOffset) -> String {
        self.current()
            .and_then(|e| local_time(e.timestamp, offset))
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub opacity: f32,
    pub speed: f32,
}

pub const STAR_COUNT: usize = 200;
const MIN_STAR_OPACITY: f32 = 0.3;
const TWINKLE: f32 = 0.02;

/// Drifting, twinkling backdrop. Exists only while Crawl is active.
#[derive(Debug, Clone)]
pub struct Starfield {
    stars: Vec<Star>,
    width: f32,
    height: f32,
}

impl Starfield {
    pub fn new<R: Rng>(rng: &mut R, width: f32, height: f32, count: usize) -> Self {
        let stars = (0..count)
            .map(|_| Star {
                x: rng.gen::<f32>() * width,
                y: rng.gen::<f32>() * height,
                radius: rng.gen::<f32>() * 1.5,
                opacity: rng.gen::<f32>(),
                speed: rng.gen::<f32>() * 0.5 + 0.1,
            })
            .collect();
        Self { stars, width, height }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// One animation frame: twinkle, drift down, wrap to the top.
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        for star in &mut self.stars {
            star.opacity = (star.opacity + (rng.gen::<f32>() - 0.5) * TWINKLE).clamp(MIN_STAR_OPACITY, 1.0);
            star.y += star.speed;
            if star.y > self.height {
                star.y = 0.0;
                star.x = rng.gen::<f32>() * self.width;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(n: usize) -> CrawlSession {
        let entries = (0..n)
            .map(|i| PlaybackEntry {
                id: i as i64,
                timestamp: 1_700_000_000_000 + i as i64 * 1000,
            })
            .collect();
        CrawlSession::new(entries).unwrap()
    }

    #[test]
    fn center_observations_drive_current_entry() {
        let t0 = Instant::now();
        let mut s = session(5);
        assert_eq!(s.current_index(), 0);
        // First frame only records where the list starts
        assert!(!s.observe_center(1, 0.0, t0));
        assert_eq!(s.current_index(), 0);
        assert!(s.observe_center(2, 120.0, t0));
        assert_eq!(s.current_index(), 2);
        assert!(!s.observe_center(2, 130.0, t0));
    }

    #[test]
    fn highlight_survives_frames_without_scrolling() {
        let t0 = Instant::now();
        let mut s = session(5);
        s.observe_center(3, 200.0, t0);
        assert!(s.highlight(0, t0));
        // The first entry cannot reach the centre, so the view never moves
        for frame in 1..=60u64 {
            assert!(!s.observe_center(3, 200.0, t0 + Duration::from_millis(16 * frame)));
        }
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn programmatic_scroll_is_not_fought() {
        let t0 = Instant::now();
        let mut s = session(5);
        s.observe_center(0, 0.0, t0);
        assert!(s.highlight(4, t0));
        assert_eq!(s.take_scroll_request(), Some(4));
        assert_eq!(s.take_scroll_request(), None);
        // Entries passing the centre on the way down are ignored
        assert!(!s.observe_center(1, 100.0, t0 + Duration::from_millis(50)));
        assert!(!s.observe_center(3, 300.0, t0 + Duration::from_millis(100)));
        assert_eq!(s.current_index(), 4);
        // Arrival clears the guard
        assert!(!s.observe_center(4, 400.0, t0 + Duration::from_millis(150)));
        assert!(s.observe_center(3, 300.0, t0 + Duration::from_millis(200)));
    }

    #[test]
    fn guard_expires() {
        let t0 = Instant::now();
        let mut s = session(5);
        s.observe_center(0, 0.0, t0);
        s.highlight(4, t0);
        assert!(s.observe_center(2, 200.0, t0 + SCROLL_GUARD));
    }

    #[test]
    fn navigate_stays_in_bounds() {
        let t0 = Instant::now();
        let mut s = session(2);
        assert!(!s.navigate(-1, t0));
        assert!(s.navigate(1, t0));
        assert!(!s.navigate(1, t0));
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn clock_shows_seconds() {
        let s = session(1);
        assert_eq!(s.clock_label(FixedOffset::east_opt(0).unwrap()), "22:13:20");
    }

    #[test]
    fn stars_twinkle_within_bounds_and_wrap() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut field = Starfield::new(&mut rng, 100.0, 50.0, STAR_COUNT);
        assert_eq!(field.stars().len(), STAR_COUNT);
        for _ in 0..1000 {
            field.step(&mut rng);
        }
        for star in field.stars() {
            assert!(star.opacity >= 0.3 && star.opacity <= 1.0);
            assert!(star.y >= 0.0 && star.y <= 50.0);
            assert!(star.x >= 0.0 && star.x <= 100.0);
            assert!(star.speed >= 0.1 && star.speed < 0.6);
        }
    }
}
