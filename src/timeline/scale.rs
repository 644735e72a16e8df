//! Linear time → virtual-pixel mapping.

use super::types::{TimeWindow, DAY_MS};

/// Maps epoch-millisecond timestamps onto a fixed virtual pixel range.
///
/// Values outside the domain extrapolate linearly, so the view can be
/// panned a little past the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

impl TimeScale {
    pub fn new(domain_start: f64, domain_end: f64, range_start: f64, range_end: f64) -> Self {
        // A zero-width domain would make the mapping non-invertible
        let domain_end = if domain_end > domain_start {
            domain_end
        } else {
            domain_start + DAY_MS
        };
        let range_end = if range_end > range_start {
            range_end
        } else {
            range_start + 1.0
        };
        Self {
            domain_start,
            domain_end,
            range_start,
            range_end,
        }
    }

    /// Build the main timeline scale.
    ///
    /// The domain covers `bounds` plus `buffer_ms` on each side. Without records
    /// it falls back to the week before `focus_ms` plus one day after. The range
    /// is at least twice the viewport and grows by one viewport per three days.
    pub fn for_records(
        bounds: Option<(i64, i64)>,
        buffer_ms: f64,
        focus_ms: f64,
        viewport_width: f64,
    ) -> Self {
        let (start, end) = match bounds {
            Some((min, max)) => (min as f64 - buffer_ms, max as f64 + buffer_ms),
            None => {
                tracing::debug!("No records, using default time domain around focus");
                (focus_ms - 7.0 * DAY_MS, focus_ms + DAY_MS)
            }
        };
        let days = (end - start) / DAY_MS;
        let range_width = viewport_width.max(1.0) * (days / 3.0).max(2.0);
        Self::new(start, end, 0.0, range_width)
    }

    pub fn project(&self, timestamp: f64) -> f64 {
        let t = (timestamp - self.domain_start) / (self.domain_end - self.domain_start);
        self.range_start + t * (self.range_end - self.range_start)
    }

    pub fn invert(&self, x: f64) -> f64 {
        let t = (x - self.range_start) / (self.range_end - self.range_start);
        self.domain_start + t * (self.domain_end - self.domain_start)
    }

    pub fn domain(&self) -> TimeWindow {
        TimeWindow::new(self.domain_start, self.domain_end)
    }

    pub fn range_width(&self) -> f64 {
        self.range_end - self.range_start
    }

    /// Milliseconds per virtual pixel.
    pub fn ms_per_px(&self) -> f64 {
        (self.domain_end - self.domain_start) / self.range_width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn round_trip_recovers_timestamp() {
        let scale = TimeScale::for_records(Some((T0, T0 + 5 * DAY_MS as i64)), DAY_MS, 0.0, 1200.0);
        let mut t = T0 as f64 - DAY_MS;
        while t <= T0 as f64 + 6.0 * DAY_MS {
            let back = scale.invert(scale.project(t));
            assert!((back - t).abs() < 1e-3, "{} vs {}", back, t);
            t += 3_333_333.0;
        }
    }

    #[test]
    fn domain_is_buffered() {
        let scale = TimeScale::for_records(Some((T0, T0 + 1000)), DAY_MS, 0.0, 1000.0);
        let domain = scale.domain();
        assert_eq!(domain.start, T0 as f64 - DAY_MS);
        assert_eq!(domain.end, T0 as f64 + 1000.0 + DAY_MS);
        // ~2 days of domain: clamped to twice the viewport
        assert_eq!(scale.range_width(), 2000.0);
        assert_eq!(scale.project(domain.start), 0.0);
    }

    #[test]
    fn range_grows_with_long_domains() {
        let scale = TimeScale::for_records(Some((T0, T0 + 28 * DAY_MS as i64)), DAY_MS, 0.0, 900.0);
        // 30 days / 3 = 10 viewports
        assert!((scale.range_width() - 9000.0).abs() < 1e-6);
    }

    #[test]
    fn empty_domain_falls_back_to_default_window() {
        let focus = T0 as f64;
        let scale = TimeScale::for_records(None, DAY_MS, focus, 800.0);
        let domain = scale.domain();
        assert_eq!(domain.start, focus - 7.0 * DAY_MS);
        assert_eq!(domain.end, focus + DAY_MS);
    }

    #[test]
    fn single_record_domain_is_not_degenerate() {
        let scale = TimeScale::for_records(Some((T0, T0)), 0.0, 0.0, 800.0);
        assert!(scale.domain().span() > 0.0);
        let x = scale.project(T0 as f64);
        assert!(x.is_finite());
    }

    #[test]
    fn extrapolates_outside_domain() {
        let scale = TimeScale::new(0.0, 100.0, 0.0, 1000.0);
        assert!((scale.project(-10.0) + 100.0).abs() < 1e-9);
        assert!((scale.invert(1100.0) - 110.0).abs() < 1e-9);
    }
}
