//! Visible viewport: horizontal transform plus an independent vertical scroll.

use super::scale::TimeScale;
use super::transform::{clamp_pan, ScaleBounds, Transform, TransformChange};
use super::types::TimeWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub transform: Transform,
    pub scroll_top: f64,
    /// Full height of the lane area (the virtual height)
    pub content_height: f64,
    pub bounds: ScaleBounds,
}

impl Viewport {
    pub fn new(width: f64, height: f64, bounds: ScaleBounds) -> Self {
        Self {
            width,
            height,
            transform: Transform::IDENTITY,
            scroll_top: 0.0,
            content_height: height,
            bounds,
        }
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = Transform::new(transform.translate_x, transform.scale, self.bounds);
    }

    pub fn apply_change(&mut self, change: TransformChange) {
        self.transform = change.apply(&self.transform, self.bounds);
    }

    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.height).max(0.0)
    }

    pub fn set_scroll(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll());
    }

    pub fn scroll_by(&mut self, dy: f64) {
        self.set_scroll(self.scroll_top + dy);
    }

    pub fn set_content_height(&mut self, content_height: f64) {
        self.content_height = content_height.max(0.0);
        self.set_scroll(self.scroll_top);
    }

    /// Apply a pointer drag: horizontal delta pans (clamped), vertical delta scrolls.
    pub fn drag_by(&mut self, dx: f64, dy: f64, range_width: f64, margin_fraction: f64) {
        let tx = clamp_pan(
            self.transform.translate_x + dx,
            self.transform.scale,
            self.width,
            range_width,
            margin_fraction,
        );
        self.transform.translate_x = tx;
        self.scroll_by(-dy);
    }

    pub fn visible_window(&self, scale: &TimeScale) -> TimeWindow {
        self.transform.visible_window(scale, self.width)
    }

    pub fn center_x(&self) -> f64 {
        self.width / 2.0
    }
}

/// Captured viewport position, taken right before a structural rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSnapshot {
    pub transform: Transform,
    pub scroll_top: f64,
    range_width: f64,
    anchor_time: f64,
    ms_per_screen_px: f64,
}

/// Save/restore slot that brackets rebuilds (filter, resize, reorder).
#[derive(Debug, Clone, Default)]
pub struct ViewportState {
    saved: Option<ViewportSnapshot>,
}

impl ViewportState {
    pub fn save(&mut self, viewport: &Viewport, scale: &TimeScale) {
        let transform = viewport.transform;
        self.saved = Some(ViewportSnapshot {
            transform,
            scroll_top: viewport.scroll_top,
            range_width: scale.range_width(),
            anchor_time: transform.time_at(scale, 0.0),
            ms_per_screen_px: scale.ms_per_px() / transform.scale,
        });
    }

    /// Reapply the last snapshot. With an unchanged scale range the transform
    /// comes back bit-identical; otherwise it is re-anchored so the left-edge
    /// time and time-per-pixel survive. Returns false if nothing was saved.
    pub fn restore(&self, viewport: &mut Viewport, scale: &TimeScale) -> bool {
        let Some(snap) = self.saved else {
            return false;
        };
        if snap.range_width == scale.range_width() {
            viewport.transform = snap.transform;
        } else {
            let k = viewport.bounds.clamp(scale.ms_per_px() / snap.ms_per_screen_px);
            viewport.transform = Transform {
                translate_x: -scale.project(snap.anchor_time) * k,
                scale: k,
            };
            tracing::debug!(
                "Viewport re-anchored after range change: k {:.3} -> {:.3}",
                snap.transform.scale,
                k
            );
        }
        viewport.set_scroll(snap.scroll_top);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(1000.0, 400.0, ScaleBounds::default());
        vp.set_content_height(1200.0);
        vp
    }

    #[test]
    fn save_then_restore_is_bit_identical() {
        let scale = TimeScale::new(0.0, 1_000_000.0, 0.0, 3000.0);
        let mut vp = viewport();
        vp.set_transform(Transform {
            translate_x: -1234.567_891,
            scale: 3.141_592_653,
        });
        vp.set_scroll(321.123);
        let before = vp.clone();

        let mut state = ViewportState::default();
        state.save(&vp, &scale);
        assert!(state.restore(&mut vp, &scale));
        assert_eq!(vp.transform.translate_x.to_bits(), before.transform.translate_x.to_bits());
        assert_eq!(vp.transform.scale.to_bits(), before.transform.scale.to_bits());
        assert_eq!(vp.scroll_top.to_bits(), before.scroll_top.to_bits());
    }

    #[test]
    fn restore_without_save_is_noop() {
        let scale = TimeScale::new(0.0, 1000.0, 0.0, 1000.0);
        let mut vp = viewport();
        assert!(!ViewportState::default().restore(&mut vp, &scale));
        assert_eq!(vp.transform, Transform::IDENTITY);
    }

    #[test]
    fn restore_after_resize_keeps_visible_start_and_density() {
        let old = TimeScale::new(0.0, 1_000_000.0, 0.0, 2000.0);
        let mut vp = viewport();
        vp.set_transform(Transform {
            translate_x: -500.0,
            scale: 2.0,
        });
        let window_before = vp.visible_window(&old);

        let mut state = ViewportState::default();
        state.save(&vp, &old);

        // Viewport got wider; range doubled
        let new = TimeScale::new(0.0, 1_000_000.0, 0.0, 4000.0);
        assert!(state.restore(&mut vp, &new));
        let window_after = vp.visible_window(&new);
        assert!((window_before.start - window_after.start).abs() < 1e-6);
        assert!((window_before.span() - window_after.span()).abs() < 1e-6);
        assert!((vp.transform.scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut vp = viewport();
        vp.scroll_by(5000.0);
        assert_eq!(vp.scroll_top, 800.0);
        vp.scroll_by(-9000.0);
        assert_eq!(vp.scroll_top, 0.0);
        vp.set_content_height(100.0);
        assert_eq!(vp.max_scroll(), 0.0);
    }

    #[test]
    fn drag_pans_and_scrolls() {
        let mut vp = viewport();
        vp.drag_by(-300.0, -50.0, 5000.0, 0.1);
        assert_eq!(vp.transform.translate_x, -300.0);
        assert_eq!(vp.scroll_top, 50.0);
        // Cannot drag more than 10% past the left edge
        vp.drag_by(10_000.0, 0.0, 5000.0, 0.1);
        assert_eq!(vp.transform.translate_x, 100.0);
    }
}
