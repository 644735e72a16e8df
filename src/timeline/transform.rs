//! Live horizontal zoom/pan transform and gesture interpretation.
//!
//! The transform is purely horizontal: `screen_x = translate_x + scale * virtual_x`.
//! Vertical position is an independent scroll offset owned by the viewport.

use super::scale::TimeScale;
use super::types::TimeWindow;

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 100.0 }
    }
}

impl ScaleBounds {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translate_x: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translate_x: 0.0,
        scale: 1.0,
    };

    pub fn new(translate_x: f64, scale: f64, bounds: ScaleBounds) -> Self {
        Self {
            translate_x,
            scale: bounds.clamp(scale),
        }
    }

    /// Virtual x → screen x
    pub fn apply(&self, virtual_x: f64) -> f64 {
        self.translate_x + self.scale * virtual_x
    }

    /// Screen x → virtual x
    pub fn invert(&self, screen_x: f64) -> f64 {
        (screen_x - self.translate_x) / self.scale
    }

    pub fn visible_x(&self, scale: &TimeScale, timestamp: f64) -> f64 {
        self.apply(scale.project(timestamp))
    }

    pub fn time_at(&self, scale: &TimeScale, screen_x: f64) -> f64 {
        scale.invert(self.invert(screen_x))
    }

    /// Time span currently between screen x = 0 and x = `viewport_width`.
    pub fn visible_window(&self, scale: &TimeScale, viewport_width: f64) -> TimeWindow {
        TimeWindow::new(self.time_at(scale, 0.0), self.time_at(scale, viewport_width))
    }

    /// Multiply scale by `factor` (clamped) keeping `focal_x` stationary on screen.
    pub fn zoom_about(&self, factor: f64, focal_x: f64, bounds: ScaleBounds) -> Self {
        let scale = bounds.clamp(self.scale * factor);
        let virtual_focal = self.invert(focal_x);
        Self {
            translate_x: focal_x - virtual_focal * scale,
            scale,
        }
    }

    pub fn pan_by(&self, dx: f64) -> Self {
        Self {
            translate_x: self.translate_x + dx,
            scale: self.scale,
        }
    }

    /// Transform that shows `[start, end]` across `viewport_width`.
    pub fn fit_window(
        scale: &TimeScale,
        window: TimeWindow,
        viewport_width: f64,
        bounds: ScaleBounds,
    ) -> Self {
        let x0 = scale.project(window.start);
        let x1 = scale.project(window.end);
        let width = (x1 - x0).max(f64::EPSILON);
        let k = bounds.clamp(viewport_width / width);
        Self {
            translate_x: -x0 * k,
            scale: k,
        }
    }
}

/// Clamp a drag translation so the content edge can be pulled at most
/// `margin_fraction` of the viewport past either side.
///
/// Content narrower than the viewport may move anywhere as long as neither
/// edge leaves the viewport by more than the margin.
pub fn clamp_pan(
    translate_x: f64,
    scale: f64,
    viewport_width: f64,
    range_width: f64,
    margin_fraction: f64,
) -> f64 {
    let margin = viewport_width * margin_fraction;
    let slack = viewport_width - range_width * scale;
    let (min, max) = if slack <= 0.0 {
        (slack - margin, margin)
    } else {
        (-margin, slack + margin)
    };
    translate_x.clamp(min, max)
}

/// Unit of a wheel delta, mirroring the browser's `deltaMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelUnit {
    Pixel,
    Line,
    Page,
}

impl WheelUnit {
    fn zoom_sensitivity(&self) -> f64 {
        match self {
            WheelUnit::Pixel => 0.002,
            WheelUnit::Line => 0.05,
            WheelUnit::Page => 1.0,
        }
    }
}

/// A wheel/trackpad scroll over the timeline.
///
/// Deltas use the DOM convention: positive `delta_y` scrolls down (zooms out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGesture {
    pub delta_x: f64,
    pub delta_y: f64,
    pub unit: WheelUnit,
    /// Secondary key (Ctrl) held
    pub modifier: bool,
    pub focal_x: f64,
}

/// Zoom speed multiplier applied on top of the unit sensitivity.
const WHEEL_ZOOM_SPEED: f64 = 6.0;
/// Pixels panned per pixel of horizontal delta in a modified scroll.
const WHEEL_PAN_SPEED: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformChange {
    Zoom { factor: f64, focal_x: f64 },
    Pan { dx: f64 },
}

impl TransformChange {
    pub fn apply(&self, transform: &Transform, bounds: ScaleBounds) -> Transform {
        match *self {
            TransformChange::Zoom { factor, focal_x } => transform.zoom_about(factor, focal_x, bounds),
            TransformChange::Pan { dx } => transform.pan_by(dx),
        }
    }
}

/// Decide whether a wheel gesture zooms or pans.
///
/// A modified scroll whose horizontal delta dominates is a pure pan; every
/// other wheel gesture zooms about the pointer.
pub fn interpret_wheel(gesture: &WheelGesture) -> Option<TransformChange> {
    if gesture.modifier && gesture.delta_x.abs() > gesture.delta_y.abs() {
        return Some(TransformChange::Pan {
            dx: -gesture.delta_x * WHEEL_PAN_SPEED,
        });
    }
    if gesture.delta_y == 0.0 {
        return None;
    }
    let exponent = -gesture.delta_y * gesture.unit.zoom_sensitivity() * WHEEL_ZOOM_SPEED;
    Some(TransformChange::Zoom {
        factor: 2f64.powf(exponent),
        focal_x: gesture.focal_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> TimeScale {
        TimeScale::new(0.0, 10_000.0, 0.0, 2000.0)
    }

    #[test]
    fn visible_x_is_strictly_monotonic_across_scales() {
        let s = scale();
        let bounds = ScaleBounds::default();
        for &k in &[0.5, 0.75, 1.0, 3.3, 17.0, 100.0] {
            for &tx in &[-5000.0, 0.0, 123.4] {
                let t = Transform::new(tx, k, bounds);
                let mut prev = f64::NEG_INFINITY;
                for ts in (0..=10_000).step_by(250) {
                    let x = t.visible_x(&s, ts as f64);
                    assert!(x > prev, "not monotonic at k={} ts={}", k, ts);
                    prev = x;
                }
            }
        }
    }

    #[test]
    fn scale_is_clamped() {
        let bounds = ScaleBounds::default();
        assert_eq!(Transform::new(0.0, 0.1, bounds).scale, 0.5);
        assert_eq!(Transform::new(0.0, 500.0, bounds).scale, 100.0);
        let t = Transform::IDENTITY.zoom_about(1e6, 10.0, bounds);
        assert_eq!(t.scale, 100.0);
    }

    #[test]
    fn zoom_keeps_focal_point_stationary() {
        let s = scale();
        let t = Transform::new(-300.0, 2.0, ScaleBounds::default());
        let focal = 412.0;
        let before = t.time_at(&s, focal);
        let zoomed = t.zoom_about(1.7, focal, ScaleBounds::default());
        let after = zoomed.time_at(&s, focal);
        assert!((before - after).abs() < 1e-6);
        assert!((zoomed.scale - 3.4).abs() < 1e-12);
    }

    #[test]
    fn modified_horizontal_scroll_pans_without_zoom() {
        let gesture = WheelGesture {
            delta_x: 30.0,
            delta_y: 4.0,
            unit: WheelUnit::Pixel,
            modifier: true,
            focal_x: 100.0,
        };
        let change = interpret_wheel(&gesture).unwrap();
        assert_eq!(change, TransformChange::Pan { dx: -60.0 });

        let t = Transform::new(10.0, 3.0, ScaleBounds::default());
        let panned = change.apply(&t, ScaleBounds::default());
        assert_eq!(panned.scale, 3.0);
        assert_eq!(panned.translate_x, -50.0);
    }

    #[test]
    fn vertical_scroll_zooms() {
        let down = WheelGesture {
            delta_x: 0.0,
            delta_y: 100.0,
            unit: WheelUnit::Pixel,
            modifier: false,
            focal_x: 0.0,
        };
        match interpret_wheel(&down) {
            Some(TransformChange::Zoom { factor, .. }) => assert!(factor < 1.0),
            other => panic!("expected zoom, got {:?}", other),
        }
        // Modifier with dominant vertical delta still zooms
        let up = WheelGesture {
            delta_y: -3.0,
            unit: WheelUnit::Line,
            modifier: true,
            ..down
        };
        match interpret_wheel(&up) {
            Some(TransformChange::Zoom { factor, .. }) => assert!(factor > 1.0),
            other => panic!("expected zoom, got {:?}", other),
        }
    }

    #[test]
    fn pan_is_clamped_to_margin() {
        // viewport 1000, content 3000 at scale 1, 10% margin
        assert_eq!(clamp_pan(500.0, 1.0, 1000.0, 3000.0, 0.1), 100.0);
        assert_eq!(clamp_pan(-5000.0, 1.0, 1000.0, 3000.0, 0.1), -2100.0);
        assert_eq!(clamp_pan(-700.0, 1.0, 1000.0, 3000.0, 0.1), -700.0);
        // content narrower than the viewport moves freely inside the margins
        assert_eq!(clamp_pan(-50.0, 0.5, 1000.0, 1000.0, 0.1), -50.0);
        assert_eq!(clamp_pan(250.0, 0.5, 1000.0, 1000.0, 0.1), 250.0);
        assert_eq!(clamp_pan(-400.0, 0.5, 1000.0, 1000.0, 0.1), -100.0);
        assert_eq!(clamp_pan(900.0, 0.5, 1000.0, 1000.0, 0.1), 600.0);
    }

    #[test]
    fn fit_window_shows_requested_span() {
        let s = scale();
        let t = Transform::fit_window(&s, TimeWindow::new(2000.0, 4000.0), 800.0, ScaleBounds::default());
        let w = t.visible_window(&s, 800.0);
        assert!((w.start - 2000.0).abs() < 1e-6);
        assert!((w.end - 4000.0).abs() < 1e-6);
    }
}
