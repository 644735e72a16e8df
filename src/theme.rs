//! Unified theme and color constants for the timeline.
//!
//! All colors used by the painter and panels come from here.

use crate::timeline::controller::BadgeLevel;
use crate::timeline::RatingTier;
use egui::Color32;

/// Background colors for different layers
pub mod bg {
    use super::*;

    /// Timeline plot area - darkest layer
    pub const PLOT: Color32 = Color32::from_rgb(14, 17, 23);

    /// Panel backgrounds - slightly lighter than the plot
    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);

    /// Card/elevated surface backgrounds
    pub const SURFACE: Color32 = Color32::from_rgb(28, 30, 38);

    /// Theater and crawl backdrop
    pub const STAGE: Color32 = Color32::from_rgb(5, 6, 10);

    pub const BRUSH: Color32 = Color32::from_rgba_premultiplied(40, 60, 90, 70);
}

/// Accent colors
pub mod accent {
    use super::*;

    pub const ORANGE: Color32 = Color32::from_rgb(243, 156, 18);
    pub const GREEN: Color32 = Color32::from_rgb(39, 174, 96);
    pub const RED: Color32 = Color32::from_rgb(231, 76, 60);
    pub const BLUE: Color32 = Color32::from_rgb(59, 130, 246);

    /// Selected markers and the crawl highlight
    pub const YELLOW: Color32 = Color32::from_rgb(255, 220, 80);
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    /// Primary text - high contrast
    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    /// Secondary text - medium contrast
    pub const SECONDARY: Color32 = Color32::from_rgb(180, 180, 190);

    /// Muted text - low contrast for less important info
    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);
}

/// Grid, axis and lane decorations
pub mod grid {
    use super::*;

    pub const LINE: Color32 = Color32::from_rgb(42, 42, 42);
    pub const MIDNIGHT: Color32 = Color32::WHITE;
    /// Focus-day lines are drawn brighter than the rest
    pub const FOCUS_DAY: Color32 = Color32::from_rgb(70, 70, 70);
    pub const TRACK: Color32 = Color32::from_rgb(30, 33, 40);
    pub const NOW: Color32 = Color32::from_rgb(255, 68, 68);
}

/// Marker fill per rating tier
pub fn rating_color(tier: RatingTier) -> Color32 {
    match tier {
        RatingTier::Unrated => accent::BLUE,
        RatingTier::Low => accent::RED,
        RatingTier::Medium => accent::ORANGE,
        RatingTier::High => accent::GREEN,
    }
}

/// Visible-project badge background
pub fn badge_color(level: BadgeLevel) -> Color32 {
    match level {
        BadgeLevel::Comfortable => accent::GREEN,
        BadgeLevel::Crowded => accent::ORANGE,
        BadgeLevel::Overloaded => accent::RED,
    }
}

/// `color` at `opacity` (0..=1)
pub fn faded(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

/// Create a stroke with the given color and width
pub fn stroke(color: Color32, width: f32) -> egui::Stroke {
    egui::Stroke::new(width, color)
}

/// Stroke widths
pub mod stroke_width {
    pub const NORMAL: f32 = 1.0;
    pub const SELECTED: f32 = 2.5;
    pub const NOW: f32 = 2.0;
}
