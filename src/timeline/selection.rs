//! Rectangular brush and the resulting selection set.

use super::types::RecordId;
use std::collections::BTreeSet;

/// Axis-aligned rectangle in timeline content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BrushRect {
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }
}

/// In-progress brush gesture.
#[derive(Debug, Clone, Default)]
pub struct BrushState {
    origin: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
}

impl BrushState {
    pub fn begin(&mut self, x: f64, y: f64) {
        self.origin = Some((x, y));
        self.current = Some((x, y));
    }

    pub fn update(&mut self, x: f64, y: f64) {
        if self.origin.is_some() {
            self.current = Some((x, y));
        }
    }

    pub fn rect(&self) -> Option<BrushRect> {
        Some(BrushRect::from_corners(self.origin?, self.current?))
    }

    /// End the gesture. A zero-area brush yields nothing.
    pub fn finish(&mut self) -> Option<BrushRect> {
        let rect = self.rect();
        self.cancel();
        rect.filter(|r| !r.is_empty())
    }

    pub fn cancel(&mut self) {
        self.origin = None;
        self.current = None;
    }
}

/// Record ids chosen by the last brush gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    ids: BTreeSet<RecordId>,
}

impl SelectionSet {
    /// Replace the contents; a new brush never accumulates onto the old one.
    pub fn replace<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brush_normalizes_corners() {
        let r = BrushRect::from_corners((10.0, 50.0), (0.0, 20.0));
        assert_eq!(r.min_x, 0.0);
        assert_eq!(r.max_y, 50.0);
        assert!(r.contains(5.0, 30.0));
        assert!(!r.contains(11.0, 30.0));
    }

    #[test]
    fn click_without_drag_selects_nothing() {
        let mut brush = BrushState::default();
        brush.begin(4.0, 4.0);
        assert!(brush.finish().is_none());
        assert!(brush.rect().is_none());
    }

    #[test]
    fn new_brush_replaces_selection() {
        let mut sel = SelectionSet::default();
        sel.replace([3, 1]);
        sel.replace([7]);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![7]);
        sel.clear();
        assert!(sel.is_empty());
    }
}
