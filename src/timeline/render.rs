//! Materialized timeline elements and the reposition passes that keep them
//! aligned with the live transform.
//!
//! `rebuild` generates markers, grid lines and lanes. After that a transform
//! change only runs `reposition`, and a lane order change only runs
//! `reposition_vertical`. Both passes borrow their inputs immutably, so the
//! project order cannot change underneath a pass.

use super::axis::{align_up, local_time, ticks_in_window, AxisTick};
use super::project_order::ProjectOrder;
use super::scale::TimeScale;
use super::selection::{BrushRect, SelectionSet};
use super::types::{
    short_project_name, Rating, RatingTier, Record, RecordId, RecordStore, HOUR_MS,
};
use super::viewport::Viewport;
use chrono::{FixedOffset, NaiveDate, Timelike};
use std::collections::HashMap;

/// Top of the first lane; leaves room for the largest marker under the axis.
pub const LANE_TOP: f64 = 30.0;
pub const MIN_LANE_HEIGHT: f64 = 35.0;
pub const BAND_PADDING: f64 = 0.3;
pub const MIN_RADIUS: f32 = 4.0;
pub const MAX_RADIUS: f32 = 20.0;
/// Opacity of markers outside the horizontal viewport.
pub const OFFSCREEN_OPACITY: f32 = 0.15;
/// Length used for radius scaling when no rendered record has text.
const FALLBACK_MAX_LEN: usize = 1000;

/// Ordinal band scale with equal inner/outer padding, centred in its range.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    start: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    pub fn new(domain: Vec<String>, range: (f64, f64), padding: f64) -> Self {
        let n = domain.len() as f64;
        let span = range.1 - range.0;
        let step = span / (n - padding + 2.0 * padding).max(1.0);
        let start = range.0 + (span - step * (n - padding)) * 0.5;
        Self {
            domain,
            start,
            step,
            bandwidth: step * (1.0 - padding),
        }
    }

    pub fn position(&self, project: &str) -> Option<f64> {
        let i = self.domain.iter().position(|p| p == project)?;
        Some(self.start + self.step * i as f64)
    }

    /// Vertical centre of a project's lane.
    pub fn center(&self, project: &str) -> Option<f64> {
        self.position(project).map(|y| y + self.bandwidth / 2.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }
}

impl Default for BandScale {
    fn default() -> Self {
        Self::new(Vec::new(), (LANE_TOP, LANE_TOP), BAND_PADDING)
    }
}

/// Lanes fill the viewport height until they hit the minimum lane height,
/// after which the content scrolls.
pub fn lane_layout(lanes: Vec<String>, inner_height: f64) -> (BandScale, f64) {
    let n = lanes.len();
    let lane_height = MIN_LANE_HEIGHT.max(inner_height / n.max(1) as f64);
    let content_height = LANE_TOP + n as f64 * lane_height;
    (
        BandScale::new(lanes, (LANE_TOP, content_height), BAND_PADDING),
        content_height,
    )
}

/// Radius for a content length on a square-root scale.
pub fn marker_radius(len: usize, max_len: usize) -> f32 {
    let max_len = if max_len == 0 { FALLBACK_MAX_LEN } else { max_len };
    let t = (len as f64 / max_len as f64).clamp(0.0, 1.0).sqrt() as f32;
    MIN_RADIUS + t * (MAX_RADIUS - MIN_RADIUS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: RecordId,
    pub timestamp: i64,
    pub project: String,
    pub virtual_x: f64,
    /// Screen x under the current transform
    pub x: f64,
    /// Lane centre in content coordinates; None when the project has no lane
    pub y: Option<f64>,
    pub radius: f32,
    pub tier: RatingTier,
    pub opacity: f32,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub timestamp: i64,
    pub x: f64,
    pub midnight: bool,
    pub on_focus_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NowLine {
    pub timestamp: i64,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackLine {
    pub project: String,
    pub y: f64,
    pub x0: f64,
    pub x1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneLabel {
    pub project: String,
    pub label: String,
    pub y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedTick {
    pub tick: AxisTick,
    pub x: f64,
}

/// Inputs that decide which projects get lanes.
#[derive(Debug, Clone, Copy)]
pub struct LaneFilter<'a> {
    pub project: Option<&'a str>,
    pub max_visible: usize,
}

#[derive(Debug, Clone)]
pub struct RenderEngine {
    markers: Vec<Marker>,
    index: HashMap<RecordId, usize>,
    grid: Vec<GridLine>,
    now: NowLine,
    tracks: Vec<TrackLine>,
    labels: Vec<LaneLabel>,
    ticks: Vec<PositionedTick>,
    band: BandScale,
    max_len: usize,
    range_width: f64,
    offset: FixedOffset,
}

impl RenderEngine {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            markers: Vec::new(),
            index: HashMap::new(),
            grid: Vec::new(),
            now: NowLine { timestamp: 0, x: 0.0 },
            tracks: Vec::new(),
            labels: Vec::new(),
            ticks: Vec::new(),
            band: BandScale::default(),
            max_len: FALLBACK_MAX_LEN,
            range_width: 0.0,
            offset,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: RecordId) -> Option<&Marker> {
        self.index.get(&id).map(|&i| &self.markers[i])
    }

    pub fn grid_lines(&self) -> &[GridLine] {
        &self.grid
    }

    pub fn now_line(&self) -> NowLine {
        self.now
    }

    pub fn track_lines(&self) -> &[TrackLine] {
        &self.tracks
    }

    pub fn lane_labels(&self) -> &[LaneLabel] {
        &self.labels
    }

    pub fn ticks(&self) -> &[PositionedTick] {
        &self.ticks
    }

    pub fn band(&self) -> &BandScale {
        &self.band
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Full regeneration of every element, then a horizontal reposition pass.
    #[allow(clippy::too_many_arguments)]
    pub fn rebuild(
        &mut self,
        store: &RecordStore,
        order: &ProjectOrder,
        filter: LaneFilter<'_>,
        scale: &TimeScale,
        viewport: &mut Viewport,
        now_ms: i64,
        focus_day: Option<NaiveDate>,
    ) {
        self.range_width = scale.range_width();
        self.layout_lanes(order, filter, viewport);
        self.max_len = self.laned_max_len(store);

        self.markers.clear();
        self.index.clear();
        let laned: Vec<&Record> = store
            .iter()
            .filter(|r| self.band.position(r.project_id()).is_some())
            .collect();
        for record in laned {
            self.push_marker(record, scale);
        }

        self.build_grid(scale, focus_day);
        self.now = NowLine {
            timestamp: now_ms,
            x: 0.0,
        };
        tracing::debug!(
            "Rebuilt timeline: {} markers, {} lanes, {} grid lines",
            self.markers.len(),
            self.band.domain().len(),
            self.grid.len()
        );
        self.reposition(scale, viewport);
    }

    /// Longest display among records that currently have a lane.
    fn laned_max_len(&self, store: &RecordStore) -> usize {
        store
            .iter()
            .filter(|r| self.band.position(r.project_id()).is_some())
            .map(Record::display_len)
            .max()
            .unwrap_or(0)
    }

    fn push_marker(&mut self, record: &Record, scale: &TimeScale) {
        let virtual_x = scale.project(record.timestamp as f64);
        self.index.insert(record.id, self.markers.len());
        self.markers.push(Marker {
            id: record.id,
            timestamp: record.timestamp,
            project: record.project_id().to_string(),
            virtual_x,
            x: virtual_x,
            y: self.band.center(record.project_id()),
            radius: marker_radius(record.display_len(), self.max_len),
            tier: record.tier(),
            opacity: 1.0,
            selected: false,
        });
    }

    fn layout_lanes(&mut self, order: &ProjectOrder, filter: LaneFilter<'_>, viewport: &mut Viewport) {
        let lanes: Vec<String> = order
            .visible(filter.project, filter.max_visible)
            .into_iter()
            .map(String::from)
            .collect();
        let (band, content_height) = lane_layout(lanes, viewport.height);
        viewport.set_content_height(content_height);
        self.band = band;

        let bandwidth = self.band.bandwidth();
        self.tracks.clear();
        self.labels.clear();
        for project in self.band.domain() {
            let (Some(top), Some(center)) = (self.band.position(project), self.band.center(project)) else {
                continue;
            };
            self.tracks.push(TrackLine {
                project: project.clone(),
                y: center,
                x0: 0.0,
                x1: 0.0,
            });
            self.labels.push(LaneLabel {
                project: project.clone(),
                label: short_project_name(project).to_string(),
                y: top,
                height: bandwidth,
            });
        }
    }

    fn build_grid(&mut self, scale: &TimeScale, focus_day: Option<NaiveDate>) {
        self.grid.clear();
        let domain = scale.domain();
        let mut t = align_up(domain.start, HOUR_MS, self.offset);
        while t <= domain.end {
            let timestamp = t.round() as i64;
            let local = local_time(timestamp, self.offset);
            self.grid.push(GridLine {
                timestamp,
                x: scale.project(t),
                midnight: local.map_or(false, |dt| dt.hour() == 0),
                on_focus_day: match (local, focus_day) {
                    (Some(dt), Some(day)) => dt.date_naive() == day,
                    _ => false,
                },
            });
            t += HOUR_MS;
        }
    }

    /// Horizontal pass for a transform change: no element is created or removed.
    pub fn reposition(&mut self, scale: &TimeScale, viewport: &Viewport) {
        let transform = viewport.transform;
        let width = viewport.width;
        for marker in &mut self.markers {
            marker.x = transform.apply(marker.virtual_x);
            marker.opacity = if marker.x >= 0.0 && marker.x <= width {
                1.0
            } else {
                OFFSCREEN_OPACITY
            };
        }
        for line in &mut self.grid {
            line.x = transform.visible_x(scale, line.timestamp as f64);
        }
        self.now.x = transform.visible_x(scale, self.now.timestamp as f64);
        let (x0, x1) = (transform.apply(0.0), transform.apply(self.range_width));
        for track in &mut self.tracks {
            track.x0 = x0;
            track.x1 = x1;
        }
        let window = viewport.visible_window(scale);
        self.ticks = ticks_in_window(window, transform.scale, self.offset)
            .into_iter()
            .map(|tick| {
                let x = transform.visible_x(scale, tick.timestamp as f64);
                PositionedTick { tick, x }
            })
            .collect();
    }

    /// Vertical pass for a lane order change. Markers keep their horizontal
    /// position; projects that gained a lane get markers, and markers whose
    /// project lost its lane are skipped.
    pub fn reposition_vertical(
        &mut self,
        store: &RecordStore,
        order: &ProjectOrder,
        filter: LaneFilter<'_>,
        scale: &TimeScale,
        viewport: &mut Viewport,
    ) {
        self.layout_lanes(order, filter, viewport);
        let mut skipped = 0usize;
        for marker in &mut self.markers {
            marker.y = self.band.center(&marker.project);
            if marker.y.is_none() {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!("Reposition skipped {} markers without a lane", skipped);
        }
        let max_len = self.laned_max_len(store);
        if max_len != self.max_len {
            self.max_len = max_len;
            for marker in &mut self.markers {
                if let Some(record) = store.get(marker.id) {
                    marker.radius = marker_radius(record.display_len(), max_len);
                }
            }
        }
        let missing: Vec<&Record> = store
            .iter()
            .filter(|r| !self.index.contains_key(&r.id) && self.band.position(r.project_id()).is_some())
            .collect();
        for record in missing {
            self.push_marker(record, scale);
        }
        self.reposition(scale, viewport);
    }

    pub fn set_now(&mut self, now_ms: i64, scale: &TimeScale, viewport: &Viewport) {
        self.now = NowLine {
            timestamp: now_ms,
            x: viewport.transform.visible_x(scale, now_ms as f64),
        };
    }

    /// Recolour one marker after a rating change.
    pub fn update_marker_rating(&mut self, id: RecordId, rating: Option<Rating>) {
        if let Some(&i) = self.index.get(&id) {
            self.markers[i].tier = RatingTier::of(rating);
        }
    }

    pub fn set_selected(&mut self, selection: &SelectionSet) {
        for marker in &mut self.markers {
            marker.selected = selection.contains(marker.id);
        }
    }

    /// Ids of laned markers inside a brush (screen x, content y).
    pub fn markers_in_rect(&self, rect: &BrushRect) -> Vec<RecordId> {
        self.markers
            .iter()
            .filter(|m| m.y.map_or(false, |y| rect.contains(m.x, y)))
            .map(|m| m.id)
            .collect()
    }

    /// Closest marker whose disc contains the point.
    pub fn marker_at(&self, x: f64, y: f64) -> Option<RecordId> {
        self.markers
            .iter()
            .filter_map(|m| {
                let my = m.y?;
                let d2 = (m.x - x).powi(2) + (my - y).powi(2);
                (d2 <= (m.radius as f64).powi(2)).then_some((d2, m.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}
