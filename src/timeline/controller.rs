//! The timeline context object.
//!
//! `TimelineController` owns the record store, lane order, scale, viewport,
//! render elements, mode machine, selection, rerank timer and playback
//! sessions. The UI feeds it `ViewInput` events and a per-frame `tick`, and
//! reads back element positions and status. Nothing here touches egui.

use super::axis::local_time;
use super::crawl::{CrawlSession, Starfield, STAR_COUNT};
use super::mode::{Mode, ModeEffect, ModeEvent, ModeMachine, TheaterKind};
use super::playback::{PlaybackEntry, PlaybackEvent, StepTiming, TheaterSession};
use super::project_order::{candidate_order, count_by_project, ProjectOrder, SortMode};
use super::render::{LaneFilter, RenderEngine};
use super::rerank::AutoRerankScheduler;
use super::scale::TimeScale;
use super::selection::{BrushRect, BrushState, SelectionSet};
use super::transform::{interpret_wheel, ScaleBounds, Transform, TransformChange, WheelGesture};
use super::types::{Rating, RatingAction, Record, RecordId, RecordStore, TimeWindow, DAY_MS, HOUR_MS};
use super::viewport::{Viewport, ViewportState};
use chrono::{FixedOffset, NaiveDate, TimeZone};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// Keyboard pan distance, multiplied by the current scale.
pub const KEY_PAN_PX: f64 = 200.0;
pub const KEY_SCROLL_PX: f64 = 200.0;
pub const KEY_ZOOM_IN: f64 = 1.5;
pub const KEY_ZOOM_OUT: f64 = 0.67;
pub const THEATER_TEXT_SCROLL_PX: f32 = 50.0;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub rerank_debounce: Duration,
    pub scale_bounds: ScaleBounds,
    pub min_step: Duration,
    pub final_hold: Duration,
    pub theater_duration: Duration,
    pub replay_speedup: f64,
    pub domain_buffer_ms: f64,
    pub pan_margin_fraction: f64,
    pub max_visible_projects: usize,
    pub rerank_resumes_after_manual_sort: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rerank_debounce: Duration::from_millis(500),
            scale_bounds: ScaleBounds::default(),
            min_step: Duration::from_millis(300),
            final_hold: Duration::from_millis(2000),
            theater_duration: Duration::from_secs(120),
            replay_speedup: 10.0,
            domain_buffer_ms: DAY_MS,
            pan_margin_fraction: 0.1,
            max_visible_projects: 999,
            rerank_resumes_after_manual_sort: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    ZoomIn,
    ZoomOut,
    ToggleSelection,
    Rate(u8),
    Space,
    Escape,
}

/// Input events in timeline-area coordinates (x from the left edge of the
/// plot, y from the top of the visible lane area).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewInput {
    Wheel(WheelGesture),
    Pinch { factor: f64, focal_x: f64 },
    DragStart { x: f64, y: f64 },
    DragMove { x: f64, y: f64, dx: f64, dy: f64 },
    DragEnd,
    Click { x: f64, y: f64 },
    SecondaryClick { x: f64, y: f64 },
    Key(Key),
    Resize { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSource {
    Theater,
    Crawl,
    Detail,
}

/// A local rating mutation that still has to be written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingChange {
    pub id: RecordId,
    pub rating: Option<Rating>,
    pub source: RatingSource,
}

/// Colour band of the visible-project badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeLevel {
    Comfortable,
    Crowded,
    Overloaded,
}

impl BadgeLevel {
    pub fn for_count(count: usize) -> Self {
        if count < 12 {
            BadgeLevel::Comfortable
        } else if count <= 16 {
            BadgeLevel::Crowded
        } else {
            BadgeLevel::Overloaded
        }
    }
}

fn local_midnight_ms(date: NaiveDate, offset: FixedOffset) -> f64 {
    date.and_hms_opt(0, 0, 0)
        .and_then(|dt| offset.from_local_datetime(&dt).single())
        .map(|dt| dt.timestamp_millis() as f64)
        .unwrap_or(0.0)
}

fn local_date(timestamp_ms: i64, offset: FixedOffset) -> Option<NaiveDate> {
    local_time(timestamp_ms, offset).map(|dt| dt.date_naive())
}

/// Opening view: 23:00 the day before `focus` through 01:00 the day after,
/// or one hour past now when `focus` is today.
pub fn initial_window(focus: NaiveDate, now_ms: i64, offset: FixedOffset) -> TimeWindow {
    let midnight = local_midnight_ms(focus, offset);
    let start = midnight - HOUR_MS;
    let end = if local_date(now_ms, offset) == Some(focus) {
        now_ms as f64 + HOUR_MS
    } else {
        midnight + DAY_MS + HOUR_MS
    };
    TimeWindow::new(start, end)
}

pub struct TimelineController {
    config: EngineConfig,
    offset: FixedOffset,
    focus_date: NaiveDate,
    now_ms: i64,

    store: RecordStore,
    order: ProjectOrder,
    scale: TimeScale,
    viewport: Viewport,
    viewport_state: ViewportState,
    render: RenderEngine,

    modes: ModeMachine,
    zoom_pan_enabled: bool,
    brush_enabled: bool,
    brush: BrushState,
    selection: SelectionSet,
    rerank: AutoRerankScheduler,

    theater: Option<TheaterSession>,
    crawl: Option<CrawlSession>,
    starfield: Option<Starfield>,
    rng: StdRng,

    project_filter: Option<String>,
    max_visible_projects: usize,
    detail: Option<RecordId>,
    outbox: Vec<RatingChange>,
}

impl TimelineController {
    pub fn new(
        records: Vec<Record>,
        config: EngineConfig,
        focus_date: Option<NaiveDate>,
        size: (f64, f64),
        offset: FixedOffset,
        now_ms: i64,
    ) -> Self {
        let store = RecordStore::new(records);
        let focus_date = focus_date
            .or_else(|| store.time_bounds().and_then(|(_, max)| local_date(max, offset)))
            .or_else(|| local_date(now_ms, offset))
            .unwrap_or_default();
        let order = ProjectOrder::by_total_count(store.iter());
        let scale = TimeScale::for_records(
            store.time_bounds(),
            config.domain_buffer_ms,
            local_midnight_ms(focus_date, offset),
            size.0,
        );
        let viewport = Viewport::new(size.0, size.1, config.scale_bounds);
        let rerank = AutoRerankScheduler::new(config.rerank_debounce, config.rerank_resumes_after_manual_sort);
        let max_visible_projects = config.max_visible_projects.max(1);

        let mut controller = Self {
            config,
            offset,
            focus_date,
            now_ms,
            store,
            order,
            scale,
            viewport,
            viewport_state: ViewportState::default(),
            render: RenderEngine::new(offset),
            modes: ModeMachine::default(),
            zoom_pan_enabled: true,
            brush_enabled: false,
            brush: BrushState::default(),
            selection: SelectionSet::default(),
            rerank,
            theater: None,
            crawl: None,
            starfield: None,
            rng: StdRng::from_entropy(),
            project_filter: None,
            max_visible_projects,
            detail: None,
            outbox: Vec::new(),
        };
        controller.rebuild_render();
        let window = initial_window(focus_date, now_ms, offset);
        controller.viewport.set_transform(Transform::fit_window(
            &controller.scale,
            window,
            controller.viewport.width,
            controller.config.scale_bounds,
        ));
        controller.render.reposition(&controller.scale, &controller.viewport);
        tracing::info!(
            "Timeline ready: {} records, {} projects, focus {}",
            controller.store.len(),
            controller.order.len(),
            focus_date
        );
        controller
    }

    // --- accessors -------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn focus_date(&self) -> NaiveDate {
        self.focus_date
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn order(&self) -> &ProjectOrder {
        &self.order
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn render(&self) -> &RenderEngine {
        &self.render
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn selection_toggle(&self) -> bool {
        self.modes.selection_toggle()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Brush rectangle in content coordinates while a brush is in progress.
    pub fn brush_rect(&self) -> Option<BrushRect> {
        self.brush.rect()
    }

    pub fn theater(&self) -> Option<&TheaterSession> {
        self.theater.as_ref()
    }

    pub fn crawl(&self) -> Option<&CrawlSession> {
        self.crawl.as_ref()
    }

    pub fn starfield(&self) -> Option<&Starfield> {
        self.starfield.as_ref()
    }

    pub fn detail(&self) -> Option<&Record> {
        self.detail.and_then(|id| self.store.get(id))
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    pub fn project_filter(&self) -> Option<&str> {
        self.project_filter.as_deref()
    }

    pub fn max_visible_projects(&self) -> usize {
        self.max_visible_projects
    }

    pub fn manual_sort_enabled(&self) -> bool {
        self.rerank.manual_sort()
    }

    /// Rating writes accumulated since the last drain.
    pub fn drain_rating_changes(&mut self) -> Vec<RatingChange> {
        std::mem::take(&mut self.outbox)
    }

    // --- status ----------------------------------------------------------

    pub fn visible_window(&self) -> TimeWindow {
        self.viewport.visible_window(&self.scale)
    }

    /// Projects with at least one record in the visible window.
    pub fn visible_project_count(&self) -> usize {
        count_by_project(self.store.in_window(self.visible_window())).len()
    }

    /// Projects that currently have no lane.
    pub fn hidden_project_count(&self) -> usize {
        self.order.len().saturating_sub(self.render.band().domain().len())
    }

    pub fn zoom_percent(&self) -> i64 {
        (self.viewport.transform.scale * 100.0).round() as i64
    }

    /// `Mon D HH:MM → Mon D HH:MM` for the visible window.
    pub fn range_text(&self) -> String {
        let window = self.visible_window();
        let fmt = |t: f64| {
            local_time(t.round() as i64, self.offset)
                .map(|dt| dt.format("%b %-d %H:%M").to_string())
                .unwrap_or_default()
        };
        format!("{} → {}", fmt(window.start), fmt(window.end))
    }

    // --- input reducer ---------------------------------------------------

    /// Apply one input event. Returns true if anything visible changed.
    pub fn handle(&mut self, input: ViewInput, now: Instant) -> bool {
        match input {
            ViewInput::Wheel(gesture) => match interpret_wheel(&gesture) {
                Some(change) if self.zoom_pan_enabled => self.apply_user_change(change, now),
                _ => false,
            },
            ViewInput::Pinch { factor, focal_x } if self.zoom_pan_enabled => {
                self.apply_user_change(TransformChange::Zoom { factor, focal_x }, now)
            }
            ViewInput::Pinch { .. } => false,
            ViewInput::DragStart { x, y } => {
                if self.brush_enabled {
                    self.brush.begin(x, y + self.viewport.scroll_top);
                    true
                } else {
                    false
                }
            }
            ViewInput::DragMove { x, y, dx, dy } => {
                if self.brush_enabled {
                    self.brush.update(x, y + self.viewport.scroll_top);
                    true
                } else if self.zoom_pan_enabled {
                    self.viewport
                        .drag_by(dx, dy, self.scale.range_width(), self.config.pan_margin_fraction);
                    self.after_user_transform(now);
                    true
                } else {
                    false
                }
            }
            ViewInput::DragEnd => self.finish_brush(),
            ViewInput::Click { x, y } => self.click(x, y, now),
            ViewInput::SecondaryClick { x, y } => self.secondary_click(x, y),
            ViewInput::Key(key) => self.key(key, now),
            ViewInput::Resize { width, height } => self.resize(width, height),
        }
    }

    fn apply_user_change(&mut self, change: TransformChange, now: Instant) -> bool {
        self.viewport.apply_change(change);
        self.after_user_transform(now);
        true
    }

    /// Every user transform change repositions and rearms the rerank timer.
    fn after_user_transform(&mut self, now: Instant) {
        self.render.reposition(&self.scale, &self.viewport);
        self.rerank.arm(now, self.modes.mode());
    }

    fn finish_brush(&mut self) -> bool {
        if !self.brush_enabled {
            return false;
        }
        let Some(rect) = self.brush.finish() else {
            return false;
        };
        let ids = self.render.markers_in_rect(&rect);
        tracing::debug!("Brush selected {} records", ids.len());
        self.selection.replace(ids);
        self.render.set_selected(&self.selection);
        true
    }

    fn click(&mut self, x: f64, y: f64, now: Instant) -> bool {
        if self.modes.mode() != Mode::Normal {
            return false;
        }
        match self.render.marker_at(x, y + self.viewport.scroll_top) {
            Some(id) => self.transition(ModeEvent::ClickMarker, Some(id), now),
            None => false,
        }
    }

    fn secondary_click(&mut self, x: f64, y: f64) -> bool {
        if self.modes.mode() != Mode::Normal {
            return false;
        }
        match self.render.marker_at(x, y + self.viewport.scroll_top) {
            Some(id) => {
                self.detail = Some(id);
                true
            }
            None => false,
        }
    }

    fn key(&mut self, key: Key, now: Instant) -> bool {
        match self.modes.mode() {
            Mode::Normal | Mode::Selection => self.timeline_key(key, now),
            Mode::Theater => self.theater_key(key, now),
            Mode::Crawl => self.crawl_key(key, now),
        }
    }

    fn timeline_key(&mut self, key: Key, now: Instant) -> bool {
        let k = self.viewport.transform.scale;
        let center = self.viewport.center_x();
        match key {
            Key::Left => self.apply_user_change(TransformChange::Pan { dx: KEY_PAN_PX * k }, now),
            Key::Right => self.apply_user_change(TransformChange::Pan { dx: -KEY_PAN_PX * k }, now),
            Key::Up => {
                self.viewport.scroll_by(-KEY_SCROLL_PX);
                true
            }
            Key::Down => {
                self.viewport.scroll_by(KEY_SCROLL_PX);
                true
            }
            Key::ZoomIn => self.apply_user_change(
                TransformChange::Zoom {
                    factor: KEY_ZOOM_IN,
                    focal_x: center,
                },
                now,
            ),
            Key::ZoomOut => self.apply_user_change(
                TransformChange::Zoom {
                    factor: KEY_ZOOM_OUT,
                    focal_x: center,
                },
                now,
            ),
            Key::ToggleSelection => self.toggle_selection(now),
            Key::Escape => {
                let closed = self.detail.take().is_some();
                let exited = self.modes.mode() == Mode::Selection && self.exit(now);
                closed || exited
            }
            Key::Rate(_) | Key::Space => false,
        }
    }

    fn theater_key(&mut self, key: Key, now: Instant) -> bool {
        match key {
            Key::Escape => self.exit(now),
            Key::Rate(value) => self.rate_current(value).is_some(),
            _ => {
                let Some(session) = self.theater.as_mut() else {
                    return false;
                };
                match key {
                    Key::Left => session.navigate(-1),
                    Key::Right => session.navigate(1),
                    Key::Up => {
                        session.scroll_text(-THEATER_TEXT_SCROLL_PX);
                        true
                    }
                    Key::Down => {
                        session.scroll_text(THEATER_TEXT_SCROLL_PX);
                        true
                    }
                    Key::Space => {
                        session.toggle(now);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    fn crawl_key(&mut self, key: Key, now: Instant) -> bool {
        match key {
            Key::Escape => self.exit(now),
            Key::Rate(value) => self.rate_current(value).is_some(),
            Key::Up => self.crawl.as_mut().map_or(false, |c| c.navigate(-1, now)),
            Key::Down => self.crawl.as_mut().map_or(false, |c| c.navigate(1, now)),
            _ => false,
        }
    }

    // --- per-frame -------------------------------------------------------

    /// Advance timers: auto-rerank, theater autoplay, starfield, now line.
    pub fn tick(&mut self, now: Instant, now_ms: i64) {
        self.now_ms = now_ms;
        self.render.set_now(now_ms, &self.scale, &self.viewport);

        if self.rerank.poll(now, self.modes.mode()) {
            self.run_rerank();
        }
        if let Some(session) = self.theater.as_mut() {
            match session.tick(now) {
                Some(PlaybackEvent::Advanced(i)) => tracing::debug!("Theater step {}/{}", i + 1, session.len()),
                Some(PlaybackEvent::Finished) => tracing::info!("Theater playback finished"),
                None => {}
            }
        }
        if let Some(field) = self.starfield.as_mut() {
            field.step(&mut self.rng);
        }
    }

    fn run_rerank(&mut self) {
        let window = self.visible_window();
        let candidate = candidate_order(&count_by_project(self.store.in_window(window)));
        if !self.order.smart_rerank(&candidate, self.max_visible_projects) {
            return;
        }
        let filter = LaneFilter {
            project: self.project_filter.as_deref(),
            max_visible: self.max_visible_projects,
        };
        self.render
            .reposition_vertical(&self.store, &self.order, filter, &self.scale, &mut self.viewport);
    }

    // --- structural rebuilds ----------------------------------------------

    fn rebuild_render(&mut self) {
        let filter = LaneFilter {
            project: self.project_filter.as_deref(),
            max_visible: self.max_visible_projects,
        };
        self.render.rebuild(
            &self.store,
            &self.order,
            filter,
            &self.scale,
            &mut self.viewport,
            self.now_ms,
            Some(self.focus_date),
        );
        self.render.set_selected(&self.selection);
    }

    /// Run a structural change between a viewport save and restore so the
    /// visible window is unchanged from the outside.
    fn structural<F: FnOnce(&mut Self)>(&mut self, change: F) {
        self.viewport_state.save(&self.viewport, &self.scale);
        change(self);
        self.rebuild_render();
        self.viewport_state.restore(&mut self.viewport, &self.scale);
        self.render.reposition(&self.scale, &self.viewport);
    }

    fn resize(&mut self, width: f64, height: f64) -> bool {
        if width == self.viewport.width && height == self.viewport.height {
            return false;
        }
        let focus_ms = local_midnight_ms(self.focus_date, self.offset);
        self.structural(|c| {
            c.viewport.width = width;
            c.viewport.height = height;
            c.scale = TimeScale::for_records(c.store.time_bounds(), c.config.domain_buffer_ms, focus_ms, width);
        });
        if let Some(field) = self.starfield.as_mut() {
            field.resize(width as f32, height as f32);
        }
        true
    }

    /// Toggle count/alphabetical ordering of the visible projects. Latches manual sort.
    pub fn manual_reorder(&mut self) -> SortMode {
        self.rerank.note_manual_sort();
        let window = self.visible_window();
        let mut sort_mode = self.order.sort_mode();
        self.structural(|c| {
            sort_mode = c.order.toggle_manual_sort(c.store.iter(), window);
        });
        tracing::info!("Manual reorder: {}", sort_mode.label());
        sort_mode
    }

    pub fn set_project_filter(&mut self, project: Option<String>) {
        if self.project_filter == project {
            return;
        }
        tracing::debug!("Project filter: {:?}", project);
        self.structural(|c| c.project_filter = project);
    }

    pub fn set_max_visible_projects(&mut self, max: usize) {
        let max = max.max(1);
        if self.max_visible_projects == max {
            return;
        }
        self.structural(|c| c.max_visible_projects = max);
    }

    /// Jump the view to `window` as a user transform change.
    pub fn fit_window(&mut self, window: TimeWindow, now: Instant) -> bool {
        if self.modes.mode().is_playback() {
            return false;
        }
        self.viewport.set_transform(Transform::fit_window(
            &self.scale,
            window,
            self.viewport.width,
            self.config.scale_bounds,
        ));
        self.after_user_transform(now);
        true
    }

    /// Refocus on another date's opening window.
    pub fn go_to_date(&mut self, date: NaiveDate, now: Instant) -> bool {
        if self.modes.mode().is_playback() {
            return false;
        }
        self.focus_date = date;
        self.rebuild_render();
        self.fit_window(initial_window(date, self.now_ms, self.offset), now)
    }

    // --- modes -----------------------------------------------------------

    pub fn toggle_selection(&mut self, now: Instant) -> bool {
        self.transition(ModeEvent::ToggleSelection, None, now)
    }

    pub fn play_selection(&mut self, now: Instant) -> bool {
        self.selection_transition(ModeEvent::PlaySelection, now)
    }

    pub fn replay_selection(&mut self, now: Instant) -> bool {
        self.selection_transition(ModeEvent::ReplaySelection, now)
    }

    pub fn crawl_selection(&mut self, now: Instant) -> bool {
        self.selection_transition(ModeEvent::CrawlSelection, now)
    }

    pub fn exit(&mut self, now: Instant) -> bool {
        self.transition(ModeEvent::Exit, None, now)
    }

    fn selection_transition(&mut self, event: ModeEvent, now: Instant) -> bool {
        if self.selection.is_empty() {
            tracing::info!("{:?} ignored: nothing selected", event);
            return false;
        }
        self.transition(event, None, now)
    }

    fn transition(&mut self, event: ModeEvent, clicked: Option<RecordId>, now: Instant) -> bool {
        let Some(transition) = self.modes.handle(event) else {
            return false;
        };
        for effect in transition.effects {
            self.apply_effect(effect, clicked, now);
        }
        true
    }

    fn apply_effect(&mut self, effect: ModeEffect, clicked: Option<RecordId>, now: Instant) {
        match effect {
            ModeEffect::DisableZoomPan => {
                self.zoom_pan_enabled = false;
                self.rerank.cancel();
            }
            ModeEffect::EnableZoomPan => self.zoom_pan_enabled = true,
            ModeEffect::InstallBrush => {
                self.brush.cancel();
                self.brush_enabled = true;
            }
            ModeEffect::RemoveBrush => {
                self.brush.cancel();
                self.brush_enabled = false;
            }
            ModeEffect::ClearSelection => {
                self.selection.clear();
                self.render.set_selected(&self.selection);
            }
            ModeEffect::ResetSelectionToggle => tracing::debug!("Selection toggle reset"),
            ModeEffect::StartTheater(kind) => self.start_theater(kind, clicked, now),
            ModeEffect::StopTheater => self.theater = None,
            ModeEffect::StartCrawl => self.start_crawl(now),
            ModeEffect::StopCrawl => {
                self.crawl = None;
                self.starfield = None;
            }
        }
    }

    fn start_theater(&mut self, kind: TheaterKind, clicked: Option<RecordId>, now: Instant) {
        let (records, start) = match kind {
            TheaterKind::FromMarker => {
                let all = self.store.all_sorted_by_time();
                let start = clicked
                    .and_then(|id| all.iter().position(|r| r.id == id))
                    .unwrap_or(0);
                (all, start)
            }
            TheaterKind::Selection | TheaterKind::Replay => (self.store.sorted_by_time(self.selection.iter()), 0),
        };
        let entries = PlaybackEntry::from_records(&records);
        let target = match kind {
            TheaterKind::Replay => {
                let span = match (entries.first(), entries.last()) {
                    (Some(first), Some(last)) => (last.timestamp - first.timestamp) as f64,
                    _ => 0.0,
                };
                let speedup = if self.config.replay_speedup > 0.0 {
                    self.config.replay_speedup
                } else {
                    1.0
                };
                Duration::from_secs_f64(span / speedup / 1000.0)
            }
            _ => self.config.theater_duration,
        };
        let timing = StepTiming {
            target,
            min_step: self.config.min_step,
            final_hold: self.config.final_hold,
        };
        let mut session = TheaterSession::new(entries, start, timing);
        if kind == TheaterKind::FromMarker {
            if let Some(session) = session.as_mut() {
                session.play(now);
            }
        }
        tracing::info!(
            "Theater ({:?}) over {} records, target {:?}",
            kind,
            session.as_ref().map_or(0, |s| s.len()),
            target
        );
        self.theater = session;
    }

    fn start_crawl(&mut self, now: Instant) {
        let records = self.store.sorted_by_time(self.selection.iter());
        let entries = PlaybackEntry::from_records(&records);
        self.crawl = CrawlSession::new(entries);
        if let Some(crawl) = self.crawl.as_mut() {
            crawl.highlight(0, now);
        }
        self.starfield = Some(Starfield::new(
            &mut self.rng,
            self.viewport.width as f32,
            self.viewport.height as f32,
            STAR_COUNT,
        ));
        tracing::info!("Crawl over {} records", self.crawl.as_ref().map_or(0, |c| c.len()));
    }

    // --- playback controls for the UI ------------------------------------

    pub fn theater_toggle_autoplay(&mut self, now: Instant) -> bool {
        self.theater.as_mut().map_or(false, |s| s.toggle(now))
    }

    pub fn theater_navigate(&mut self, delta: isize) -> bool {
        self.theater.as_mut().map_or(false, |s| s.navigate(delta))
    }

    pub fn theater_take_text_scroll_request(&mut self) -> Option<f32> {
        self.theater.as_mut().and_then(|s| s.take_text_scroll_request())
    }

    pub fn theater_sync_text_scroll(&mut self, offset: f32) {
        if let Some(session) = self.theater.as_mut() {
            session.sync_text_scroll(offset);
        }
    }

    pub fn crawl_highlight(&mut self, index: usize, now: Instant) -> bool {
        self.crawl.as_mut().map_or(false, |c| c.highlight(index, now))
    }

    pub fn crawl_observe_center(&mut self, index: usize, offset: f32, now: Instant) -> bool {
        self.crawl.as_mut().map_or(false, |c| c.observe_center(index, offset, now))
    }

    pub fn crawl_take_scroll_request(&mut self) -> Option<usize> {
        self.crawl.as_mut().and_then(|c| c.take_scroll_request())
    }

    // --- ratings ---------------------------------------------------------

    /// Rate the record focused by the active playback mode, toggling off a repeat.
    pub fn rate_current(&mut self, value: u8) -> Option<RatingChange> {
        let (id, source) = match self.modes.mode() {
            Mode::Theater => (self.theater.as_ref()?.current()?.id, RatingSource::Theater),
            Mode::Crawl => (self.crawl.as_ref()?.current()?.id, RatingSource::Crawl),
            _ => return None,
        };
        self.rate_record(id, value, RatingAction::Toggle, source)
    }

    /// Set the detail panel record's rating (no toggle).
    pub fn rate_detail(&mut self, value: u8) -> Option<RatingChange> {
        let id = self.detail?;
        self.rate_record(id, value, RatingAction::Set, RatingSource::Detail)
    }

    /// Optimistic local rating change; the write-back is queued in the outbox.
    pub fn rate_record(
        &mut self,
        id: RecordId,
        value: u8,
        action: RatingAction,
        source: RatingSource,
    ) -> Option<RatingChange> {
        let requested = Rating::new(value)?;
        let current = self.store.get(id)?.rating;
        let rating = action.resolve(current, requested);
        self.store.set_rating(id, rating);
        self.render.update_marker_rating(id, rating);
        let change = RatingChange { id, rating, source };
        self.outbox.push(change);
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// 2023-11-14 22:13:20 UTC
    const T: i64 = 1_700_000_000_000;
    const H: i64 = 3_600_000;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn rec(id: RecordId, ts: i64, project: &str) -> Record {
        Record {
            id,
            timestamp: ts,
            display: format!("prompt {}", id),
            project: Some(project.to_string()),
            rating: None,
            note: None,
        }
    }

    fn controller(records: Vec<Record>) -> TimelineController {
        TimelineController::new(records, EngineConfig::default(), None, (1000.0, 400.0), utc(), T)
    }

    fn scenario() -> TimelineController {
        controller(vec![rec(1, T, "a"), rec(2, T + H, "a"), rec(3, T + 5 * H, "b")])
    }

    fn window(start: i64, end: i64) -> TimeWindow {
        TimeWindow::new(start as f64, end as f64)
    }

    fn order(c: &TimelineController) -> Vec<&str> {
        c.order().as_slice().iter().map(String::as_str).collect()
    }

    fn marker_pos(c: &TimelineController, id: RecordId) -> (f64, f64) {
        let m = c.render().marker(id).unwrap();
        (m.x, m.y.unwrap() - c.viewport().scroll_top)
    }

    #[test]
    fn opens_on_evening_before_focus_day() {
        let c = five_in_one_lane();
        let w = c.visible_window();
        // 2023-11-13 23:00 UTC
        assert!((w.start - 1_699_916_400_000.0).abs() < 1.0);
        // Focus day is today: one hour past now
        assert!((w.end - (T + H) as f64).abs() < 1.0);
    }

    #[test]
    fn past_focus_day_spans_twenty_six_hours() {
        // Newest record falls on 2023-11-15
        let c = scenario();
        assert_eq!(c.focus_date(), NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
        let w = c.visible_window();
        assert!((w.start - 1_700_002_800_000.0).abs() < 1.0);
        assert!((w.span() - 26.0 * H as f64).abs() < 1.0);
    }

    #[test]
    fn rerank_swaps_lanes_when_only_second_project_visible() {
        let t0 = Instant::now();
        let mut c = scenario();
        assert_eq!(order(&c), vec!["a", "b"]);

        assert!(c.fit_window(window(T + 9 * H / 2, T + 11 * H / 2), t0));
        c.tick(t0 + Duration::from_millis(499), T);
        assert_eq!(order(&c), vec!["a", "b"]);
        c.tick(t0 + Duration::from_millis(500), T);
        assert_eq!(order(&c), vec!["b", "a"]);
        // Vertical only: the transform is untouched
        assert!(c.render().marker(3).unwrap().y.unwrap() < c.render().marker(1).unwrap().y.unwrap());
    }

    #[test]
    fn rerank_keeps_order_when_counts_tie() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.fit_window(window(T + H / 2, T + 11 * H / 2), t0);
        c.tick(t0 + Duration::from_secs(1), T);
        assert_eq!(order(&c), vec!["a", "b"]);
    }

    #[test]
    fn rerank_never_fires_in_selection_mode() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.fit_window(window(T + 9 * H / 2, T + 11 * H / 2), t0);
        c.toggle_selection(t0);
        c.tick(t0 + Duration::from_secs(1), T);
        assert_eq!(order(&c), vec!["a", "b"]);
        // Keyboard pan in selection mode does not arm it either
        c.handle(ViewInput::Key(Key::Left), t0);
        c.tick(t0 + Duration::from_secs(2), T);
        assert_eq!(order(&c), vec!["a", "b"]);
    }

    #[test]
    fn manual_sort_disables_auto_rerank() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.fit_window(window(T + 9 * H / 2, T + 11 * H / 2), t0);
        c.manual_reorder();
        assert!(c.manual_sort_enabled());
        let after_manual = order(&c).into_iter().map(String::from).collect::<Vec<_>>();
        c.handle(ViewInput::Key(Key::Right), t0);
        c.tick(t0 + Duration::from_secs(5), T);
        assert_eq!(order(&c), after_manual.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn structural_changes_keep_viewport() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.fit_window(window(T, T + 2 * H), t0);
        let before = c.viewport().transform;
        c.set_project_filter(Some("b".into()));
        assert_eq!(c.viewport().transform, before);
        assert_eq!(c.render().lane_labels().len(), 1);
        c.set_project_filter(None);
        c.set_max_visible_projects(1);
        assert_eq!(c.viewport().transform, before);
        assert_eq!(c.hidden_project_count(), 1);
        c.manual_reorder();
        assert_eq!(c.viewport().transform, before);
    }

    #[test]
    fn resize_keeps_left_edge_and_density() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.fit_window(window(T, T + 2 * H), t0);
        let before = c.visible_window();
        assert!(c.handle(ViewInput::Resize { width: 1500.0, height: 400.0 }, t0));
        let after = c.visible_window();
        assert!((after.start - before.start).abs() < 1.0);
        assert!((after.span() - before.span() * 1.5).abs() < 10.0);
    }

    #[test]
    fn keyboard_pan_scales_with_zoom() {
        let t0 = Instant::now();
        let mut c = scenario();
        let before = c.viewport().transform;
        c.handle(ViewInput::Key(Key::Right), t0);
        let after = c.viewport().transform;
        assert!((after.translate_x - (before.translate_x - 200.0 * before.scale)).abs() < 1e-9);
        c.handle(ViewInput::Key(Key::ZoomIn), t0);
        assert!((c.viewport().transform.scale - before.scale * 1.5).abs() < 1e-9);
    }

    fn five_in_one_lane() -> TimelineController {
        controller((0..5).map(|i| rec(i + 1, T - 10 * H + i * H, "p")).collect())
    }

    fn brush_around(c: &mut TimelineController, ids: &[RecordId], t0: Instant) {
        let xs: Vec<f64> = ids.iter().map(|&id| marker_pos(c, id).0).collect();
        let y = marker_pos(c, ids[0]).1;
        let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        c.handle(ViewInput::DragStart { x: min_x - 2.0, y: y - 2.0 }, t0);
        c.handle(
            ViewInput::DragMove {
                x: max_x + 2.0,
                y: y + 2.0,
                dx: 0.0,
                dy: 0.0,
            },
            t0,
        );
        c.handle(ViewInput::DragEnd, t0);
    }

    #[test]
    fn brush_selection_feeds_theater_in_time_order() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        assert!(c.toggle_selection(t0));
        let before = c.viewport().transform;
        brush_around(&mut c, &[4, 3], t0);
        assert_eq!(c.selection().iter().collect::<Vec<_>>(), vec![3, 4]);
        // Dragging in selection mode never pans
        assert_eq!(c.viewport().transform, before);

        assert!(c.play_selection(t0));
        assert_eq!(c.mode(), Mode::Theater);
        let session = c.theater().unwrap();
        let ids: Vec<RecordId> = session.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(!session.is_playing());

        assert!(c.handle(ViewInput::Key(Key::Escape), t0));
        assert_eq!(c.mode(), Mode::Normal);
        assert!(c.selection().is_empty());
        assert!(!c.selection_toggle());
        assert!(c.theater().is_none());
    }

    #[test]
    fn new_brush_replaces_previous_selection() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        c.toggle_selection(t0);
        brush_around(&mut c, &[1, 2], t0);
        brush_around(&mut c, &[5], t0);
        assert_eq!(c.selection().iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn crawl_rating_toggles_off_on_repeat() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        c.toggle_selection(t0);
        brush_around(&mut c, &[2, 3], t0);
        assert!(c.crawl_selection(t0));
        assert!(c.starfield().is_some());
        assert_eq!(c.crawl().unwrap().current().map(|e| e.id), Some(2));

        c.handle(ViewInput::Key(Key::Rate(4)), t0);
        assert_eq!(c.store().get(2).unwrap().rating, Rating::new(4));
        c.handle(ViewInput::Key(Key::Rate(4)), t0);
        assert_eq!(c.store().get(2).unwrap().rating, None);
        assert_eq!(c.render().marker(2).unwrap().tier, crate::timeline::types::RatingTier::Unrated);

        let changes = c.drain_rating_changes();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|ch| ch.source == RatingSource::Crawl));
        assert_eq!(changes[1].rating, None);

        c.exit(t0);
        assert!(c.starfield().is_none());
        assert!(c.crawl().is_none());
    }

    #[test]
    fn empty_selection_cannot_start_playback() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        assert!(!c.play_selection(t0));
        assert!(!c.crawl_selection(t0));
        assert_eq!(c.mode(), Mode::Normal);
    }

    #[test]
    fn marker_click_plays_everything_from_clicked_record() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        let (x, y) = marker_pos(&c, 2);
        assert!(c.handle(ViewInput::Click { x, y }, t0));
        assert_eq!(c.mode(), Mode::Theater);
        let session = c.theater().unwrap();
        assert_eq!(session.len(), 5);
        assert_eq!(session.current().map(|e| e.id), Some(2));
        assert!(session.is_playing());

        // Theater rating reaches the main marker
        c.handle(ViewInput::Key(Key::Rate(5)), t0);
        assert_eq!(c.render().marker(2).unwrap().tier, crate::timeline::types::RatingTier::High);

        // Arrow stops autoplay
        c.handle(ViewInput::Key(Key::Right), t0);
        assert!(!c.theater().unwrap().is_playing());
        assert_eq!(c.theater().unwrap().current().map(|e| e.id), Some(3));
    }

    #[test]
    fn detail_panel_sets_rating_and_closes_on_escape() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        let (x, y) = marker_pos(&c, 1);
        assert!(c.handle(ViewInput::SecondaryClick { x, y }, t0));
        assert_eq!(c.detail().map(|r| r.id), Some(1));
        c.rate_detail(3);
        c.rate_detail(3);
        assert_eq!(c.store().get(1).unwrap().rating, Rating::new(3));
        c.handle(ViewInput::Key(Key::Escape), t0);
        assert!(c.detail().is_none());
    }

    #[test]
    fn wheel_is_ignored_outside_normal_mode() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.toggle_selection(t0);
        let before = c.viewport().transform;
        let gesture = WheelGesture {
            delta_x: 0.0,
            delta_y: -50.0,
            unit: crate::timeline::transform::WheelUnit::Pixel,
            modifier: false,
            focal_x: 10.0,
        };
        assert!(!c.handle(ViewInput::Wheel(gesture), t0));
        assert_eq!(c.viewport().transform, before);
    }

    #[test]
    fn replay_targets_a_tenth_of_real_span() {
        let t0 = Instant::now();
        let mut c = five_in_one_lane();
        c.toggle_selection(t0);
        brush_around(&mut c, &[1, 2, 3], t0);
        assert!(c.replay_selection(t0));
        let timing = c.theater().unwrap().timing();
        assert_eq!(timing.target, Duration::from_secs(2 * 3600 / 10));
    }

    #[test]
    fn empty_store_uses_default_domain() {
        let c = controller(Vec::new());
        assert!(c.store().is_empty());
        assert!(c.scale().domain().span() > 0.0);
        assert_eq!(c.visible_project_count(), 0);
        assert_eq!(BadgeLevel::for_count(0), BadgeLevel::Comfortable);
        assert_eq!(BadgeLevel::for_count(16), BadgeLevel::Crowded);
        assert_eq!(BadgeLevel::for_count(17), BadgeLevel::Overloaded);
    }

    #[test]
    fn range_text_is_compact() {
        let t0 = Instant::now();
        let mut c = scenario();
        c.fit_window(window(T - 13 * 60_000 - 20_000, T + 2 * H), t0);
        assert_eq!(c.range_text(), "Nov 14 22:00 → Nov 15 00:13");
    }
}
