//! Main application state and UI.

use crate::api::{ApiClient, HttpRatingSink, NullRatingSink, RatingSink, WriteOutcome};
use crate::export;
use crate::local_ratings::LocalRatings;
use crate::settings::Settings;
use crate::theme;
use crate::timeline::axis::local_time;
use crate::timeline::controller::{BadgeLevel, Key, ViewInput};
use crate::timeline::playback::TheaterStrip;
use crate::timeline::render::LANE_TOP;
use crate::timeline::transform::{WheelGesture, WheelUnit};
use crate::timeline::types::short_project_name;
use crate::timeline::{Mode, Rating, RatingSource, Record, TimelineController};
use chrono::{Days, FixedOffset, NaiveDate};
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

/// Width of the lane label column left of the plot
const LABEL_WIDTH: f32 = 140.0;
const TOOLTIP_CHARS: usize = 300;
const STRIP_HEIGHT: f32 = 110.0;
const SETTINGS_DEBOUNCE: Duration = Duration::from_secs(2);

/// Startup inputs assembled by `main`.
pub struct AppInit {
    pub records: Vec<Record>,
    pub focus_date: Option<NaiveDate>,
    pub settings: Settings,
    pub local_ratings: LocalRatings,
    /// None when running offline
    pub api: Option<ApiClient>,
    pub offset: FixedOffset,
    pub now_ms: i64,
}

pub struct TimelineApp {
    controller: TimelineController,
    offset: FixedOffset,

    // Rating write-back
    sink: Box<dyn RatingSink>,
    write_outcomes: Option<Receiver<WriteOutcome>>,
    api_base: Option<String>,
    last_write_error: Option<String>,
    local_ratings: LocalRatings,

    // Plot geometry from the previous frame
    plot_size: Option<Vec2>,
    needs_initial_fit: bool,

    status: Option<String>,

    // Settings persistence
    settings: Settings,
    settings_dirty: bool,
    last_settings_save: Instant,
}

impl TimelineApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, init: AppInit) -> Self {
        let AppInit {
            records,
            focus_date,
            settings,
            local_ratings,
            api,
            offset,
            now_ms,
        } = init;

        let mut controller = TimelineController::new(
            records,
            settings.engine_config(),
            focus_date,
            (1200.0, 700.0),
            offset,
            now_ms,
        );
        controller.set_project_filter(settings.project_filter.clone());

        let (sink, write_outcomes, api_base): (Box<dyn RatingSink>, _, _) = match api {
            Some(api) => {
                let base = api.base_url().to_string();
                let (sink, rx) = HttpRatingSink::new(api);
                (Box::new(sink), Some(rx), Some(base))
            }
            None => (Box::new(NullRatingSink), None, None),
        };

        Self {
            controller,
            offset,
            sink,
            write_outcomes,
            api_base,
            last_write_error: None,
            local_ratings,
            plot_size: None,
            needs_initial_fit: true,
            status: None,
            settings,
            settings_dirty: false,
            last_settings_save: Instant::now(),
        }
    }

    /// Mark settings as needing to be saved
    fn mark_settings_dirty(&mut self) {
        self.settings_dirty = true;
    }

    /// Copy current UI state to settings struct
    fn sync_settings_from_ui(&mut self) {
        self.settings.project_filter = self.controller.project_filter().map(String::from);
        self.settings.max_visible_projects = self.controller.max_visible_projects();
    }

    fn save_settings(&mut self) {
        self.sync_settings_from_ui();
        if let Err(e) = self.settings.save() {
            tracing::warn!("Settings not saved: {}", e);
        }
        self.settings_dirty = false;
        self.last_settings_save = Instant::now();
    }

    /// Save settings if dirty and enough time has passed (debounce)
    fn maybe_save_settings(&mut self) {
        if self.settings_dirty && self.last_settings_save.elapsed() >= SETTINGS_DEBOUNCE {
            self.save_settings();
        }
    }

    /// Send queued rating changes and mirror crawl ratings locally.
    fn flush_ratings(&mut self) {
        for change in self.controller.drain_rating_changes() {
            if change.source == RatingSource::Crawl {
                if let Err(e) = self.local_ratings.set(change.id, change.rating) {
                    tracing::warn!("Local rating for prompt {} not stored: {}", change.id, e);
                }
            }
            self.sink.submit(change);
        }
        if let Some(rx) = &self.write_outcomes {
            while let Ok(outcome) = rx.try_recv() {
                self.last_write_error = outcome.error;
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context, now: Instant) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let keys: Vec<Key> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Key {
                        key, pressed: true, ..
                    } => map_key(*key),
                    _ => None,
                })
                .collect()
        });
        for key in keys {
            self.controller.handle(ViewInput::Key(key), now);
        }
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui, now: Instant) {
        ui.horizontal_wrapped(|ui| {
            ui.heading("Prompt Timeline");
            ui.separator();

            let focus = self.controller.focus_date();
            if ui.button("◀").on_hover_text("Previous day").clicked() {
                if let Some(day) = focus.checked_sub_days(Days::new(1)) {
                    self.controller.go_to_date(day, now);
                }
            }
            ui.label(focus.format("%a %b %-d %Y").to_string());
            if ui.button("▶").on_hover_text("Next day").clicked() {
                if let Some(day) = focus.checked_add_days(Days::new(1)) {
                    self.controller.go_to_date(day, now);
                }
            }
            ui.separator();

            let mode = self.controller.mode();
            if ui
                .selectable_label(self.controller.selection_toggle(), "Select (s)")
                .clicked()
            {
                self.controller.toggle_selection(now);
            }

            let selected = self.controller.selection().len();
            if selected > 0 && !mode.is_playback() {
                ui.label(format!("{} selected", selected));
                if ui.button("▶ Play").clicked() {
                    self.controller.play_selection(now);
                }
                if ui.button("⏩ Replay ×10").clicked() {
                    self.controller.replay_selection(now);
                }
                if ui.button("✨ Crawl").clicked() {
                    self.controller.crawl_selection(now);
                }
                if ui.button("Export CSV").clicked() {
                    self.export_selection();
                }
            }
            if mode.is_playback() && ui.button("✖ Exit").clicked() {
                self.controller.exit(now);
            }
            ui.separator();

            let next_sort = self.controller.order().sort_mode().toggled();
            if ui
                .button("Reorder")
                .on_hover_text(format!("Sort visible projects: {}", next_sort.label()))
                .clicked()
            {
                self.controller.manual_reorder();
            }

            let current_filter = self.controller.project_filter().map(String::from);
            let mut filter = current_filter.clone();
            egui::ComboBox::from_id_salt("project_filter")
                .selected_text(
                    filter
                        .as_deref()
                        .map(short_project_name)
                        .unwrap_or("All projects"),
                )
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut filter, None, "All projects");
                    for project in self.controller.order().as_slice() {
                        ui.selectable_value(&mut filter, Some(project.clone()), short_project_name(project));
                    }
                });
            if filter != current_filter {
                self.controller.set_project_filter(filter);
                self.mark_settings_dirty();
            }

            let mut max_visible = self.controller.max_visible_projects();
            ui.label("Lanes:");
            if ui
                .add(egui::DragValue::new(&mut max_visible).range(1..=999))
                .changed()
            {
                self.controller.set_max_visible_projects(max_visible);
                self.mark_settings_dirty();
            }
            ui.separator();

            ui.label(format!("{}%", self.controller.zoom_percent()));
            ui.label(
                egui::RichText::new(self.controller.range_text())
                    .monospace()
                    .color(theme::text::SECONDARY),
            );

            let visible = self.controller.visible_project_count();
            let badge = theme::badge_color(BadgeLevel::for_count(visible));
            ui.add(
                egui::Button::new(egui::RichText::new(format!("{} projects", visible)).color(Color32::WHITE))
                    .fill(badge)
                    .sense(egui::Sense::hover()),
            );
            let hidden = self.controller.hidden_project_count();
            if hidden > 0 {
                ui.label(egui::RichText::new(format!("+{} hidden", hidden)).color(theme::text::MUTED));
            }
            ui.separator();

            match &self.api_base {
                Some(base) if self.last_write_error.is_none() => {
                    ui.colored_label(theme::accent::GREEN, "●").on_hover_text(base.as_str());
                }
                Some(_) => {
                    let err = self.last_write_error.clone().unwrap_or_default();
                    ui.colored_label(theme::accent::RED, "● rating not saved").on_hover_text(err);
                }
                None => {
                    ui.colored_label(theme::text::MUTED, "● offline");
                }
            }
            if let Some(status) = &self.status {
                ui.label(egui::RichText::new(status).color(theme::text::MUTED));
            }
        });
    }

    fn export_selection(&mut self) {
        let dir = match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("No current directory for export: {}", e);
                return;
            }
        };
        let result = export::write_export(
            &dir,
            self.controller.store(),
            self.controller.selection(),
            self.controller.focus_date(),
            self.offset,
        );
        self.status = Some(match result {
            Ok(path) => format!("Exported {}", path.display()),
            Err(e) => {
                tracing::warn!("Export failed: {}", e);
                format!("Export failed: {}", e)
            }
        });
    }

    fn render_timeline(&mut self, ui: &mut egui::Ui, now: Instant) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let plot = Rect::from_min_max(Pos2::new(rect.left() + LABEL_WIDTH, rect.top()), rect.max);

        if self.plot_size != Some(plot.size()) {
            self.plot_size = Some(plot.size());
            self.controller.handle(
                ViewInput::Resize {
                    width: plot.width() as f64,
                    height: plot.height() as f64,
                },
                now,
            );
        }
        if self.needs_initial_fit {
            self.needs_initial_fit = false;
            let focus = self.controller.focus_date();
            self.controller.go_to_date(focus, now);
        }

        let to_local = |p: Pos2| ((p.x - plot.left()) as f64, (p.y - plot.top()) as f64);

        // Wheel and pinch
        if let Some(hover) = response.hover_pos() {
            let (focal_x, _) = to_local(hover);
            let events = ui.input(|i| i.events.clone());
            for event in events {
                match event {
                    egui::Event::MouseWheel { unit, delta, modifiers } => {
                        let gesture = wheel_gesture(unit, delta, modifiers, focal_x);
                        self.controller.handle(ViewInput::Wheel(gesture), now);
                    }
                    egui::Event::Zoom(factor) if factor != 1.0 => {
                        self.controller.handle(
                            ViewInput::Pinch {
                                factor: factor as f64,
                                focal_x,
                            },
                            now,
                        );
                    }
                    _ => {}
                }
            }
        }

        // Drag: pan in Normal mode, brush in Selection mode
        if response.drag_started() {
            if let Some(p) = response.interact_pointer_pos() {
                let (x, y) = to_local(p);
                self.controller.handle(ViewInput::DragStart { x, y }, now);
            }
        }
        if response.dragged() {
            if let Some(p) = response.interact_pointer_pos() {
                let (x, y) = to_local(p);
                let d = response.drag_delta();
                self.controller.handle(
                    ViewInput::DragMove {
                        x,
                        y,
                        dx: d.x as f64,
                        dy: d.y as f64,
                    },
                    now,
                );
            }
        }
        if response.drag_stopped() {
            self.controller.handle(ViewInput::DragEnd, now);
        }
        if let Some(p) = response.interact_pointer_pos() {
            let (x, y) = to_local(p);
            if response.clicked() {
                self.controller.handle(ViewInput::Click { x, y }, now);
            } else if response.secondary_clicked() {
                self.controller.handle(ViewInput::SecondaryClick { x, y }, now);
            }
        }

        self.paint_timeline(&painter, rect, plot);

        // Tooltip for the marker under the pointer
        if let Some(hover) = response.hover_pos() {
            if plot.contains(hover) {
                let (x, y) = to_local(hover);
                let scroll = self.controller.viewport().scroll_top;
                let hit = self
                    .controller
                    .render()
                    .marker_at(x, y + scroll)
                    .and_then(|id| self.controller.store().get(id));
                if let Some(record) = hit {
                    let offset = self.offset;
                    let record = record.clone();
                    response.on_hover_ui_at_pointer(|ui| {
                        ui.set_max_width(420.0);
                        ui.label(egui::RichText::new(format_time(record.timestamp, offset)).strong());
                        ui.label(
                            egui::RichText::new(format!("{} chars", record.display_len()))
                                .color(theme::text::MUTED),
                        );
                        ui.label(truncate_chars(&record.display, TOOLTIP_CHARS));
                    });
                }
            }
        }
    }

    fn paint_timeline(&self, painter: &egui::Painter, rect: Rect, plot: Rect) {
        painter.rect_filled(rect, 0.0, theme::bg::PLOT);
        let render = self.controller.render();
        let scroll = self.controller.viewport().scroll_top as f32;
        let sx = |x: f64| plot.left() + x as f32;
        let sy = |y: f64| plot.top() + y as f32 - scroll;
        let clipped = painter.with_clip_rect(plot);

        for line in render.grid_lines() {
            let x = sx(line.x);
            let (color, width) = if line.midnight {
                (theme::grid::MIDNIGHT, 1.5)
            } else if line.on_focus_day {
                (theme::grid::FOCUS_DAY, 1.0)
            } else {
                (theme::grid::LINE, 1.0)
            };
            clipped.line_segment([Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())], Stroke::new(width, color));
        }

        for track in render.track_lines() {
            let y = sy(track.y);
            clipped.line_segment(
                [Pos2::new(sx(track.x0), y), Pos2::new(sx(track.x1), y)],
                theme::stroke(theme::grid::TRACK, theme::stroke_width::NORMAL),
            );
        }

        for marker in render.markers() {
            let Some(y) = marker.y else { continue };
            let center = Pos2::new(sx(marker.x), sy(y));
            let color = theme::faded(theme::rating_color(marker.tier), marker.opacity);
            clipped.circle_filled(center, marker.radius, color);
            if marker.selected {
                clipped.circle_stroke(
                    center,
                    marker.radius + 1.5,
                    theme::stroke(theme::accent::YELLOW, theme::stroke_width::SELECTED),
                );
            }
        }

        let now_x = sx(render.now_line().x);
        clipped.line_segment(
            [Pos2::new(now_x, plot.top()), Pos2::new(now_x, plot.bottom())],
            theme::stroke(theme::grid::NOW, theme::stroke_width::NOW),
        );

        if let Some(brush) = self.controller.brush_rect() {
            let r = Rect::from_min_max(
                Pos2::new(sx(brush.min_x), sy(brush.min_y)),
                Pos2::new(sx(brush.max_x), sy(brush.max_y)),
            );
            clipped.rect_filled(r, 0.0, theme::bg::BRUSH);
            clipped.rect_stroke(r, 0.0, theme::stroke(theme::accent::YELLOW, 1.0));
        }

        // Fixed axis strip over the scrolled lanes
        let axis = Rect::from_min_size(plot.min, Vec2::new(plot.width(), LANE_TOP as f32));
        clipped.rect_filled(axis, 0.0, theme::bg::PANEL);
        for tick in render.ticks() {
            clipped.text(
                Pos2::new(sx(tick.x), axis.center().y),
                Align2::CENTER_CENTER,
                &tick.tick.label,
                FontId::proportional(11.0),
                theme::text::SECONDARY,
            );
        }

        let labels = painter.with_clip_rect(Rect::from_min_max(
            Pos2::new(rect.left(), plot.top() + LANE_TOP as f32),
            Pos2::new(plot.left(), rect.bottom()),
        ));
        labels.rect_filled(
            Rect::from_min_max(rect.min, Pos2::new(plot.left(), rect.bottom())),
            0.0,
            theme::bg::PANEL,
        );
        for label in render.lane_labels() {
            labels.text(
                Pos2::new(plot.left() - 8.0, sy(label.y + label.height / 2.0)),
                Align2::RIGHT_CENTER,
                &label.label,
                FontId::proportional(12.0),
                theme::text::PRIMARY,
            );
        }
    }

    fn render_theater(&mut self, ui: &mut egui::Ui, now: Instant) {
        let Some(session) = self.controller.theater() else {
            return;
        };
        let index = session.index();
        let len = session.len();
        let playing = session.is_playing();
        let Some(record) = session
            .current()
            .and_then(|e| self.controller.store().get(e.id))
            .cloned()
        else {
            return;
        };
        let strip_width = ui.available_width() as f64;
        let strip = TheaterStrip::build(session, self.controller.store(), strip_width, STRIP_HEIGHT as f64);

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(format!("{} / {}", index + 1, len)).strong());
            if ui.button("◀").clicked() {
                self.controller.theater_navigate(-1);
            }
            if ui.button(if playing { "⏸" } else { "▶" }).clicked() {
                self.controller.theater_toggle_autoplay(now);
            }
            if ui.button("▶|").clicked() {
                self.controller.theater_navigate(1);
            }
            ui.separator();
            self.rating_buttons(ui, record.rating, |c, n| {
                c.rate_current(n);
            });
        });
        ui.label(egui::RichText::new(format_time(record.timestamp, self.offset)).color(theme::text::SECONDARY));
        ui.label(egui::RichText::new(record.project_id()).color(theme::text::MUTED));
        ui.separator();

        let text_height = (ui.available_height() - STRIP_HEIGHT - 16.0).max(80.0);
        let mut text_area = egui::ScrollArea::vertical().max_height(text_height);
        if let Some(offset) = self.controller.theater_take_text_scroll_request() {
            text_area = text_area.vertical_scroll_offset(offset);
        }
        let text_output = text_area.show(ui, |ui| {
            ui.label(egui::RichText::new(&record.display).size(18.0).color(theme::text::PRIMARY));
        });
        self.controller.theater_sync_text_scroll(text_output.state.offset.y);

        ui.add_space(8.0);
        let (resp, painter) =
            ui.allocate_painter(Vec2::new(ui.available_width(), STRIP_HEIGHT), egui::Sense::hover());
        let r = resp.rect;
        painter.rect_filled(r, 4.0, theme::bg::SURFACE);
        for marker in &strip.markers {
            let tier = crate::timeline::RatingTier::of(marker.rating);
            let opacity = if marker.current { 1.0 } else { 0.35 };
            let center = Pos2::new(r.left() + marker.x as f32, r.top() + marker.y as f32);
            painter.circle_filled(center, marker.radius, theme::faded(theme::rating_color(tier), opacity));
            if marker.current {
                painter.circle_stroke(center, marker.radius + 2.0, theme::stroke(Color32::WHITE, 1.5));
            }
        }
    }

    fn render_crawl(&mut self, ui: &mut egui::Ui, now: Instant) {
        let rect = ui.max_rect();
        if let Some(field) = self.controller.starfield() {
            let painter = ui.painter();
            painter.rect_filled(rect, 0.0, theme::bg::STAGE);
            for star in field.stars() {
                painter.circle_filled(
                    Pos2::new(rect.left() + star.x, rect.top() + star.y),
                    star.radius.max(0.3),
                    Color32::WHITE.gamma_multiply(star.opacity),
                );
            }
        }
        let Some(crawl) = self.controller.crawl() else {
            return;
        };
        let current = crawl.current_index();
        let clock = crawl.clock_label(self.offset);
        let entries: Vec<Record> = crawl
            .entries()
            .iter()
            .filter_map(|e| self.controller.store().get(e.id).cloned())
            .collect();
        let scroll_to = self.controller.crawl_take_scroll_request();

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(clock).monospace().size(28.0).color(theme::accent::YELLOW));
            ui.label(format!("{} / {}", current + 1, entries.len()));
            ui.separator();
            let rating = entries.get(current).and_then(|r| r.rating);
            self.rating_buttons(ui, rating, |c, n| {
                c.rate_current(n);
            });
        });

        let mut rects = Vec::with_capacity(entries.len());
        let mut clicked = None;
        let output = egui::ScrollArea::vertical().show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_max_width(720.0);
                for (i, record) in entries.iter().enumerate() {
                    let highlighted = i == current;
                    let frame = egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(16.0, 12.0))
                        .rounding(6.0)
                        .stroke(if highlighted {
                            theme::stroke(theme::accent::YELLOW, 2.0)
                        } else {
                            Stroke::NONE
                        })
                        .fill(theme::faded(theme::bg::SURFACE, 0.85));
                    let resp = frame
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(format_time(record.timestamp, self.offset))
                                    .color(theme::text::MUTED),
                            );
                            ui.label(egui::RichText::new(&record.display).size(16.0).color(theme::text::PRIMARY));
                            if let Some(r) = record.rating {
                                ui.label(stars_label(Some(r)));
                            }
                        })
                        .response
                        .interact(egui::Sense::click());
                    if resp.clicked() {
                        clicked = Some(i);
                    }
                    if scroll_to == Some(i) {
                        resp.scroll_to_me(Some(egui::Align::Center));
                    }
                    rects.push(resp.rect);
                    ui.add_space(24.0);
                }
            });
        });

        if let Some(i) = clicked {
            self.controller.crawl_highlight(i, now);
        } else {
            let center_y = output.inner_rect.center().y;
            if let Some(i) = rects.iter().position(|r| r.top() <= center_y && r.bottom() >= center_y) {
                self.controller.crawl_observe_center(i, output.state.offset.y, now);
            }
        }
    }

    fn rating_buttons(
        &mut self,
        ui: &mut egui::Ui,
        current: Option<Rating>,
        mut rate: impl FnMut(&mut TimelineController, u8),
    ) {
        for n in 1..=5u8 {
            let active = current.map_or(false, |r| r.value() >= n);
            let star = egui::RichText::new(if active { "★" } else { "☆" }).size(18.0).color(if active {
                theme::accent::YELLOW
            } else {
                theme::text::MUTED
            });
            if ui.add(egui::Button::new(star).frame(false)).on_hover_text(format!("Rate {}", n)).clicked() {
                rate(&mut self.controller, n);
            }
        }
    }

    fn render_detail(&mut self, ctx: &egui::Context) {
        let Some(record) = self.controller.detail().cloned() else {
            return;
        };
        egui::SidePanel::right("detail")
            .min_width(320.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(format!("Prompt #{}", record.id));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("✖").clicked() {
                            self.controller.close_detail();
                        }
                    });
                });
                ui.label(egui::RichText::new(format_time(record.timestamp, self.offset)).color(theme::text::SECONDARY));
                ui.horizontal(|ui| {
                    self.rating_buttons(ui, record.rating, |c, n| {
                        c.rate_detail(n);
                    });
                });
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.label(&record.display);
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new(format!("Project: {}", record.project_id())).color(theme::text::MUTED));
                    if let Some(note) = &record.note {
                        ui.label(egui::RichText::new(format!("Note: {}", note)).color(theme::text::MUTED));
                    }
                });
            });
    }
}

impl eframe::App for TimelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.controller.tick(now, chrono::Utc::now().timestamp_millis());
        self.handle_keys(ctx, now);
        self.flush_ratings();
        self.maybe_save_settings();

        // Dark theme
        ctx.set_visuals(egui::Visuals::dark());

        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::none()
                    .fill(theme::bg::PANEL)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0)),
            )
            .show(ctx, |ui| self.render_toolbar(ui, now));

        if self.controller.mode() == Mode::Normal {
            self.render_detail(ctx);
        }

        let fill = if self.controller.mode().is_playback() {
            theme::bg::STAGE
        } else {
            theme::bg::PLOT
        };
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(fill).inner_margin(egui::Margin::same(4.0)))
            .show(ctx, |ui| match self.controller.mode() {
                Mode::Theater => self.render_theater(ui, now),
                Mode::Crawl => self.render_crawl(ui, now),
                Mode::Normal | Mode::Selection => self.render_timeline(ui, now),
            });

        // Pick up ratings made during this frame
        self.flush_ratings();

        // Keep timers running
        let playing = self.controller.theater().map_or(false, |s| s.is_playing());
        if self.controller.mode() == Mode::Crawl || playing {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // Force save settings on exit
        if self.settings_dirty {
            self.save_settings();
        }
    }
}

/// Keyboard shortcuts. `+`/`=` and `-`/`_` share physical keys.
pub(crate) fn map_key(key: egui::Key) -> Option<Key> {
    use egui::Key as K;
    Some(match key {
        K::ArrowLeft => Key::Left,
        K::ArrowRight => Key::Right,
        K::ArrowUp => Key::Up,
        K::ArrowDown => Key::Down,
        K::Plus | K::Equals => Key::ZoomIn,
        K::Minus => Key::ZoomOut,
        K::S => Key::ToggleSelection,
        K::Num1 => Key::Rate(1),
        K::Num2 => Key::Rate(2),
        K::Num3 => Key::Rate(3),
        K::Num4 => Key::Rate(4),
        K::Num5 => Key::Rate(5),
        K::Space => Key::Space,
        K::Escape => Key::Escape,
        _ => return None,
    })
}

/// egui scroll deltas move content (positive y = up); the engine expects
/// wheel deltas (positive y = down).
pub(crate) fn wheel_gesture(
    unit: egui::MouseWheelUnit,
    delta: Vec2,
    modifiers: egui::Modifiers,
    focal_x: f64,
) -> WheelGesture {
    WheelGesture {
        delta_x: -delta.x as f64,
        delta_y: -delta.y as f64,
        unit: match unit {
            egui::MouseWheelUnit::Point => WheelUnit::Pixel,
            egui::MouseWheelUnit::Line => WheelUnit::Line,
            egui::MouseWheelUnit::Page => WheelUnit::Page,
        },
        modifier: modifiers.ctrl || modifiers.command,
        focal_x,
    }
}

fn format_time(timestamp_ms: i64, offset: FixedOffset) -> String {
    local_time(timestamp_ms, offset)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub(crate) fn stars_label(rating: Option<Rating>) -> String {
    let n = rating.map_or(0, Rating::value) as usize;
    format!("{}{}", "★".repeat(n), "☆".repeat(5 - n.min(5)))
}

pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod app_tests;
