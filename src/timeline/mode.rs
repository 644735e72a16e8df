//! Interaction modes and their entry/exit side effects.

/// Exactly one mode is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Selection,
    Theater,
    Crawl,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::Selection => "Selection",
            Mode::Theater => "Theater",
            Mode::Crawl => "Crawl",
        }
    }

    /// Whether the main timeline is covered by a playback view.
    pub fn is_playback(&self) -> bool {
        matches!(self, Mode::Theater | Mode::Crawl)
    }
}

/// What started a Theater session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TheaterKind {
    /// Marker click: every record, starting at the clicked one, autoplay armed.
    FromMarker,
    /// Play selection: fixed target duration, autoplay disarmed.
    Selection,
    /// Replay selection at a real-time speedup, autoplay disarmed.
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    ToggleSelection,
    ClickMarker,
    PlaySelection,
    ReplaySelection,
    CrawlSelection,
    Exit,
}

/// Side effects the controller must apply, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEffect {
    DisableZoomPan,
    EnableZoomPan,
    InstallBrush,
    RemoveBrush,
    ClearSelection,
    ResetSelectionToggle,
    StartTheater(TheaterKind),
    StopTheater,
    StartCrawl,
    StopCrawl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
    /// Exit effects of `from` followed by entry effects of `to`.
    pub effects: Vec<ModeEffect>,
}

#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
    /// State of the select toggle button; survives entering a playback mode
    /// from Selection so exit can reset it.
    selection_toggle: bool,
}

impl ModeMachine {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selection_toggle(&self) -> bool {
        self.selection_toggle
    }

    /// Apply an event. Returns None when the event means nothing in the current mode.
    pub fn handle(&mut self, event: ModeEvent) -> Option<Transition> {
        let target = match (self.mode, event) {
            (Mode::Normal, ModeEvent::ToggleSelection) => Mode::Selection,
            (Mode::Selection, ModeEvent::ToggleSelection | ModeEvent::Exit) => Mode::Normal,
            (Mode::Normal, ModeEvent::ClickMarker) => Mode::Theater,
            (Mode::Normal | Mode::Selection, ModeEvent::PlaySelection | ModeEvent::ReplaySelection) => {
                Mode::Theater
            }
            (Mode::Normal | Mode::Selection, ModeEvent::CrawlSelection) => Mode::Crawl,
            (Mode::Theater | Mode::Crawl, ModeEvent::Exit) => Mode::Normal,
            _ => return None,
        };

        let mut effects = self.exit_effects(target);
        effects.extend(self.entry_effects(target, event));

        let from = self.mode;
        self.mode = target;
        tracing::debug!("Mode {} -> {} via {:?}", from.label(), target.label(), event);
        Some(Transition {
            from,
            to: target,
            effects,
        })
    }

    fn exit_effects(&mut self, target: Mode) -> Vec<ModeEffect> {
        match self.mode {
            Mode::Normal => Vec::new(),
            Mode::Selection if target == Mode::Normal => {
                self.selection_toggle = false;
                vec![ModeEffect::RemoveBrush, ModeEffect::ClearSelection]
            }
            // Playing the selection keeps it until playback exits
            Mode::Selection => vec![ModeEffect::RemoveBrush],
            Mode::Theater | Mode::Crawl => {
                let stop = if self.mode == Mode::Theater {
                    ModeEffect::StopTheater
                } else {
                    ModeEffect::StopCrawl
                };
                let mut effects = vec![stop, ModeEffect::ClearSelection];
                if self.selection_toggle {
                    self.selection_toggle = false;
                    effects.push(ModeEffect::ResetSelectionToggle);
                }
                effects
            }
        }
    }

    fn entry_effects(&mut self, target: Mode, event: ModeEvent) -> Vec<ModeEffect> {
        match target {
            Mode::Normal => vec![ModeEffect::EnableZoomPan],
            Mode::Selection => {
                self.selection_toggle = true;
                vec![ModeEffect::DisableZoomPan, ModeEffect::InstallBrush]
            }
            Mode::Theater => {
                let kind = match event {
                    ModeEvent::ClickMarker => TheaterKind::FromMarker,
                    ModeEvent::ReplaySelection => TheaterKind::Replay,
                    _ => TheaterKind::Selection,
                };
                vec![ModeEffect::DisableZoomPan, ModeEffect::StartTheater(kind)]
            }
            Mode::Crawl => vec![ModeEffect::DisableZoomPan, ModeEffect::StartCrawl],
        }
    }
}
