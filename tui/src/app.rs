//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize, frame tick)
//! - KioskEvents up to the core, KioskMessages down into DisplayState
//! - Arrival tickets handed back as animations finish
//! - Layered rendering through the compositor
//!
//! The App never decides anything about the queue. Slot taps read the
//! committed queue from the core's commit observer.

use std::time::{Duration, Instant};

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, StatefulWidget, Widget};
use ratatui::Terminal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use kiosk_core::model::{level_dots, PlayerUpdate, TraitInfo, MAX_TRAIT_LEVEL, TRAIT_CATALOG};
use kiosk_core::scan::spawn_agent_bridge;
use kiosk_core::source::{push_url, spawn_push_listener};
use kiosk_core::{
    CommittedView, HttpBackend, Kiosk, KioskConfig, KioskEvent, KioskMessage, NoticeLevel, ScanKey,
    SlotVisual,
};

use crate::compositor::{Compositor, LayerId};
use crate::display::DisplayState;
use crate::theme::{self, DIM_GRAY, SPLASH, SUCCESS_GREEN, WAITING};
use crate::widgets::{Arrival, QueueSlot, TextBlock, TextBlockState};

/// Redraw cadence while animations play
const FRAME_DURATION: Duration = Duration::from_millis(50);

/// How long to wait for the core to stop
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Buffered surface events
const EVENT_BUFFER: usize = 64;

/// Buffered push/agent events
const SOURCE_BUFFER: usize = 16;

/// Queue slot frame height
const SLOT_HEIGHT: u16 = 7;

/// Row the slots start on
const SLOT_TOP: u16 = 2;

/// Mode, objectives, traits, start control
const INFO_HEIGHT: u16 = 5;

/// Banner box height
const BANNER_HEIGHT: u16 = 5;

/// Trait detail box height
const TRAIT_DETAIL_HEIGHT: u16 = 8;

/// Longest name the edit field accepts
const MAX_NAME_LEN: usize = 32;

/// Smallest terminal the board fits in
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = SLOT_TOP + SLOT_HEIGHT + INFO_HEIGHT + 2;

static EMPTY_SLOT: SlotVisual = SlotVisual::Empty;

// ============================================================================
// Key Mapping
// ============================================================================

/// Which keys are live right now
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// The queue board
    Board,
    /// Trait detail shown over the board
    TraitDetail,
    /// Profile overlay open
    Profile,
    /// Typing a new name in the profile overlay
    EditingName,
}

/// What a key press asks for
#[derive(Debug)]
pub enum KeyAction {
    /// Forward to the core
    Kiosk(KioskEvent),
    /// Open the profile of the player in a slot (0-based)
    OpenSlot(usize),
    /// Select the next offered mode
    CycleMode,
    /// Leave the queue as the player whose profile is open
    LeaveProfile,
    /// Close the profile overlay
    CloseProfile,
    /// Scroll profile history
    ScrollProfile(isize),
    /// Start editing the open profile's name
    EditName,
    /// Type into the name field
    NameInput(char),
    /// Delete the last typed character
    NameBackspace,
    /// Save the typed name
    SubmitName,
    /// Abandon the name edit
    CancelEdit,
    /// Give the open profile a random avatar
    RandomAvatar,
    /// Show the next trait's detail (closes after the last)
    CycleTrait,
    /// Close the trait detail
    CloseTrait,
    /// Stop the kiosk
    Quit,
}

/// Map a key press to an action
///
/// Plain characters and Enter belong to the keyboard-wedge scanner, so every
/// control lives on a function key or a Ctrl chord. While a name is being
/// edited the keyboard belongs to the name field.
pub fn map_key(key: KeyEvent, mode: InputMode) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    if mode == InputMode::EditingName {
        return match key.code {
            KeyCode::Esc => Some(KeyAction::CancelEdit),
            KeyCode::Enter => Some(KeyAction::SubmitName),
            KeyCode::Backspace => Some(KeyAction::NameBackspace),
            KeyCode::Char('c') if ctrl => Some(KeyAction::Quit),
            KeyCode::Char(c) if !ctrl && !alt => Some(KeyAction::NameInput(c)),
            _ => None,
        };
    }
    let profile_open = mode == InputMode::Profile;

    match key.code {
        KeyCode::Esc if profile_open => Some(KeyAction::CloseProfile),
        KeyCode::Esc if mode == InputMode::TraitDetail => Some(KeyAction::CloseTrait),
        KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('c') if ctrl => Some(KeyAction::Quit),
        KeyCode::Char('q' | 'Q') if ctrl && shift => Some(KeyAction::Kiosk(KioskEvent::DevEnqueue)),
        KeyCode::Char('s' | 'S') if ctrl => Some(KeyAction::Kiosk(KioskEvent::StartPressed)),
        KeyCode::Char('r' | 'R') if ctrl => Some(KeyAction::Kiosk(KioskEvent::RefreshRequested)),
        KeyCode::Char('l' | 'L') if ctrl && profile_open => Some(KeyAction::LeaveProfile),
        KeyCode::Char('e' | 'E') if ctrl && profile_open => Some(KeyAction::EditName),
        KeyCode::Char('a' | 'A') if ctrl && profile_open => Some(KeyAction::RandomAvatar),
        KeyCode::Char('t' | 'T') if ctrl && !profile_open => Some(KeyAction::CycleTrait),
        KeyCode::Tab => Some(KeyAction::CycleMode),
        KeyCode::F(n @ 1..=12) => Some(KeyAction::OpenSlot(usize::from(n - 1))),
        KeyCode::Up if profile_open => Some(KeyAction::ScrollProfile(-1)),
        KeyCode::Down if profile_open => Some(KeyAction::ScrollProfile(1)),
        KeyCode::Enter => Some(KeyAction::Kiosk(KioskEvent::WedgeKey(ScanKey::Terminator))),
        KeyCode::Char(c) if !ctrl && !alt => {
            Some(KeyAction::Kiosk(KioskEvent::WedgeKey(ScanKey::Char(c))))
        }
        _ => None,
    }
}

/// Trait detail as display lines: label, wrapped description, level
pub fn trait_detail_lines(info: &TraitInfo, level: u32, width: usize) -> Vec<String> {
    let mut lines = vec![format!("{}:", info.label)];
    lines.extend(
        textwrap::wrap(info.description, width.max(1))
            .into_iter()
            .map(|line| line.into_owned()),
    );
    lines.push(String::new());
    lines.push(match level_dots(level) {
        Some(dots) => format!("{dots}  {} / {MAX_TRAIT_LEVEL}", level.min(MAX_TRAIT_LEVEL)),
        None => "Level not configured yet.".to_string(),
    });
    lines
}

/// Slot frames across the board, left to right
pub fn slot_rects(width: u16, capacity: usize) -> Vec<Rect> {
    let Ok(count) = u32::try_from(capacity.max(1)) else {
        return Vec::new();
    };
    let row = Rect::new(0, SLOT_TOP, width, SLOT_HEIGHT);
    Layout::horizontal((0..count).map(|_| Constraint::Ratio(1, count)))
        .split(row)
        .to_vec()
}

// ============================================================================
// App
// ============================================================================

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// Kiosk id, for the board title
    kiosk_id: String,
    /// Slot count
    capacity: usize,

    // === Core Integration ===
    /// Events up to the core
    events: mpsc::Sender<KioskEvent>,
    /// Messages down from the core
    messages: mpsc::UnboundedReceiver<KioskMessage>,
    /// Committed queue, for slot taps
    commits: watch::Receiver<Option<CommittedView>>,
    /// The running core
    kiosk: Option<JoinHandle<anyhow::Result<()>>>,
    /// Push listener and agent bridge
    listeners: Vec<JoinHandle<()>>,
    /// Display state derived from KioskMessages
    display: DisplayState,

    // === UI Components ===
    /// The layered compositor
    compositor: Compositor,
    /// Layer assignments
    layers: AppLayers,
    /// Profile history scroll
    history_scroll: TextBlockState,
    /// Name being typed in the profile overlay
    name_edit: Option<String>,
    /// Index into the trait catalog of the shown detail
    trait_detail: Option<usize>,
    /// Terminal size
    size: (u16, u16),
}

/// Layer IDs for UI regions
struct AppLayers {
    board: LayerId,
    info: LayerId,
    banner: LayerId,
    trait_detail: LayerId,
    profile: LayerId,
    status: LayerId,
}

impl App {
    /// Start the kiosk core and its sources, and build a surface for it
    pub fn connect(config: KioskConfig, size: (u16, u16)) -> anyhow::Result<Self> {
        let backend = HttpBackend::from_config(&config.backend, config.queue.capacity)?;
        let (tx, messages) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::channel(EVENT_BUFFER);
        let mut listeners = Vec::new();

        let push_rx = if config.push.enabled {
            match push_url(&config.backend.base_url, &config.backend.kiosk_id) {
                Some(url) => {
                    let (push_tx, push_rx) = mpsc::channel(SOURCE_BUFFER);
                    listeners.push(spawn_push_listener(url, config.push.reconnect, push_tx));
                    Some(push_rx)
                }
                None => {
                    warn!(base_url = %config.backend.base_url, "no push URL for backend, polling only");
                    None
                }
            }
        } else {
            None
        };

        let scan_rx = if config.scanner.agent_enabled {
            let (scan_tx, scan_rx) = mpsc::channel(SOURCE_BUFFER);
            listeners.push(spawn_agent_bridge(
                config.scanner.agent_url.clone(),
                config.push.reconnect,
                scan_tx,
            ));
            Some(scan_rx)
        } else {
            None
        };

        let kiosk = Kiosk::new(backend, config.clone(), tx);
        let commits = kiosk.subscribe_commits();
        let handle = tokio::spawn(kiosk.run(event_rx, push_rx, scan_rx));

        let mut app = Self::with_channels(&config, size, events, messages, commits);
        app.kiosk = Some(handle);
        app.listeners = listeners;
        Ok(app)
    }

    /// Surface for a core that is wired up elsewhere
    pub fn with_channels(
        config: &KioskConfig,
        size: (u16, u16),
        events: mpsc::Sender<KioskEvent>,
        messages: mpsc::UnboundedReceiver<KioskMessage>,
        commits: watch::Receiver<Option<CommittedView>>,
    ) -> Self {
        let area = Rect::new(0, 0, size.0, size.1);
        let mut compositor = Compositor::new(area);

        // Geometry is set by arrange()
        let board = compositor.create_layer(area, 0);
        let info = compositor.create_layer(area, 5);
        let status = compositor.create_layer(area, 10);
        let banner = compositor.create_layer(area, 50);
        let trait_detail = compositor.create_layer(area, 70);
        let profile = compositor.create_layer(area, 80);
        compositor.set_opaque(banner, true);
        compositor.set_opaque(trait_detail, true);
        compositor.set_opaque(profile, true);

        let mut app = Self {
            running: true,
            kiosk_id: config.backend.kiosk_id.clone(),
            capacity: config.queue.capacity,
            events,
            messages,
            commits,
            kiosk: None,
            listeners: Vec::new(),
            display: DisplayState::new(
                config.display.arrival_duration,
                config.display.splash_duration,
            ),
            compositor,
            layers: AppLayers {
                board,
                info,
                banner,
                trait_detail,
                profile,
                status,
            },
            history_scroll: TextBlockState::default(),
            name_edit: None,
            trait_detail: None,
            size,
        };
        app.arrange();
        app
    }

    /// Display state (read-only)
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Which keys are live right now
    pub fn input_mode(&self) -> InputMode {
        match (&self.display.profile, &self.name_edit, self.trait_detail) {
            (Some(_), Some(_), _) => InputMode::EditingName,
            (Some(_), None, _) => InputMode::Profile,
            (None, _, Some(_)) => InputMode::TraitDetail,
            (None, _, None) => InputMode::Board,
        }
    }

    /// Name typed so far, while editing
    pub fn name_edit(&self) -> Option<&str> {
        self.name_edit.as_deref()
    }

    /// Trait whose detail is shown
    pub fn trait_detail(&self) -> Option<&'static TraitInfo> {
        self.trait_detail.and_then(|i| TRAIT_CATALOG.get(i))
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut frame = tokio::time::interval(FRAME_DURATION);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.render(terminal, Instant::now())?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events first so input stays responsive
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    Some(Ok(Event::Mouse(mouse))) => self.handle_mouse(mouse).await,
                    Some(Ok(Event::Resize(w, h))) => self.handle_resize(w, h),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!(error = %e, "terminal event error"),
                    None => self.running = false,
                },

                msg = self.messages.recv() => match msg {
                    Some(msg) => self.display.apply_message(msg, Instant::now()),
                    None => {
                        info!("kiosk core closed its channel");
                        self.running = false;
                    }
                },

                _ = frame.tick() => {}
            }

            let now = Instant::now();
            self.process_messages(now);
            self.tick(now).await;
            if self.display.shutdown {
                self.running = false;
            }
            self.render(terminal, now)?;
        }

        self.shutdown().await;
        Ok(())
    }

    /// Apply every message already waiting
    pub fn process_messages(&mut self, now: Instant) {
        while let Ok(msg) = self.messages.try_recv() {
            self.display.apply_message(msg, now);
        }
    }

    /// Advance timers; hand back finished arrival tickets
    pub async fn tick(&mut self, now: Instant) {
        while let Some(ticket) = self.display.update(now) {
            debug!(ticket = ticket.id(), "arrival finished");
            self.send(KioskEvent::ArrivalFinished { ticket }).await;
        }
    }

    /// Handle keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) {
        let Some(action) = map_key(key, self.input_mode()) else {
            return;
        };

        match action {
            KeyAction::Kiosk(event) => self.send(event).await,
            KeyAction::OpenSlot(index) => self.open_slot(index).await,
            KeyAction::CycleMode => {
                let count = self.display.modes.len();
                if count > 0 {
                    let index = self
                        .display
                        .selected_mode
                        .as_ref()
                        .map_or(0, |(i, _)| (i + 1) % count);
                    self.send(KioskEvent::SelectMode { index }).await;
                }
            }
            KeyAction::LeaveProfile => {
                let leaving = self
                    .display
                    .profile
                    .as_ref()
                    .filter(|p| p.queued)
                    .map(|p| p.player.id);
                if let Some(player_id) = leaving {
                    self.close_profile();
                    self.send(KioskEvent::LeaveQueue { player_id }).await;
                }
            }
            KeyAction::CloseProfile => self.close_profile(),
            KeyAction::ScrollProfile(delta) => self.history_scroll.scroll(delta),
            KeyAction::EditName => {
                self.name_edit = self
                    .display
                    .profile
                    .as_ref()
                    .map(|p| p.player.display_name().to_string());
            }
            KeyAction::NameInput(c) => {
                if let Some(name) = self.name_edit.as_mut() {
                    if name.chars().count() < MAX_NAME_LEN {
                        name.push(c);
                    }
                }
            }
            KeyAction::NameBackspace => {
                if let Some(name) = self.name_edit.as_mut() {
                    name.pop();
                }
            }
            KeyAction::SubmitName => self.submit_name().await,
            KeyAction::CancelEdit => self.name_edit = None,
            KeyAction::RandomAvatar => {
                if let Some(player_id) = self.display.profile.as_ref().map(|p| p.player.id) {
                    self.send(KioskEvent::UpdatePlayer {
                        player_id,
                        update: PlayerUpdate::RandomAvatar,
                    })
                    .await;
                }
            }
            KeyAction::CycleTrait => {
                self.trait_detail = match self.trait_detail {
                    None => Some(0),
                    Some(i) if i + 1 < TRAIT_CATALOG.len() => Some(i + 1),
                    Some(_) => None,
                };
            }
            KeyAction::CloseTrait => self.trait_detail = None,
            KeyAction::Quit => self.running = false,
        }
    }

    /// Send the typed name up; a blank one stays in the field with a notice
    async fn submit_name(&mut self) {
        let Some(player_id) = self.display.profile.as_ref().map(|p| p.player.id) else {
            self.name_edit = None;
            return;
        };
        let typed = self.name_edit.as_deref().unwrap_or_default();
        match PlayerUpdate::rename(typed) {
            Some(update) => {
                self.name_edit = None;
                self.send(KioskEvent::UpdatePlayer { player_id, update }).await;
            }
            None => self.display.apply_message(
                KioskMessage::Notice {
                    level: NoticeLevel::Warning,
                    text: "Name cannot be empty.".to_string(),
                },
                Instant::now(),
            ),
        }
    }

    /// Handle mouse input: tap a slot, or tap outside the profile to close it
    pub async fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }

        let hit = self.compositor.layer_at(mouse.column, mouse.row);
        if self.display.profile.is_some() {
            if hit != Some(self.layers.profile) {
                self.close_profile();
            }
            return;
        }
        if self.trait_detail.is_some() {
            if hit != Some(self.layers.trait_detail) {
                self.trait_detail = None;
            }
            return;
        }

        let slot = slot_rects(self.size.0, self.capacity)
            .iter()
            .position(|r| r.contains((mouse.column, mouse.row).into()));
        if let Some(index) = slot {
            self.open_slot(index).await;
        }
    }

    /// Handle terminal resize
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        self.compositor.resize(Rect::new(0, 0, width, height));
        self.arrange();
    }

    /// Send Shutdown and wait briefly for the core to stop
    async fn shutdown(&mut self) {
        let _ = self.events.send(KioskEvent::Shutdown).await;

        if let Some(handle) = self.kiosk.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(Ok(()))) => info!("kiosk core stopped"),
                Ok(Ok(Err(e))) => warn!(error = %e, "kiosk core failed"),
                Ok(Err(e)) => warn!(error = %e, "kiosk core task panicked"),
                Err(_) => warn!("kiosk core did not stop in time"),
            }
        }
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
    }

    async fn open_slot(&mut self, index: usize) {
        let occupant = self
            .commits
            .borrow()
            .as_ref()
            .and_then(|view| view.snapshot.entry(index))
            .map(|player| player.id);
        match occupant {
            Some(player_id) => self.send(KioskEvent::OpenProfile { player_id }).await,
            None => debug!(slot = index, "tapped an open slot"),
        }
    }

    fn close_profile(&mut self) {
        self.display.close_profile();
        self.history_scroll.reset();
        self.name_edit = None;
    }

    async fn send(&mut self, event: KioskEvent) {
        if self.events.send(event).await.is_err() {
            info!("kiosk core is gone");
            self.running = false;
        }
    }

    /// Position every layer for the current size
    fn arrange(&mut self) {
        let (width, height) = self.size;
        let body = height.saturating_sub(1);
        let info_top = SLOT_TOP + SLOT_HEIGHT + 1;

        self.compositor.move_layer(self.layers.board, 0, 0);
        self.compositor.resize_layer(self.layers.board, width, body);

        self.compositor.move_layer(self.layers.info, 0, info_top);
        self.compositor
            .resize_layer(self.layers.info, width, INFO_HEIGHT.min(body.saturating_sub(info_top)));

        self.compositor.move_layer(self.layers.status, 0, body);
        self.compositor.resize_layer(self.layers.status, width, 1);

        let banner_width = width.saturating_sub(8).min(60);
        self.compositor.move_layer(
            self.layers.banner,
            width.saturating_sub(banner_width) / 2,
            SLOT_TOP + SLOT_HEIGHT.saturating_sub(BANNER_HEIGHT) / 2,
        );
        self.compositor
            .resize_layer(self.layers.banner, banner_width, BANNER_HEIGHT);

        let detail_width = width.saturating_sub(8).min(48);
        self.compositor.move_layer(
            self.layers.trait_detail,
            width.saturating_sub(detail_width) / 2,
            SLOT_TOP,
        );
        self.compositor.resize_layer(
            self.layers.trait_detail,
            detail_width,
            TRAIT_DETAIL_HEIGHT.min(body.saturating_sub(SLOT_TOP)),
        );

        let profile_width = width.saturating_sub(4).min(56);
        let profile_height = body.saturating_sub(2).min(16);
        self.compositor.move_layer(
            self.layers.profile,
            width.saturating_sub(profile_width) / 2,
            body.saturating_sub(profile_height) / 2,
        );
        self.compositor
            .resize_layer(self.layers.profile, profile_width, profile_height);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the UI
    pub fn render<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        now: Instant,
    ) -> anyhow::Result<()> {
        if self.size.0 < MIN_WIDTH || self.size.1 < MIN_HEIGHT {
            self.render_too_small();
        } else {
            self.render_board(now);
            self.render_info();
            self.render_banner();
            self.render_trait_detail();
            self.render_profile();
            self.render_status();
        }

        terminal.draw(|frame| {
            let output = self.compositor.composite();
            let area = frame.area();
            let buf = frame.buffer_mut();

            for y in 0..area.height.min(output.area.height) {
                for x in 0..area.width.min(output.area.width) {
                    let idx = output.index_of(x, y);
                    if let Some(cell) = output.content.get(idx) {
                        buf[(x, y)] = cell.clone();
                    }
                }
            }
        })?;

        Ok(())
    }

    /// Only a hint; nothing else fits
    fn render_too_small(&mut self) {
        for id in [self.layers.info, self.layers.status] {
            if let Some(buf) = self.compositor.layer_buffer_mut(id) {
                buf.reset();
            }
        }
        self.compositor.set_visible(self.layers.banner, false);
        self.compositor.set_visible(self.layers.trait_detail, false);
        self.compositor.set_visible(self.layers.profile, false);

        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.board) {
            buf.reset();
            if buf.area.height > 0 {
                let width = usize::from(buf.area.width);
                buf.set_stringn(0, 0, "Terminal too small", width, Style::default().fg(DIM_GRAY));
            }
        }
    }

    /// Title and queue slots
    fn render_board(&mut self, now: Instant) {
        let slots = slot_rects(self.size.0, self.capacity);
        let arrival = self.display.arrival.current(now);
        let title = format!(
            " {}  {}/{} queued ",
            self.kiosk_id,
            self.display.occupied(),
            self.capacity
        );

        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.board) {
            buf.reset();
            buf.set_string(1, 0, &title, Style::default().add_modifier(Modifier::BOLD));

            for (i, rect) in slots.iter().enumerate() {
                let visual = self.display.queue.slots.get(i).unwrap_or(&EMPTY_SLOT);
                let coin = arrival
                    .filter(|(slot, _, _)| *slot == i)
                    .map(|(_, badge, progress)| Arrival { badge, progress });
                QueueSlot::new(visual, i + 1).arrival(coin).render(*rect, buf);
            }
        }
    }

    /// Modes, objectives, traits and the start control
    fn render_info(&mut self) {
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.info) {
            buf.reset();
            let area = buf.area;
            if area.height == 0 {
                return;
            }
            let dim = Style::default().fg(DIM_GRAY);

            let room = |x: u16| usize::from(area.width.saturating_sub(x));
            let mut x = buf.set_stringn(1, 0, "Mode (Tab): ", room(1), dim).0;
            for (i, mode) in self.display.modes.iter().enumerate() {
                let selected = self.display.selected_mode.as_ref().is_some_and(|(s, _)| *s == i);
                let style = if selected {
                    Style::default().fg(SUCCESS_GREEN).add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                x = buf.set_stringn(x, 0, format!(" {mode} "), room(x), style).0 + 1;
            }

            if area.height > 1 {
                let line = if self.display.objectives.is_empty() {
                    "No objectives configured yet.".to_string()
                } else {
                    format!("Objectives: {}", self.display.objectives.join(" / "))
                };
                buf.set_stringn(1, 1, line, room(1), dim);
            }

            if area.height > 2 {
                let traits: Vec<String> = TRAIT_CATALOG
                    .iter()
                    .map(|info| {
                        let level = info.level_in(&self.display.traits);
                        let dots = level_dots(level).unwrap_or_else(|| "-".to_string());
                        format!("{} {dots}", info.label)
                    })
                    .collect();
                let line = format!("Traits (Ctrl+T): {}", traits.join("  "));
                buf.set_stringn(1, 2, line, room(1), dim);
            }

            if area.height > 4 {
                let (label, style) = if self.display.waiting {
                    ("[ GAME IN PROGRESS ]", Style::default().fg(WAITING))
                } else {
                    (
                        "[ Ctrl+S  START GAME ]",
                        theme::start_style(self.display.start_eligible),
                    )
                };
                buf.set_string(1, 4, label, style);
            }
        }
    }

    /// Splash banner, or the waiting overlay
    fn render_banner(&mut self) {
        let text = match (&self.display.splash, self.display.waiting) {
            (Some(splash), _) => Some((splash.value.clone(), SPLASH)),
            (None, true) => Some(("Game in progress. Waiting for the next round...".to_string(), WAITING)),
            (None, false) => None,
        };
        self.compositor.set_visible(self.layers.banner, text.is_some());

        if let (Some(buf), Some((text, color))) =
            (self.compositor.layer_buffer_mut(self.layers.banner), text)
        {
            buf.reset();
            let area = buf.area;
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color));
            let inner = block.inner(area);
            block.render(area, buf);

            let line = crate::widgets::queue_slot::fit(&text, inner.width as usize);
            #[allow(clippy::cast_possible_truncation)]
            let width = unicode_width::UnicodeWidthStr::width(line.as_str()) as u16;
            let x = inner.x + inner.width.saturating_sub(width) / 2;
            let y = inner.y + inner.height / 2;
            buf.set_string(x, y, &line, Style::default().fg(color).add_modifier(Modifier::BOLD));
        }
    }

    /// Detail box for one trait
    fn render_trait_detail(&mut self) {
        let info = self.trait_detail();
        self.compositor
            .set_visible(self.layers.trait_detail, info.is_some());

        let (Some(buf), Some(info)) = (
            self.compositor.layer_buffer_mut(self.layers.trait_detail),
            info,
        ) else {
            return;
        };
        buf.reset();
        let area = buf.area;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Trait (Ctrl+T next, Esc close) ")
            .border_style(Style::default().fg(theme::INFO_BLUE));
        let inner = block.inner(area);
        block.render(area, buf);

        let level = info.level_in(&self.display.traits);
        let lines = trait_detail_lines(info, level, usize::from(inner.width));
        for (row, line) in (inner.y..inner.y + inner.height).zip(lines.iter()) {
            let style = if row == inner.y {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            buf.set_stringn(inner.x, row, line, usize::from(inner.width), style);
        }
    }

    /// Player profile overlay
    fn render_profile(&mut self) {
        self.compositor
            .set_visible(self.layers.profile, self.display.profile.is_some());

        let (Some(buf), Some(profile)) = (
            self.compositor.layer_buffer_mut(self.layers.profile),
            self.display.profile.as_ref(),
        ) else {
            return;
        };
        buf.reset();
        let area = buf.area;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Player ")
            .border_style(Style::default().fg(theme::INFO_BLUE));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height < 5 {
            return;
        }

        let player = &profile.player;
        match &self.name_edit {
            Some(typed) => buf.set_string(
                inner.x,
                inner.y,
                format!("Name: {typed}_"),
                Style::default().fg(theme::INFO_BLUE).add_modifier(Modifier::BOLD),
            ),
            None => buf.set_string(
                inner.x,
                inner.y,
                player.display_name(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        };
        buf.set_string(
            inner.x,
            inner.y + 1,
            format!("@{}", player.username),
            Style::default().fg(DIM_GRAY),
        );
        let (queued, queued_style) = if profile.queued {
            ("In queue", Style::default().fg(SUCCESS_GREEN))
        } else {
            ("Not in queue", Style::default().fg(DIM_GRAY))
        };
        buf.set_string(inner.x, inner.y + 2, queued, queued_style);

        let history_area = Rect::new(
            inner.x,
            inner.y + 4,
            inner.width,
            inner.height.saturating_sub(5),
        );
        let history = profile.history_text();
        TextBlock::new(&history).render(history_area, buf, &mut self.history_scroll);

        let footer = match (&self.name_edit, profile.queued) {
            (Some(_), _) => "Enter save  Esc cancel",
            (None, true) => "Ctrl+E name  Ctrl+A avatar  Ctrl+L leave  Esc close",
            (None, false) => "Ctrl+E name  Ctrl+A avatar  Esc close",
        };
        buf.set_string(
            inner.x,
            inner.y + inner.height - 1,
            footer,
            Style::default().fg(DIM_GRAY),
        );
    }

    /// Notice or key help, plus push channel state
    fn render_status(&mut self) {
        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.status) {
            buf.reset();
            let area = buf.area;

            match &self.display.notice {
                Some(notice) => {
                    buf.set_string(
                        1,
                        0,
                        &notice.value.text,
                        theme::notice_style(notice.value.level),
                    );
                }
                None => {
                    buf.set_string(
                        1,
                        0,
                        "F1-F6 profile  Tab mode  Ctrl+T traits  Ctrl+S start  Ctrl+R refresh  Esc quit",
                        Style::default().fg(DIM_GRAY),
                    );
                }
            }

            let (mark, style) = if self.display.push_connected {
                ("● live", Style::default().fg(SUCCESS_GREEN))
            } else {
                ("○ polling", Style::default().fg(DIM_GRAY))
            };
            let x = area.width.saturating_sub(10);
            buf.set_string(x, 0, mark, style);
        }
    }
}
