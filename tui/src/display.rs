//! Display State
//!
//! Everything the terminal draws, derived only from [`KioskMessage`]s. The
//! one piece of timing the surface owns is the arrival animation: each
//! `PlayArrival` is held until its duration elapses and its ticket is then
//! handed back exactly once.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use kiosk_core::coordinator::ArrivalRequest;
use kiosk_core::model::{HistoryEntry, TraitLevel};
use kiosk_core::history::{self, Attempt};
use kiosk_core::renderer;
use kiosk_core::{ArrivalTicket, KioskMessage, NoticeLevel, Player, QueueView};

/// How long a notice stays on the status line
pub const NOTICE_DURATION: Duration = Duration::from_secs(4);

// ============================================================================
// Arrival Animation
// ============================================================================

/// An arrival currently playing
#[derive(Debug)]
struct PlayingArrival {
    request: ArrivalRequest,
    badge: String,
    started: Instant,
}

/// Plays arrival animations one after another and returns their tickets
///
/// The core never requests a second arrival while one is in flight; should
/// one arrive anyway it waits its turn rather than dropping a ticket.
#[derive(Debug)]
pub struct ArrivalAnimator {
    queue: VecDeque<PlayingArrival>,
    duration: Duration,
}

impl ArrivalAnimator {
    /// Animator whose arrivals last `duration`
    pub fn new(duration: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            duration,
        }
    }

    /// Begin (or queue) an arrival
    pub fn start(&mut self, request: ArrivalRequest, now: Instant) {
        if !self.queue.is_empty() {
            tracing::warn!(slot = request.slot, "arrival requested while another is playing");
        }
        let badge = renderer::initials(&request.player);
        self.queue.push_back(PlayingArrival {
            request,
            badge,
            started: now,
        });
    }

    /// Whether an arrival is playing
    pub fn is_playing(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Slot, badge and progress (0.0..=1.0) of the playing arrival
    pub fn current(&self, now: Instant) -> Option<(usize, &str, f32)> {
        self.queue.front().map(|playing| {
            let progress = if self.duration.is_zero() {
                1.0
            } else {
                let elapsed = now.saturating_duration_since(playing.started);
                (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
            };
            (playing.request.slot, playing.badge.as_str(), progress)
        })
    }

    /// The player arriving right now
    pub fn current_player(&self) -> Option<&Player> {
        self.queue.front().map(|playing| &playing.request.player)
    }

    /// Take the ticket of the playing arrival once it has run its course
    ///
    /// The next queued arrival, if any, starts at `now`.
    pub fn poll_finished(&mut self, now: Instant) -> Option<ArrivalTicket> {
        let front = self.queue.front()?;
        if now.saturating_duration_since(front.started) < self.duration {
            return None;
        }
        let finished = self.queue.pop_front()?;
        if let Some(next) = self.queue.front_mut() {
            next.started = now;
        }
        Some(finished.request.ticket)
    }
}

// ============================================================================
// Display State
// ============================================================================

/// A message that disappears on its own
#[derive(Clone, Debug, PartialEq)]
pub struct Timed<T> {
    /// The content
    pub value: T,
    /// When it disappears
    pub expires_at: Instant,
}

/// Status line notice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayNotice {
    /// Severity
    pub level: NoticeLevel,
    /// Text
    pub text: String,
}

/// Profile overlay contents
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayProfile {
    /// The player
    pub player: Player,
    /// Recent games, newest first
    pub history: Vec<HistoryEntry>,
    /// Whether the player is queued (enables "leave queue")
    pub queued: bool,
}

impl DisplayProfile {
    /// History grouped by game then mode, as display lines
    pub fn history_text(&self) -> String {
        let games = history::summarize(&self.history);
        if games.is_empty() {
            return "No games played yet.".to_string();
        }
        let mut lines = Vec::new();
        for game in games {
            lines.push(format!(
                "{} - {}{}",
                game.name,
                plays(game.total_plays),
                best_suffix(game.best_score.as_deref())
            ));
            for mode in game.modes {
                lines.push(format!(
                    "  {} - {}{}",
                    mode.label,
                    plays(mode.plays),
                    best_suffix(mode.best_score.as_deref())
                ));
                lines.extend(mode.attempts.iter().map(attempt_line));
            }
        }
        lines.join("\n")
    }

    /// Replace the shown player when `player` is the same person
    fn refresh_player(&mut self, player: Player) {
        if self.player.id == player.id {
            self.player = player;
        }
    }
}

fn plays(count: usize) -> String {
    if count == 1 {
        "1 play".to_string()
    } else {
        format!("{count} plays")
    }
}

fn best_suffix(best: Option<&str>) -> String {
    best.map(|b| format!(", best {b}")).unwrap_or_default()
}

fn attempt_line(attempt: &Attempt) -> String {
    let mut line = format!("    {}", attempt.score.as_deref().unwrap_or("-"));
    if !attempt.when.is_empty() {
        line.push_str(&format!("  {}", attempt.when));
    }
    if let Some(kiosk) = &attempt.kiosk_id {
        line.push_str(&format!("  @{kiosk}"));
    }
    line
}

/// The full display state for the kiosk surface
#[derive(Debug)]
pub struct DisplayState {
    /// Rendered queue slots
    pub queue: QueueView,
    /// Arrival animation
    pub arrival: ArrivalAnimator,
    /// "Game in progress" overlay
    pub waiting: bool,
    /// Start control enabled
    pub start_eligible: bool,
    /// Offered modes
    pub modes: Vec<String>,
    /// Mode a start will use
    pub selected_mode: Option<(usize, String)>,
    /// Objective hints
    pub objectives: Vec<String>,
    /// Traits above level zero
    pub traits: Vec<TraitLevel>,
    /// Welcome banner
    pub splash: Option<Timed<String>>,
    /// Status line notice
    pub notice: Option<Timed<DisplayNotice>>,
    /// Profile overlay
    pub profile: Option<DisplayProfile>,
    /// Push channel connectivity
    pub push_connected: bool,
    /// Core has shut down
    pub shutdown: bool,
    splash_duration: Duration,
}

impl DisplayState {
    /// Create a new display state
    pub fn new(arrival_duration: Duration, splash_duration: Duration) -> Self {
        Self {
            queue: QueueView::default(),
            arrival: ArrivalAnimator::new(arrival_duration),
            waiting: false,
            start_eligible: false,
            modes: Vec::new(),
            selected_mode: None,
            objectives: Vec::new(),
            traits: Vec::new(),
            splash: None,
            notice: None,
            profile: None,
            push_connected: false,
            shutdown: false,
            splash_duration,
        }
    }

    /// Apply a KioskMessage to update display state
    pub fn apply_message(&mut self, msg: KioskMessage, now: Instant) {
        match msg {
            // Queue
            KioskMessage::QueueRendered { view } => {
                self.queue = view;
            }
            KioskMessage::PlayArrival(request) => {
                self.arrival.start(request, now);
            }

            // Session
            KioskMessage::WaitingForGame { waiting } => {
                self.waiting = waiting;
            }
            KioskMessage::StartEligibility { eligible } => {
                self.start_eligible = eligible;
            }
            KioskMessage::KioskInfo {
                modes,
                objectives,
                traits,
            } => {
                self.modes = modes;
                self.objectives = objectives;
                self.traits = traits;
            }
            KioskMessage::ModeSelected { index, mode } => {
                self.selected_mode = Some((index, mode));
            }

            // Banners and overlays
            KioskMessage::Splash { text } => {
                self.splash = Some(Timed {
                    value: text,
                    expires_at: now + self.splash_duration,
                });
            }
            KioskMessage::Notice { level, text } => {
                self.notice = Some(Timed {
                    value: DisplayNotice { level, text },
                    expires_at: now + NOTICE_DURATION,
                });
            }
            KioskMessage::Profile {
                player,
                history,
                queued,
            } => {
                self.profile = Some(DisplayProfile {
                    player,
                    history,
                    queued,
                });
            }
            KioskMessage::ProfileUpdated { player } => {
                if let Some(profile) = self.profile.as_mut() {
                    profile.refresh_player(player);
                }
            }

            // System
            KioskMessage::PushChannel { connected } => {
                self.push_connected = connected;
            }
            KioskMessage::Shutdown => {
                self.shutdown = true;
            }
        }
    }

    /// Expire banners and collect finished arrival tickets
    pub fn update(&mut self, now: Instant) -> Option<ArrivalTicket> {
        if self.splash.as_ref().is_some_and(|s| now >= s.expires_at) {
            self.splash = None;
        }
        if self.notice.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.notice = None;
        }
        self.arrival.poll_finished(now)
    }

    /// Close the profile overlay
    pub fn close_profile(&mut self) {
        self.profile = None;
    }

    /// Number of occupied slots on screen
    pub fn occupied(&self) -> usize {
        self.queue.occupied()
    }
}
