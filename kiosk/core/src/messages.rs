//! Kiosk Messages
//!
//! Messages sent from the kiosk core to its display surface.
//!
//! # Design Philosophy
//!
//! The core owns every decision about the queue. The surface is a pure
//! renderer: it draws what it is told and reports input back as
//! [`KioskEvent`](crate::events::KioskEvent)s. The one obligation it carries is
//! returning each arrival ticket exactly once.

use crate::coordinator::ArrivalRequest;
use crate::model::{HistoryEntry, Player, TraitLevel};
use crate::renderer::QueueView;

/// Messages from the kiosk core to the surface
///
/// Not `Clone`: [`KioskMessage::PlayArrival`] carries a move-only ticket.
#[derive(Debug)]
pub enum KioskMessage {
    // ============================================
    // Queue
    // ============================================
    /// Replace the rendered queue
    QueueRendered {
        /// Exactly `capacity` slots
        view: QueueView,
    },

    /// Play the arrival animation, then send
    /// [`KioskEvent::ArrivalFinished`](crate::events::KioskEvent::ArrivalFinished)
    /// with the ticket
    PlayArrival(ArrivalRequest),

    // ============================================
    // Session
    // ============================================
    /// Show or hide the "game in progress" overlay
    WaitingForGame {
        /// True while a game is running
        waiting: bool,
    },

    /// Enable or disable the start control
    StartEligibility {
        /// Whether a start is possible
        eligible: bool,
    },

    /// Kiosk configuration from the latest status poll
    KioskInfo {
        /// Offered game modes
        modes: Vec<String>,
        /// Objective hints
        objectives: Vec<String>,
        /// Traits with a level above zero
        traits: Vec<TraitLevel>,
    },

    /// The mode a start request will use
    ModeSelected {
        /// Index into the offered modes
        index: usize,
        /// Mode name
        mode: String,
    },

    // ============================================
    // Banners and Overlays
    // ============================================
    /// Full-width welcome banner
    Splash {
        /// Banner text
        text: String,
    },

    /// Short status line
    Notice {
        /// Severity
        level: NoticeLevel,
        /// Text to show
        text: String,
    },

    /// Player profile overlay
    Profile {
        /// The player
        player: Player,
        /// Recent games, newest first
        history: Vec<HistoryEntry>,
        /// Whether the player is in the committed queue
        queued: bool,
    },

    /// A player's profile changed; refresh an open overlay showing them
    ProfileUpdated {
        /// The player as stored now
        player: Player,
    },

    // ============================================
    // System
    // ============================================
    /// Push channel connectivity changed
    PushChannel {
        /// Whether the websocket is up
        connected: bool,
    },

    /// The kiosk is shutting down
    Shutdown,
}

/// Notice severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational
    #[default]
    Info,
    /// Something worked
    Success,
    /// Something was refused
    Warning,
    /// Something failed
    Error,
}
