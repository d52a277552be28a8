//! Surface Events
//!
//! Events sent from the display surface to the kiosk core. The surface reports
//! what happened; the core decides what it means.

use crate::coordinator::ArrivalTicket;
use crate::model::{PlayerId, PlayerUpdate};
use crate::scan::ScanKey;

/// Events from the surface to the kiosk core
#[derive(Debug)]
pub enum KioskEvent {
    // ============================================
    // Animation
    // ============================================
    /// The arrival animation for `ticket` finished
    ArrivalFinished {
        /// Ticket from the matching `PlayArrival`
        ticket: ArrivalTicket,
    },

    // ============================================
    // Scanning
    // ============================================
    /// A keystroke that may belong to a keyboard-wedge scan
    WedgeKey(ScanKey),

    /// A complete UID from any other reader
    Scan {
        /// Band UID
        uid: String,
    },

    // ============================================
    // Controls
    // ============================================
    /// Start-game control pressed
    StartPressed,

    /// A game mode was picked
    SelectMode {
        /// Index into the offered modes
        index: usize,
    },

    /// Development helper: queue a shared dev player
    DevEnqueue,

    /// A queue slot was tapped
    OpenProfile {
        /// Occupant of the tapped slot
        player_id: PlayerId,
    },

    /// "Leave queue" pressed on a profile
    LeaveQueue {
        /// Player leaving
        player_id: PlayerId,
    },

    /// A profile edit was confirmed
    UpdatePlayer {
        /// Player being edited
        player_id: PlayerId,
        /// What to change
        update: PlayerUpdate,
    },

    /// Fetch queue and status now
    RefreshRequested,

    // ============================================
    // System
    // ============================================
    /// The surface is closing
    Shutdown,
}
