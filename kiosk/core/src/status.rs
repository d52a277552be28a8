//! Status Coordinator
//!
//! Tracks whether a game is in play and derives the "start eligible" signal:
//! a new game may start when nothing is running and at least
//! [`MIN_PLAYERS_TO_START`] players are committed to the queue.

use tracing::debug;

use crate::model::KioskStatus;

/// Committed occupants needed before a game can start
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Side effects requested by the status coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusEffect {
    /// Block (or unblock) the start control and show the waiting overlay
    WaitingChanged {
        /// True while a game is running
        waiting: bool,
    },
    /// Start eligibility changed
    StartEligibility {
        /// Whether a start is possible right now
        eligible: bool,
    },
}

/// Session status plus derived start eligibility
#[derive(Debug, Default)]
pub struct StatusCoordinator {
    status: KioskStatus,
    last_count: usize,
    eligible: bool,
}

impl StatusCoordinator {
    /// Create a coordinator in the idle state with an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known session status
    pub fn status(&self) -> KioskStatus {
        self.status
    }

    /// Whether a game may be started
    pub fn start_eligible(&self) -> bool {
        self.eligible
    }

    /// Record a freshly polled status
    pub fn apply_status(&mut self, status: KioskStatus) -> Vec<StatusEffect> {
        let mut effects = Vec::new();
        if status != self.status {
            debug!(from = ?self.status, to = ?status, "kiosk status changed");
            self.status = status;
            effects.push(StatusEffect::WaitingChanged {
                waiting: status.is_running(),
            });
        }
        effects.extend(self.recompute());
        effects
    }

    /// Record the coordinator's committed occupant count
    pub fn observe_queue_count(&mut self, last_count: usize) -> Vec<StatusEffect> {
        self.last_count = last_count;
        self.recompute().into_iter().collect()
    }

    fn recompute(&mut self) -> Option<StatusEffect> {
        let eligible = !self.status.is_running() && self.last_count >= MIN_PLAYERS_TO_START;
        if eligible == self.eligible {
            return None;
        }
        self.eligible = eligible;
        Some(StatusEffect::StartEligibility { eligible })
    }
}
