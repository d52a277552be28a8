//! Remote Queue Source
//!
//! Everything the kiosk learns from or asks of the backend goes through the
//! traits in this module. The coordinator never talks HTTP itself; it consumes
//! [`QueueSnapshot`]s and [`StatusReport`]s produced here.
//!
//! # Available Sources
//!
//! - [`HttpBackend`]: the kiosk REST API (default)
//! - Push channel: [`spawn_push_listener`] turns websocket frames into
//!   [`PushEvent`]s that mean "re-fetch now"
//!
//! # Usage
//!
//! ```ignore
//! use kiosk_core::source::{HttpBackend, RemoteQueueSource};
//!
//! let backend = HttpBackend::from_config(&config.backend, config.queue.capacity)?;
//! let snapshot = backend.fetch_snapshot().await?;
//! ```

mod http;
pub(crate) mod push;

pub use http::{parse_queue_payload, parse_status_payload, HttpBackend};
pub use push::{push_url, spawn_push_listener, Backoff, ReconnectPolicy};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    DevEnqueueOutcome, HistoryEntry, LeaveOutcome, Player, PlayerId, PlayerUpdate, QueueSnapshot,
    ScanOutcome, SessionStart, StatusReport,
};

/// Why a backend call produced nothing usable
///
/// None of these are fatal: the kiosk logs them and retries on the next poll
/// or notification.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or transport failure
    #[error("request failed: {0}")]
    Request(String),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {detail}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Backend `detail` field or raw body
        detail: String,
    },

    /// Backend rejected the kiosk API key
    #[error("kiosk API key rejected")]
    Unauthorized,

    /// Response body did not have the expected structure
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether the payload arrived but could not be understood
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Change signal from the backend push channel
///
/// Payload-free: each one just means "re-fetch now".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// Someone joined or left the queue
    QueueUpdate,
    /// A game session started
    SessionStarted,
    /// A game session ended
    SessionEnded,
}

impl Notification {
    /// Parse a wire tag; unknown tags yield `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "queue_update" => Some(Self::QueueUpdate),
            "session_started" => Some(Self::SessionStarted),
            "session_ended" => Some(Self::SessionEnded),
            _ => None,
        }
    }

    /// Whether the session status may have changed
    pub fn affects_status(self) -> bool {
        matches!(self, Self::SessionStarted | Self::SessionEnded)
    }
}

/// Events from the push channel listener
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushEvent {
    /// Websocket (re)connected; notifications may have been missed
    Connected,
    /// Websocket dropped; the listener is reconnecting
    Disconnected,
    /// A change notification
    Notification(Notification),
}

/// Pull side of the remote queue
#[async_trait]
pub trait RemoteQueueSource: Send + Sync {
    /// Fetch the current ordered queue
    async fn fetch_snapshot(&self) -> Result<QueueSnapshot, FetchError>;

    /// Fetch the kiosk's session status and configuration
    async fn fetch_status(&self) -> Result<StatusReport, FetchError>;
}

/// Kiosk-initiated backend actions
#[async_trait]
pub trait KioskActions: Send + Sync {
    /// Submit a scanned band UID
    async fn submit_scan(&self, uid: &str) -> Result<ScanOutcome, FetchError>;

    /// Ask the backend to start a game with the queued players
    async fn start_session(&self, mode: Option<&str>) -> Result<SessionStart, FetchError>;

    /// Queue one of the backend's shared development players
    async fn enqueue_dev_player(&self) -> Result<DevEnqueueOutcome, FetchError>;

    /// Remove a player from this kiosk's queue
    async fn leave_queue(&self, player_id: PlayerId) -> Result<LeaveOutcome, FetchError>;

    /// Look up a player
    async fn player(&self, player_id: PlayerId) -> Result<Player, FetchError>;

    /// Recent games of a player, newest first
    async fn player_history(&self, player_id: PlayerId) -> Result<Vec<HistoryEntry>, FetchError>;

    /// Change a player's profile; returns the player as stored afterwards
    async fn update_player(
        &self,
        player_id: PlayerId,
        update: &PlayerUpdate,
    ) -> Result<Player, FetchError>;
}
