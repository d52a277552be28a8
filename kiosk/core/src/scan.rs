//! Band Scanning
//!
//! Two ways a band UID reaches the kiosk:
//!
//! - A USB keyboard-wedge reader "types" the UID. [`ScanBuffer`] collects the
//!   keystrokes and emits the UID on `Enter` or after a short quiet period.
//! - The local scanning agent pushes each UID as a websocket text frame
//!   ([`spawn_agent_bridge`]).
//!
//! Either way the kiosk only submits the UID; the queue changes arrive through
//! the normal fetch path.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::source::push::{spawn_frame_reader, Frame};
use crate::source::ReconnectPolicy;

/// Default keyboard-wedge quiet period
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(250);

/// A keystroke relevant to scanning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanKey {
    /// A typed character
    Char(char),
    /// Enter
    Terminator,
}

/// Keyboard-wedge debounce buffer
///
/// Time is passed in by the caller, so the buffer never reads a clock itself.
#[derive(Debug)]
pub struct ScanBuffer {
    buffer: String,
    deadline: Option<Instant>,
    quiet: Duration,
}

impl Default for ScanBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl ScanBuffer {
    /// Create a buffer flushing after `quiet` without input
    pub fn new(quiet: Duration) -> Self {
        Self {
            buffer: String::new(),
            deadline: None,
            quiet,
        }
    }

    /// Feed one key; returns a UID when `Enter` completes one
    pub fn push(&mut self, key: ScanKey, now: Instant) -> Option<String> {
        match key {
            ScanKey::Terminator => self.flush(),
            ScanKey::Char(c) if c.is_ascii_alphanumeric() => {
                self.buffer.push(c);
                self.deadline = Some(now + self.quiet);
                None
            }
            ScanKey::Char(_) => None,
        }
    }

    /// When the buffer will flush on its own, if it holds anything
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Flush if the quiet period has elapsed
    pub fn flush_if_due(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Take whatever has been typed; empty buffers yield nothing
    pub fn flush(&mut self) -> Option<String> {
        self.deadline = None;
        if self.buffer.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }
}

/// Forward UIDs from the local scanning agent until `tx` is dropped
pub fn spawn_agent_bridge(
    url: String,
    policy: ReconnectPolicy,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    spawn_frame_reader(url, policy, tx, |frame| match frame {
        Frame::Text(text) => {
            let uid = text.trim();
            (!uid.is_empty()).then(|| uid.to_string())
        }
        Frame::Connected | Frame::Disconnected => None,
    })
}
