//! Theme and Colors
//!
//! The kiosk palette: a dark arcade board with gold arrival accents.

use ratatui::style::{Color, Modifier, Style};

use kiosk_core::NoticeLevel;

// ============================================================================
// Board Palette
// ============================================================================

/// Slot frame around an occupied slot
pub const SLOT_FRAME: Color = Color::Rgb(120, 140, 200);

/// Slot frame around an open slot
pub const SLOT_OPEN: Color = Color::Rgb(60, 60, 70);

/// Initials badge text
pub const BADGE: Color = Color::Rgb(235, 235, 245);

/// Avatar marker for players with an image
pub const AVATAR_MARK: Color = Color::Rgb(150, 200, 255);

/// Player label under a slot
pub const LABEL: Color = Color::Rgb(190, 190, 200);

/// Arrival coin, rising into its slot
pub const COIN_GOLD: Color = Color::Rgb(255, 200, 60);

// ============================================================================
// Banners
// ============================================================================

/// Splash banner text
pub const SPLASH: Color = Color::Rgb(255, 215, 90);

/// Waiting overlay text
pub const WAITING: Color = Color::Rgb(255, 150, 120);

// ============================================================================
// UI Colors
// ============================================================================

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Warning amber
pub const WARNING_AMBER: Color = Color::Rgb(255, 190, 80);

/// Success green
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);

/// Informational blue
pub const INFO_BLUE: Color = Color::Rgb(100, 180, 255);

/// Style for a notice of the given severity
pub fn notice_style(level: NoticeLevel) -> Style {
    let color = match level {
        NoticeLevel::Info => INFO_BLUE,
        NoticeLevel::Success => SUCCESS_GREEN,
        NoticeLevel::Warning => WARNING_AMBER,
        NoticeLevel::Error => ERROR_RED,
    };
    Style::default().fg(color)
}

/// Style for the start control
pub fn start_style(eligible: bool) -> Style {
    if eligible {
        Style::default()
            .fg(Color::Black)
            .bg(SUCCESS_GREEN)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DIM_GRAY)
    }
}
