//! QueueSlot Widget
//!
//! One framed queue slot: an initials badge or avatar marker with the
//! player's label, an "open" placeholder, or the arrival coin rising from the
//! bottom of the frame toward the center.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use kiosk_core::SlotVisual;

use crate::theme::{AVATAR_MARK, BADGE, COIN_GOLD, DIM_GRAY, LABEL, SLOT_FRAME, SLOT_OPEN};

/// Marker drawn for players that have an avatar image
pub const AVATAR_GLYPH: &str = "◉";

/// Placeholder text for an open slot
pub const OPEN_TEXT: &str = "open";

/// An arrival playing into this slot
#[derive(Clone, Copy, Debug)]
pub struct Arrival<'a> {
    /// Badge of the arriving player
    pub badge: &'a str,
    /// 0.0 at the bottom of the frame, 1.0 at rest
    pub progress: f32,
}

/// A single framed queue slot
pub struct QueueSlot<'a> {
    visual: &'a SlotVisual,
    number: usize,
    arrival: Option<Arrival<'a>>,
}

impl<'a> QueueSlot<'a> {
    /// Slot `number` (1-based, shown in the frame title)
    pub fn new(visual: &'a SlotVisual, number: usize) -> Self {
        Self {
            visual,
            number,
            arrival: None,
        }
    }

    pub fn arrival(mut self, arrival: Option<Arrival<'a>>) -> Self {
        self.arrival = arrival;
        self
    }
}

impl Widget for QueueSlot<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let occupied = !self.visual.is_empty() || self.arrival.is_some();
        let frame = if occupied { SLOT_FRAME } else { SLOT_OPEN };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(frame))
            .title(format!(" {} ", self.number));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let center_y = badge_row(inner);
        let badge_style = Style::default().fg(BADGE).add_modifier(Modifier::BOLD);

        match self.visual {
            SlotVisual::Initials { label, text, .. } => {
                put_centered(buf, inner, center_y, text, badge_style);
                put_label(buf, inner, label);
            }
            SlotVisual::Avatar { label, .. } => {
                put_centered(buf, inner, center_y, AVATAR_GLYPH, Style::default().fg(AVATAR_MARK));
                put_label(buf, inner, label);
            }
            SlotVisual::Empty => {
                if let Some(arrival) = self.arrival {
                    let y = coin_row(inner, center_y, arrival.progress);
                    let coin = format!("({})", arrival.badge);
                    let style = Style::default().fg(COIN_GOLD).add_modifier(Modifier::BOLD);
                    put_centered(buf, inner, y, &coin, style);
                } else {
                    put_centered(buf, inner, center_y, OPEN_TEXT, Style::default().fg(DIM_GRAY));
                }
            }
        }
    }
}

/// Row the badge rests on; leaves the last row for the label when possible
fn badge_row(inner: Rect) -> u16 {
    let usable = if inner.height > 2 {
        inner.height - 1
    } else {
        inner.height
    };
    inner.y + usable.saturating_sub(1) / 2
}

/// Row of the rising coin at `progress`
fn coin_row(inner: Rect, rest: u16, progress: f32) -> u16 {
    let bottom = inner.y + inner.height.saturating_sub(1);
    let travel = f32::from(bottom.saturating_sub(rest));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let risen = (travel * progress.clamp(0.0, 1.0)).round() as u16;
    bottom.saturating_sub(risen).max(rest)
}

fn put_label(buf: &mut Buffer, inner: Rect, label: &str) {
    if inner.height > 2 {
        let y = inner.y + inner.height - 1;
        put_centered(buf, inner, y, label, Style::default().fg(LABEL));
    }
}

fn put_centered(buf: &mut Buffer, inner: Rect, y: u16, text: &str, style: Style) {
    let text = fit(text, inner.width as usize);
    #[allow(clippy::cast_possible_truncation)]
    let width = text.width() as u16;
    let x = inner.x + inner.width.saturating_sub(width) / 2;
    buf.set_string(x, y, &text, style);
}

/// Truncate to at most `width` columns
pub fn fit(text: &str, width: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}
