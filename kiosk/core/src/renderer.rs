//! Queue Renderer
//!
//! Pure projection from positional queue entries and a fixed capacity to a
//! slot-by-slot visual description. Surfaces translate [`SlotVisual`] into
//! whatever they draw with; the renderer itself holds no state, so the same
//! input always yields the same [`QueueView`].

use serde::{Deserialize, Serialize};

use crate::model::{Player, PlayerId};

/// Username prefix of the backend's shared development players
pub const DEV_PLAYER_PREFIX: &str = "dev_player_";

/// Avatar shown for development players that have none of their own
pub const DEFAULT_AVATAR: &str = "/static/avatars/default.png";

/// Fallback badge when a player has neither name nor username
pub const FALLBACK_INITIALS: &str = "P";

/// What a single slot shows
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotVisual {
    /// Nobody here
    Empty,
    /// Player with an avatar image
    Avatar {
        /// Occupant
        player_id: PlayerId,
        /// Label for the slot (username)
        label: String,
        /// Image reference
        url: String,
    },
    /// Player shown as a two-character badge
    Initials {
        /// Occupant
        player_id: PlayerId,
        /// Label for the slot (username)
        label: String,
        /// Badge text
        text: String,
    },
}

impl SlotVisual {
    /// Occupant of this slot
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::Empty => None,
            Self::Avatar { player_id, .. } | Self::Initials { player_id, .. } => Some(*player_id),
        }
    }

    /// Whether the slot is unoccupied
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A complete rendered queue: exactly `capacity` slots
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueView {
    /// One entry per slot, in queue order
    pub slots: Vec<SlotVisual>,
}

impl QueueView {
    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Render positional entries into `capacity` slots
///
/// Entries beyond `capacity` are ignored; missing entries render empty.
pub fn render(entries: &[Option<Player>], capacity: usize) -> QueueView {
    let slots = (0..capacity)
        .map(|i| match entries.get(i) {
            Some(Some(player)) => slot_for(player),
            _ => SlotVisual::Empty,
        })
        .collect();
    QueueView { slots }
}

fn slot_for(player: &Player) -> SlotVisual {
    let label = player.username.clone();
    match avatar_url(player) {
        Some(url) => SlotVisual::Avatar {
            player_id: player.id,
            label,
            url: url.to_string(),
        },
        None => SlotVisual::Initials {
            player_id: player.id,
            label,
            text: initials(player),
        },
    }
}

/// Avatar reference for a player, if any
pub fn avatar_url(player: &Player) -> Option<&str> {
    match player.avatar_url.as_deref() {
        Some(url) if !url.is_empty() => Some(url),
        _ if player.username.starts_with(DEV_PLAYER_PREFIX) => Some(DEFAULT_AVATAR),
        _ => None,
    }
}

/// Two-character badge for a player
///
/// First letters of the first two space-separated tokens of the display name;
/// else the first two characters of the username; else `"P"`. Uppercased.
pub fn initials(player: &Player) -> String {
    let source = match player.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => player.username.as_str(),
    };

    let from_name: String = source
        .split(' ')
        .take(2)
        .filter_map(|token| token.chars().next())
        .collect();

    let badge = if from_name.is_empty() {
        player.username.chars().take(2).collect::<String>()
    } else {
        from_name
    };

    if badge.is_empty() {
        FALLBACK_INITIALS.to_string()
    } else {
        badge.to_uppercase()
    }
}
