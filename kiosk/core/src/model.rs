//! Queue Data Model
//!
//! Value types shared by every part of the kiosk: players, queue snapshots,
//! and the coarse session status reported by the backend.
//!
//! # Design Philosophy
//!
//! The backend owns all of these. The kiosk never edits a player or splices a
//! snapshot; a newer snapshot replaces an older one wholesale.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend identity of a player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player as the backend describes them
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Backend identity
    pub id: PlayerId,
    /// Unique username (generated by the profile kiosk)
    #[serde(default)]
    pub username: String,
    /// Optional display name chosen by the player
    #[serde(default)]
    pub name: Option<String>,
    /// Optional avatar image reference
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Player {
    /// Create a player with only the required fields
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id: PlayerId(id),
            username: username.into(),
            name: None,
            avatar_url: None,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the avatar reference
    #[must_use]
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Name to show in banners: display name, else username, else "Player"
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.username.is_empty() => &self.username,
            _ => "Player",
        }
    }
}

/// An ordered, point-in-time view of the queue
///
/// Entries are positional. `None` is an open slot: the backend listed an entry
/// without a resolvable player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    entries: Vec<Option<Player>>,
}

impl QueueSnapshot {
    /// Create a snapshot from positional entries
    pub fn new(entries: Vec<Option<Player>>) -> Self {
        Self { entries }
    }

    /// Create a snapshot where every entry is occupied
    pub fn from_players(players: impl IntoIterator<Item = Player>) -> Self {
        Self {
            entries: players.into_iter().map(Some).collect(),
        }
    }

    /// The empty queue
    pub fn empty() -> Self {
        Self::default()
    }

    /// Drop entries beyond `capacity`
    #[must_use]
    pub fn truncated(mut self, capacity: usize) -> Self {
        self.entries.truncate(capacity);
        self
    }

    /// The first `len` entries (the pre-arrival view)
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            entries: self.entries.iter().take(len).cloned().collect(),
        }
    }

    /// Positional entries
    pub fn entries(&self) -> &[Option<Player>] {
        &self.entries
    }

    /// Player at `index`, if that entry exists and is occupied
    pub fn entry(&self, index: usize) -> Option<&Player> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied entries
    pub fn occupant_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Occupied entries in order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.entries.iter().flatten()
    }

    /// Whether the given player holds any slot
    pub fn contains(&self, id: PlayerId) -> bool {
        self.players().any(|p| p.id == id)
    }

    /// Number of positional entries (occupied or not)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Coarse session status of the kiosk's game
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KioskStatus {
    /// No game in play
    #[default]
    Idle,
    /// A game session is running
    Running,
}

impl KioskStatus {
    /// Map a wire value; anything but `"running"` is idle
    pub fn from_wire(value: &str) -> Self {
        if value == "running" {
            Self::Running
        } else {
            Self::Idle
        }
    }

    /// Whether a game is in play
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// A kiosk trait with a visible level (e.g. "physical": 3)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitLevel {
    /// Trait key
    pub key: String,
    /// Configured level (always > 0)
    pub level: u32,
}

/// Status report for the kiosk
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusReport {
    /// Session status
    pub status: KioskStatus,
    /// Running session, if any
    pub session_id: Option<i64>,
    /// Game modes offered by this kiosk
    pub modes: Vec<String>,
    /// Objective hints for players
    pub objectives: Vec<String>,
    /// Raw trait levels keyed by trait name
    pub traits: BTreeMap<String, serde_json::Value>,
}

impl StatusReport {
    /// Offered modes, falling back to a single "default" mode
    pub fn modes(&self) -> Vec<String> {
        if self.modes.is_empty() {
            vec!["default".to_string()]
        } else {
            self.modes.clone()
        }
    }

    /// Traits with a numeric level above zero
    pub fn visible_traits(&self) -> Vec<TraitLevel> {
        self.traits
            .iter()
            .filter_map(|(key, value)| {
                let level = trait_level(value);
                (level > 0).then(|| TraitLevel {
                    key: key.clone(),
                    level,
                })
            })
            .collect()
    }
}

fn trait_level(value: &serde_json::Value) -> u32 {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() && raw > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = raw.round().min(f64::from(u32::MAX)) as u32;
        level
    } else {
        0
    }
}

/// Result of submitting a scanned band
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Band belongs to a player, who is now queued
    Known {
        /// The queued player
        player_id: PlayerId,
    },
    /// Band is not registered
    Unknown {
        /// Backend-provided explanation
        message: String,
    },
}

/// Response to a start-game request
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SessionStart {
    /// Session identifier
    pub id: i64,
    /// Session status ("running" when this request started it)
    pub status: String,
}

impl SessionStart {
    /// Whether the session is now in play
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Response to the development enqueue helper
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DevEnqueueOutcome {
    /// A development player was queued
    Queued {
        /// The queued player
        player_id: PlayerId,
    },
    /// Nothing was queued
    Rejected {
        /// Backend-provided reason
        detail: String,
    },
}

/// Response to a leave-queue request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The player was removed from the queue
    Left,
    /// The backend kept the queue as it was
    Refused {
        /// Backend-provided reason
        detail: String,
    },
}

/// One past game of a player
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HistoryEntry {
    /// Session identifier
    pub session_id: i64,
    /// Stable game identifier, used to group sessions
    #[serde(default)]
    pub game_id: Option<String>,
    /// Game name, when known
    #[serde(default)]
    pub game_name: Option<String>,
    /// Kiosk the session was played on
    #[serde(default)]
    pub kiosk_id: Option<String>,
    /// Mode played
    #[serde(default)]
    pub mode: Option<String>,
    /// Score recorded for the player
    #[serde(default)]
    pub score: Option<i64>,
    /// ISO-8601 start time
    #[serde(default)]
    pub started_at: Option<String>,
    /// Session status
    #[serde(default)]
    pub status: Option<String>,
    /// Free-form per-player metrics (`stars`, `score`, `kiosk_mode`, ...)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metrics: BTreeMap<String, serde_json::Value>,
}

fn null_as_empty<'de, D>(de: D) -> Result<BTreeMap<String, serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::deserialize(de).map(Option::unwrap_or_default)
}

/// A profile change requested at the kiosk
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerUpdate {
    /// Set the display name (already trimmed, never empty)
    Rename(String),
    /// Let the backend pick a new random avatar
    RandomAvatar,
}

impl PlayerUpdate {
    /// A rename to `name`, or `None` when it is blank
    pub fn rename(name: &str) -> Option<Self> {
        let name = name.trim();
        (!name.is_empty()).then(|| Self::Rename(name.to_string()))
    }
}

/// Highest level a trait can show
pub const MAX_TRAIT_LEVEL: u32 = 5;

/// Fixed description of a kiosk trait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraitInfo {
    /// Wire key in the status `traits` map
    pub key: &'static str,
    /// Display label
    pub label: &'static str,
    /// What the trait means for players
    pub description: &'static str,
}

/// The traits every kiosk can describe, in display order
pub const TRAIT_CATALOG: [TraitInfo; 3] = [
    TraitInfo {
        key: "physical",
        label: "Physical",
        description: "Requires physically moving, climbing, jumping, or avoiding obstacles.",
    },
    TraitInfo {
        key: "mental",
        label: "Mental",
        description:
            "Requires problem solving skills, critical thinking, and/or communication skills.",
    },
    TraitInfo {
        key: "skill",
        label: "Skill",
        description: "May require a level of special skill or ability.",
    },
];

impl TraitInfo {
    /// Look up a trait by wire key
    pub fn find(key: &str) -> Option<&'static TraitInfo> {
        TRAIT_CATALOG.iter().find(|info| info.key == key)
    }

    /// This trait's level among `traits` (0 when absent), clamped to the scale
    pub fn level_in(&self, traits: &[TraitLevel]) -> u32 {
        traits
            .iter()
            .find(|t| t.key == self.key)
            .map_or(0, |t| t.level.min(MAX_TRAIT_LEVEL))
    }
}

/// Level as filled and open dots ("●●●○○"); `None` for level 0
pub fn level_dots(level: u32) -> Option<String> {
    let level = level.min(MAX_TRAIT_LEVEL);
    if level == 0 {
        return None;
    }
    Some(
        (0..MAX_TRAIT_LEVEL)
            .map(|i| if i < level { '●' } else { '○' })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(id: i64) -> Player {
        Player::new(id, format!("player_{id}"))
    }

    #[test]
    fn test_occupant_count_skips_open_slots() {
        let snapshot = QueueSnapshot::new(vec![Some(p(1)), None, Some(p(3))]);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.occupant_count(), 2);
        assert!(snapshot.entry(1).is_none());
        assert_eq!(snapshot.entry(2).map(|p| p.id), Some(PlayerId(3)));
    }

    #[test]
    fn test_prefix_and_truncate() {
        let snapshot = QueueSnapshot::from_players((1..=8).map(p));
        assert_eq!(snapshot.prefix(2).occupant_count(), 2);
        assert_eq!(snapshot.prefix(20).len(), 8);
        assert_eq!(snapshot.clone().truncated(6).len(), 6);
        assert!(snapshot.contains(PlayerId(8)));
        assert!(!snapshot.truncated(6).contains(PlayerId(8)));
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(p(1).with_name("Ada L").display_name(), "Ada L");
        assert_eq!(p(1).with_name("").display_name(), "player_1");
        assert_eq!(Player::new(1, "").display_name(), "Player");
    }

    #[test]
    fn test_status_from_wire() {
        assert_eq!(KioskStatus::from_wire("running"), KioskStatus::Running);
        assert_eq!(KioskStatus::from_wire("idle"), KioskStatus::Idle);
        assert_eq!(KioskStatus::from_wire("paused"), KioskStatus::Idle);
    }

    #[test]
    fn test_rename_rejects_blank_names() {
        assert_eq!(PlayerUpdate::rename("  "), None);
        assert_eq!(
            PlayerUpdate::rename("  Ada "),
            Some(PlayerUpdate::Rename("Ada".to_string()))
        );
    }

    #[test]
    fn test_trait_levels_clamp_to_scale() {
        let traits = vec![
            TraitLevel {
                key: "physical".into(),
                level: 3,
            },
            TraitLevel {
                key: "skill".into(),
                level: 9,
            },
        ];
        let physical = TraitInfo::find("physical").unwrap();
        let mental = TraitInfo::find("mental").unwrap();
        let skill = TraitInfo::find("skill").unwrap();

        assert_eq!(physical.level_in(&traits), 3);
        assert_eq!(mental.level_in(&traits), 0);
        assert_eq!(skill.level_in(&traits), 5);
        assert!(TraitInfo::find("luck").is_none());

        assert_eq!(level_dots(3).as_deref(), Some("●●●○○"));
        assert_eq!(level_dots(12).as_deref(), Some("●●●●●"));
        assert_eq!(level_dots(0), None);
    }

    #[test]
    fn test_history_entry_keeps_grouping_fields() {
        let entry: HistoryEntry = serde_json::from_str(
            r#"{"session_id": 4, "game_id": "laser", "kiosk_id": "arena-1",
                "score": 120, "metrics": {"stars": 2}, "play_time_sec": 90}"#,
        )
        .unwrap();
        assert_eq!(entry.game_id.as_deref(), Some("laser"));
        assert_eq!(entry.kiosk_id.as_deref(), Some("arena-1"));
        assert_eq!(entry.metrics.get("stars"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_status_report_defaults_and_traits() {
        let mut report = StatusReport::default();
        assert_eq!(report.modes(), vec!["default".to_string()]);

        report.traits.insert("physical".into(), serde_json::json!(3));
        report.traits.insert("mental".into(), serde_json::json!(0));
        report.traits.insert("skill".into(), serde_json::json!("2"));
        report.traits.insert("luck".into(), serde_json::json!(null));

        assert_eq!(
            report.visible_traits(),
            vec![
                TraitLevel {
                    key: "physical".into(),
                    level: 3
                },
                TraitLevel {
                    key: "skill".into(),
                    level: 2
                },
            ]
        );
    }
}
