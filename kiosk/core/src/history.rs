//! Player History Summaries
//!
//! Groups a player's past sessions by game, then by mode, the way the profile
//! overlay presents them: total plays, best score, and the latest attempts.
//!
//! Scores come from three places. A `stars` metric wins (rendered as ★), then
//! the session score, then a `score` metric.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::HistoryEntry;

/// Attempts listed per mode
pub const RECENT_ATTEMPTS: usize = 5;

/// Stars at or below this render as repeated ★
const MAX_STARS: f64 = 3.0;

/// Comparable value and display label of one session's score
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreInfo {
    /// Numeric value, when the score is numeric
    pub raw: Option<f64>,
    /// What to show
    pub label: Option<String>,
}

/// One listed attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Score label, if any score was recorded
    pub score: Option<String>,
    /// When it was played, human readable
    pub when: String,
    /// Kiosk it was played on
    pub kiosk_id: Option<String>,
}

/// Sessions of one game in one mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeSummary {
    /// Normalized key ("team_play" and "Team_Play" share one)
    pub key: String,
    /// Display label ("Team Play")
    pub label: String,
    /// Sessions played in this mode
    pub plays: usize,
    /// Latest attempts, newest first
    pub attempts: Vec<Attempt>,
    /// Best score label in this mode
    pub best_score: Option<String>,
    /// When this mode was last played
    pub last_played: Option<String>,
}

/// Sessions of one game
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSummary {
    /// Game identifier ("unknown" when the backend had none)
    pub id: String,
    /// Display name
    pub name: String,
    /// Modes in order of first appearance
    pub modes: Vec<ModeSummary>,
    /// Sessions across all modes
    pub total_plays: usize,
    /// Best score label across all modes
    pub best_score: Option<String>,
}

/// Score of one session
pub fn score_info(entry: &HistoryEntry) -> ScoreInfo {
    if let Some(stars) = entry.metrics.get("stars").filter(|v| !v.is_null()) {
        let raw = numeric(stars);
        let label = match raw {
            Some(n) if (0.0..=MAX_STARS).contains(&n) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = n.round() as usize;
                if count == 0 {
                    "0★".to_string()
                } else {
                    "★".repeat(count)
                }
            }
            _ => format!("{}★", plain(stars)),
        };
        return ScoreInfo {
            raw,
            label: Some(label),
        };
    }
    if let Some(score) = entry.score {
        #[allow(clippy::cast_precision_loss)]
        let raw = score as f64;
        return ScoreInfo {
            raw: Some(raw),
            label: Some(score.to_string()),
        };
    }
    if let Some(score) = entry.metrics.get("score").filter(|v| !v.is_null()) {
        return ScoreInfo {
            raw: numeric(score),
            label: Some(plain(score)),
        };
    }
    ScoreInfo::default()
}

/// Normalize a mode name into a grouping key and a display label
///
/// Blank names become "default". Underscores become spaces and every word is
/// capitalized in the label.
pub fn normalize_mode(raw: &str) -> (String, String) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ("default".to_string(), "Default".to_string());
    }
    let mut label = String::with_capacity(trimmed.len());
    let mut word_start = true;
    for c in trimmed.replace('_', " ").chars() {
        if word_start && c.is_alphanumeric() {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
        word_start = !c.is_alphanumeric();
    }
    (trimmed.to_lowercase(), label)
}

/// Start time as "YYYY-MM-DD HH:MM"; other strings pass through
pub fn format_started_at(ts: &str) -> String {
    match ts.split_once('T') {
        Some((date, time)) => match time.get(..5) {
            Some(hm) => format!("{date} {hm}"),
            None => ts.to_string(),
        },
        None => ts.to_string(),
    }
}

/// Group sessions by game, then by mode
pub fn summarize(history: &[HistoryEntry]) -> Vec<GameSummary> {
    let mut games: Vec<GameBucket<'_>> = Vec::new();
    let mut by_id: HashMap<&str, usize> = HashMap::new();

    for entry in history {
        let id = entry.game_id.as_deref().unwrap_or("unknown");
        let index = *by_id.entry(id).or_insert_with(|| {
            games.push(GameBucket {
                id,
                name: entry.game_name.as_deref().unwrap_or(id),
                modes: Vec::new(),
                total: 0,
            });
            games.len() - 1
        });
        let game = &mut games[index];
        game.total += 1;

        let (key, label) = normalize_mode(entry_mode(entry));
        match game.modes.iter_mut().find(|m| m.key == key) {
            Some(mode) => mode.sessions.push(entry),
            None => game.modes.push(ModeBucket {
                key,
                label,
                sessions: vec![entry],
            }),
        }
    }

    games.into_iter().map(GameBucket::finish).collect()
}

struct GameBucket<'a> {
    id: &'a str,
    name: &'a str,
    modes: Vec<ModeBucket<'a>>,
    total: usize,
}

struct ModeBucket<'a> {
    key: String,
    label: String,
    sessions: Vec<&'a HistoryEntry>,
}

impl GameBucket<'_> {
    fn finish(self) -> GameSummary {
        let best_score = best(self.modes.iter().flat_map(|m| m.sessions.iter().copied()));
        GameSummary {
            id: self.id.to_string(),
            name: self.name.to_string(),
            modes: self.modes.into_iter().map(ModeBucket::finish).collect(),
            total_plays: self.total,
            best_score,
        }
    }
}

impl ModeBucket<'_> {
    fn finish(mut self) -> ModeSummary {
        self.sessions.sort_by(|a, b| started(b).cmp(started(a)));
        let attempts = self
            .sessions
            .iter()
            .take(RECENT_ATTEMPTS)
            .map(|entry| Attempt {
                score: score_info(entry).label,
                when: format_started_at(started(entry)),
                kiosk_id: entry.kiosk_id.clone(),
            })
            .collect();
        let last_played = self
            .sessions
            .first()
            .and_then(|entry| entry.started_at.as_deref())
            .map(format_started_at);

        ModeSummary {
            best_score: best(self.sessions.iter().copied()),
            plays: self.sessions.len(),
            key: self.key,
            label: self.label,
            attempts,
            last_played,
        }
    }
}

/// Label of the highest numeric score
fn best<'a>(sessions: impl Iterator<Item = &'a HistoryEntry>) -> Option<String> {
    let mut best: Option<(f64, String)> = None;
    for entry in sessions {
        let info = score_info(entry);
        if let Some(raw) = info.raw {
            if best.as_ref().map_or(true, |(current, _)| raw > *current) {
                best = Some((raw, info.label.unwrap_or_else(|| raw.to_string())));
            }
        }
    }
    best.map(|(_, label)| label)
}

fn entry_mode(entry: &HistoryEntry) -> &str {
    entry
        .mode
        .as_deref()
        .filter(|m| !m.is_empty())
        .or_else(|| entry.metrics.get("kiosk_mode").and_then(Value::as_str))
        .unwrap_or("default")
}

fn started(entry: &HistoryEntry) -> &str {
    entry.started_at.as_deref().unwrap_or("")
}

fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
