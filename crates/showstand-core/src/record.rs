// Typed game-history record as returned by the upstream API.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::RosterEntry;

/// Accepted `display_date` layouts, tried in order.
pub const DISPLAY_DATE_FORMATS: [&str; 2] = ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Marker the upstream API puts on the winning side.
const WIN_MARKER: &str = "W";

/// One entry of a user's `game_history`. Every field is optional upstream and
/// defaults to empty text here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub game_mode: String,
    #[serde(deserialize_with = "lenient_text")]
    pub display_date: String,
    #[serde(deserialize_with = "lenient_text")]
    pub home_full_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub away_full_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub home_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub away_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub home_runs: String,
    #[serde(deserialize_with = "lenient_text")]
    pub away_runs: String,
    #[serde(deserialize_with = "lenient_text")]
    pub home_display_result: String,
    #[serde(deserialize_with = "lenient_text")]
    pub away_display_result: String,
    #[serde(deserialize_with = "lenient_text")]
    pub display_pitcher_info: String,
}

/// Which side of a game a team played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl GameRecord {
    /// Trimmed identifier; empty when the upstream omitted it.
    pub fn id(&self) -> &str {
        self.id.trim()
    }

    pub fn home_team(&self) -> &str {
        self.home_full_name.trim()
    }

    pub fn away_team(&self) -> &str {
        self.away_full_name.trim()
    }

    pub fn home_runs(&self) -> &str {
        runs_text(&self.home_runs)
    }

    pub fn away_runs(&self) -> &str {
        runs_text(&self.away_runs)
    }

    pub fn pitcher_info(&self) -> &str {
        self.display_pitcher_info.trim()
    }

    /// Whether the record was played in `mode` (case-insensitive).
    pub fn is_mode(&self, mode: &str) -> bool {
        self.game_mode.trim().eq_ignore_ascii_case(mode.trim())
    }

    /// Parsed `display_date` as a UTC instant, or `None` when unparsable.
    pub fn played_at(&self) -> Option<DateTime<Utc>> {
        parse_display_date(&self.display_date)
    }

    /// `played_at` converted to the league's display timezone.
    pub fn played_at_local(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        self.played_at().map(|t| t.with_timezone(tz))
    }

    /// The side whose result marker reads `W`, home checked first.
    pub fn winner(&self) -> Option<Side> {
        if is_win(&self.home_display_result) {
            Some(Side::Home)
        } else if is_win(&self.away_display_result) {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => self.home_team(),
            Side::Away => self.away_team(),
        }
    }
}

/// Everything fetched for one roster user (exact handle plus aliases),
/// duplicates included.
#[derive(Debug, Clone)]
pub struct UserHistory {
    pub entry: RosterEntry,
    pub records: Vec<GameRecord>,
}

/// Parse an upstream `display_date` under either accepted layout.
///
/// Upstream timestamps carry no offset and are read as UTC. That reading has
/// not been confirmed against the API; this is the only place that decides it.
pub fn parse_display_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let naive = DISPLAY_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
    Some(naive.and_utc())
}

fn is_win(marker: &str) -> bool {
    marker.trim().eq_ignore_ascii_case(WIN_MARKER)
}

fn runs_text(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.is_empty() { "0" } else { raw }
}

/// Accept strings, numbers, booleans or null and keep them as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}
