// Duplicate removal: identifier pass, then content (canonical key) pass.

use std::collections::HashSet;

use chrono_tz::Tz;

use crate::record::GameRecord;

/// Layout of the minute bucket folded into the canonical key.
const MINUTE_BUCKET_FORMAT: &str = "%Y%m%d%H%M";

/// Drop records whose non-empty id was already seen. Records without an id
/// always pass. First-seen order is preserved.
pub fn dedup_by_id(records: Vec<GameRecord>) -> Vec<GameRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|g| {
            let id = g.id();
            id.is_empty() || seen.insert(id.to_string())
        })
        .collect()
}

/// Whether the canonical key includes the local minute a game was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBucket {
    None,
    Minute,
}

/// Content fingerprint of a game, independent of its upstream id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey {
    pub home_team: String,
    pub away_team: String,
    pub home_runs: String,
    pub away_runs: String,
    pub pitcher_info: String,
    pub minute: Option<String>,
}

impl CanonicalKey {
    pub fn of(record: &GameRecord, bucket: KeyBucket, tz: &Tz) -> Self {
        let minute = match bucket {
            KeyBucket::None => None,
            KeyBucket::Minute => Some(
                record
                    .played_at_local(tz)
                    .map(|t| t.format(MINUTE_BUCKET_FORMAT).to_string())
                    .unwrap_or_default(),
            ),
        };
        Self {
            home_team: record.home_team().to_string(),
            away_team: record.away_team().to_string(),
            home_runs: record.home_runs().to_string(),
            away_runs: record.away_runs().to_string(),
            pitcher_info: record.pitcher_info().to_string(),
            minute,
        }
    }
}

/// Drop records whose canonical key was already seen, even when their ids
/// differ or are missing. Run after [`dedup_by_id`].
pub fn dedup_by_content(records: Vec<GameRecord>, bucket: KeyBucket, tz: &Tz) -> Vec<GameRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|g| seen.insert(CanonicalKey::of(g, bucket, tz)))
        .collect()
}
