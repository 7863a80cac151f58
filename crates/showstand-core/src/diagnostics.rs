// Standings audit: why each fetched record was or was not counted.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::Config;
use crate::dedup::{dedup_by_id, CanonicalKey, KeyBucket};
use crate::eligibility::{check_eligibility, Exclusion};
use crate::record::{GameRecord, UserHistory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: String,
    pub team_in_focus: String,
    pub user: String,
    pub home_team: String,
    pub away_team: String,
    pub home_user: String,
    pub away_user: String,
    pub home_runs: String,
    pub away_runs: String,
    pub mode: String,
    pub display_date: String,
    pub included_in_standings: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_if_excluded: Option<Exclusion>,
}

impl AuditEntry {
    fn new(record: &GameRecord, history: &UserHistory, verdict: Result<(), Exclusion>) -> Self {
        Self {
            id: record.id().to_string(),
            team_in_focus: history.entry.team.clone(),
            user: history.entry.user.clone(),
            home_team: record.home_team().to_string(),
            away_team: record.away_team().to_string(),
            home_user: record.home_name.clone(),
            away_user: record.away_name.clone(),
            home_runs: record.home_runs().to_string(),
            away_runs: record.away_runs().to_string(),
            mode: record.game_mode.clone(),
            display_date: record.display_date.clone(),
            included_in_standings: verdict.is_ok(),
            reason_if_excluded: verdict.err(),
        }
    }
}

/// One audit entry per id-deduplicated record of a user's history. Records
/// the standings content pass drops are reported as
/// [`Exclusion::ContentDuplicate`]; the rest carry the first eligibility rule
/// they failed.
pub fn audit_history(history: &UserHistory, config: &Config) -> Vec<AuditEntry> {
    let mut seen = HashSet::new();
    dedup_by_id(history.records.clone())
        .iter()
        .map(|g| {
            let key = CanonicalKey::of(g, KeyBucket::Minute, &config.timezone);
            let verdict = if seen.insert(key) {
                check_eligibility(g, &history.entry.team, config)
            } else {
                Err(Exclusion::ContentDuplicate)
            };
            AuditEntry::new(g, history, verdict)
        })
        .collect()
}

/// Audit every history, in roster order.
pub fn audit_league(histories: &[UserHistory], config: &Config) -> Vec<AuditEntry> {
    histories
        .iter()
        .flat_map(|h| audit_history(h, config))
        .collect()
}
