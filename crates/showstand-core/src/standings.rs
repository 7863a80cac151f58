// Team records: tally, manual adjustments, ranking.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, RosterEntry};
use crate::dedup::{dedup_by_content, dedup_by_id, KeyBucket};
use crate::eligibility::is_eligible;
use crate::record::{GameRecord, Side, UserHistory};

/// Points per win and per loss.
const WIN_POINTS: i32 = 3;
const LOSS_POINTS: i32 = 1;

/// One row of the standings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub user: String,
    pub team: String,
    pub scheduled: i32,
    pub played: i32,
    pub wins: i32,
    pub losses: i32,
    pub remaining: i32,
    pub k: i32,
    pub points: i32,
}

/// The stages a team's history passes through, kept for dumps and logging.
#[derive(Debug, Clone, Default)]
pub struct TeamGames {
    pub raw: usize,
    pub deduped: Vec<GameRecord>,
    pub considered: Vec<GameRecord>,
}

/// Dedup a user's history (id pass, then content pass) and keep the records
/// that count toward `team`.
pub fn considered_games(records: Vec<GameRecord>, team: &str, config: &Config) -> TeamGames {
    let raw = records.len();
    let deduped = dedup_by_content(dedup_by_id(records), KeyBucket::Minute, &config.timezone);
    let considered = deduped
        .iter()
        .filter(|g| is_eligible(g, team, config))
        .cloned()
        .collect();
    TeamGames {
        raw,
        deduped,
        considered,
    }
}

/// Raw wins and losses for `team` over its considered games. Games with no
/// winner marked are skipped.
pub fn tally(team: &str, considered: &[GameRecord]) -> (i32, i32) {
    let team = team.trim();
    let mut wins = 0;
    let mut losses = 0;
    for g in considered {
        let Some(winner) = g.winner() else {
            continue;
        };
        let loser = match winner {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        };
        if g.team(winner).eq_ignore_ascii_case(team) {
            wins += 1;
        } else if g.team(loser).eq_ignore_ascii_case(team) {
            losses += 1;
        }
    }
    (wins, losses)
}

/// Build a standing from raw counts, applying the team's adjustments once.
pub fn aggregate(entry: &RosterEntry, wins: i32, losses: i32, config: &Config) -> TeamStanding {
    let league = &config.league;
    let record_adj = config.adjustments.record_for(&entry.team);
    let wins = wins + record_adj.wins;
    let losses = losses + record_adj.losses;

    let played = (wins + losses).max(0);
    let remaining = (league.scheduled_games - played).max(0);
    let mut points = WIN_POINTS * wins + LOSS_POINTS * losses;
    if let Some(adj) = config.adjustments.points_for(&entry.team) {
        info!(team = %entry.team, points = adj.points, reason = %adj.reason, "applying point adjustment");
        points += adj.points;
    }

    TeamStanding {
        user: entry.user.clone(),
        team: entry.team.clone(),
        scheduled: league.scheduled_games,
        played,
        wins,
        losses,
        remaining,
        k: (league.k_threshold - played).max(0),
        points,
    }
}

/// Order standings by points desc, wins desc, losses asc. The sort is stable
/// so full ties keep the incoming (roster) order.
pub fn rank(mut rows: Vec<TeamStanding>) -> Vec<TeamStanding> {
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then(a.losses.cmp(&b.losses))
    });
    rows
}

/// Standing for one roster user from everything fetched for them.
pub fn team_standing(history: UserHistory, config: &Config) -> (TeamStanding, TeamGames) {
    let UserHistory { entry, records } = history;
    let games = considered_games(records, &entry.team, config);
    info!(
        team = %entry.team,
        user = %entry.user,
        raw = games.raw,
        dedup = games.deduped.len(),
        considered = games.considered.len(),
        "captured games"
    );
    let (wins, losses) = tally(&entry.team, &games.considered);
    debug!(team = %entry.team, wins, losses, "raw tally");
    (aggregate(&entry, wins, losses, config), games)
}

/// Ranked standings for the whole league, one row per history in roster order.
pub fn compute_standings(histories: Vec<UserHistory>, config: &Config) -> Vec<TeamStanding> {
    let rows = histories
        .into_iter()
        .map(|h| team_standing(h, config).0)
        .collect();
    rank(rows)
}
