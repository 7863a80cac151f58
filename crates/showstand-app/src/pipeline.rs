// One full update run: fetch every roster user, derive standings and game
// listings, and write the cache artifacts.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use showstand_core::cache::{
    self, StandingsDocument, TodayDocument, AUDIT_FILE, HISTORY_FILE, STANDINGS_FILE, TODAY_FILE,
};
use showstand_core::config::{Config, RunMode};
use showstand_core::diagnostics::{audit_league, AuditEntry};
use showstand_core::record::{GameRecord, UserHistory};
use showstand_core::report::{full_history, games_today, GroupedHistory};
use showstand_core::standings::{rank, team_standing, TeamStanding};

use crate::fetcher::{HistoryFetcher, HistorySource};

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("file name pattern is valid"));

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub generated_at: String,
    pub standings: Vec<TeamStanding>,
    pub today: Vec<String>,
    pub history: GroupedHistory,
    /// Present in debug mode only.
    pub debug: Option<DebugOutput>,
}

#[derive(Debug, Clone, Default)]
pub struct DebugOutput {
    pub audit: Vec<AuditEntry>,
    pub captures: Vec<UserCapture>,
}

/// A user's history at each stage of the standings path.
#[derive(Debug, Clone, Serialize)]
pub struct UserCapture {
    pub user: String,
    pub raw: Vec<GameRecord>,
    pub deduped: Vec<GameRecord>,
    pub considered: Vec<GameRecord>,
}

/// Fetch the league and build every view. `now` fixes the "today" window.
pub async fn run<S: HistorySource>(
    config: &Config,
    fetcher: &HistoryFetcher<S>,
    now: DateTime<Tz>,
) -> RunOutput {
    let histories = fetcher.fetch_league(config).await;
    build_outputs(config, histories, now)
}

/// Derive standings, today's games, the full history and (in debug mode) the
/// audit from fetched histories.
pub fn build_outputs(config: &Config, histories: Vec<UserHistory>, now: DateTime<Tz>) -> RunOutput {
    let debug_mode = config.runtime.run.mode == RunMode::Debug;
    let audit = debug_mode.then(|| audit_league(&histories, config));

    let all_records: Vec<GameRecord> = histories
        .iter()
        .flat_map(|h| h.records.iter().cloned())
        .collect();

    let mut rows = Vec::with_capacity(histories.len());
    let mut captures = Vec::new();
    for history in histories {
        let raw = debug_mode.then(|| history.records.clone());
        let user = history.entry.user.clone();
        let (standing, games) = team_standing(history, config);
        rows.push(standing);
        if let Some(raw) = raw {
            captures.push(UserCapture {
                user,
                raw,
                deduped: games.deduped,
                considered: games.considered,
            });
        }
    }
    let standings = rank(rows);

    let today = games_today(all_records.clone(), config, &now);
    let history = full_history(all_records, config);
    info!(
        teams = standings.len(),
        today = today.len(),
        history_days = history.len(),
        "built league views"
    );

    RunOutput {
        generated_at: cache::format_timestamp(&now),
        standings,
        today,
        history,
        debug: audit.map(|audit| DebugOutput { audit, captures }),
    }
}

/// Write the run's artifacts into `out_dir`. Returns the written paths.
pub fn write_outputs(output: &RunOutput, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let standings = StandingsDocument {
        generated_at: output.generated_at.clone(),
        standings: output.standings.clone(),
    };
    write_artifact(out_dir, STANDINGS_FILE, &standings, &mut written)
        .context("failed to write standings cache")?;

    let today = TodayDocument {
        generated_at: output.generated_at.clone(),
        items: output.today.clone(),
    };
    write_artifact(out_dir, TODAY_FILE, &today, &mut written)
        .context("failed to write today's games")?;
    write_artifact(out_dir, HISTORY_FILE, &output.history, &mut written)
        .context("failed to write game history")?;

    if let Some(debug) = &output.debug {
        write_artifact(out_dir, AUDIT_FILE, &debug.audit, &mut written)
            .context("failed to write standings audit")?;
        for capture in &debug.captures {
            let base = safe_file_name(&capture.user);
            write_artifact(out_dir, &format!("{base}_raw.json"), &capture.raw, &mut written)?;
            write_artifact(out_dir, &format!("{base}_dedup.json"), &capture.deduped, &mut written)?;
            write_artifact(
                out_dir,
                &format!("{base}_considered.json"),
                &capture.considered,
                &mut written,
            )?;
        }
    }

    Ok(written)
}

/// Write one JSON artifact to `dir/name` and record its path.
fn write_artifact<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = dir.join(name);
    cache::write_json(&path, value)?;
    written.push(path);
    Ok(())
}

/// Replace runs of characters outside `[A-Za-z0-9._-]` with `_`.
pub fn safe_file_name(raw: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(raw, "_").into_owned()
}
