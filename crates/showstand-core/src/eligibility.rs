// Per-record inclusion rules for standings and league-wide views.

use std::fmt;

use serde::Serialize;

use crate::config::Config;
use crate::identity::is_non_human;
use crate::record::GameRecord;

/// First rule a record failed. Serialized as a stable reason code in the
/// standings audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    /// Not played in the league's game mode.
    GameMode,
    /// `display_date` did not parse.
    InvalidDate,
    /// Played before the season start.
    BeforeSeason,
    /// The team in focus played on neither side.
    TeamMismatch,
    /// A participant is neither a league member nor an allowed CPU opponent.
    OutsideLeague,
    /// A team name is not on the roster.
    UnknownTeam,
    /// A roster user was credited with a team other than their own.
    TeamUserMismatch,
    /// Same game as an earlier record under a different id.
    ContentDuplicate,
}

impl Exclusion {
    pub fn code(self) -> &'static str {
        match self {
            Exclusion::GameMode => "game_mode",
            Exclusion::InvalidDate => "invalid_date",
            Exclusion::BeforeSeason => "before_season",
            Exclusion::TeamMismatch => "team_mismatch",
            Exclusion::OutsideLeague => "outside_league",
            Exclusion::UnknownTeam => "unknown_team",
            Exclusion::TeamUserMismatch => "team_user_mismatch",
            Exclusion::ContentDuplicate => "content_duplicate",
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Decide whether `record` counts toward `team`'s standing.
///
/// Rules run in order and the first failure is returned:
/// 1. game mode matches the league mode
/// 2. `display_date` parses
/// 3. played on or after the season start
/// 4. `team` is the home or away team (case-insensitive)
/// 5. both users are league members, or one is a CPU opponent and the other a
///    member
pub fn check_eligibility(record: &GameRecord, team: &str, config: &Config) -> Result<(), Exclusion> {
    check_mode_and_season(record, config)?;

    let team = team.trim();
    let plays = record.home_team().eq_ignore_ascii_case(team)
        || record.away_team().eq_ignore_ascii_case(team);
    if !plays {
        return Err(Exclusion::TeamMismatch);
    }

    let members = &config.membership;
    let home_member = members.contains(&record.home_name);
    let away_member = members.contains(&record.away_name);
    let allowed = (home_member && away_member)
        || (is_non_human(&record.home_name) && away_member)
        || (is_non_human(&record.away_name) && home_member);
    if !allowed {
        return Err(Exclusion::OutsideLeague);
    }

    Ok(())
}

pub fn is_eligible(record: &GameRecord, team: &str, config: &Config) -> bool {
    check_eligibility(record, team, config).is_ok()
}

/// Game mode, date parse and season floor; the checks shared by every view.
pub fn check_mode_and_season(record: &GameRecord, config: &Config) -> Result<(), Exclusion> {
    if !record.is_mode(&config.league.mode) {
        return Err(Exclusion::GameMode);
    }
    let played_at = record.played_at().ok_or(Exclusion::InvalidDate)?;
    if played_at < config.season_start {
        return Err(Exclusion::BeforeSeason);
    }
    Ok(())
}

/// Team/user binding for league-wide views: both teams on the roster, both
/// users members, and a roster user credited only with their own team.
pub fn check_binding(record: &GameRecord, config: &Config) -> Result<(), Exclusion> {
    if !config.is_roster_team(record.home_team()) || !config.is_roster_team(record.away_team()) {
        return Err(Exclusion::UnknownTeam);
    }

    let members = &config.membership;
    if !members.contains(&record.home_name) || !members.contains(&record.away_name) {
        return Err(Exclusion::OutsideLeague);
    }

    let sides = [
        (&record.home_name, record.home_team()),
        (&record.away_name, record.away_team()),
    ];
    for (user, credited) in sides {
        if let Some(expected) = members.team_for(user) {
            if !expected.eq_ignore_ascii_case(credited) {
                return Err(Exclusion::TeamUserMismatch);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{
        Adjustments, FetchConfig, LeagueConfig, OutputConfig, RosterEntry, RunMode, RunSection,
        RuntimeConfig,
    };
    use std::collections::HashMap;

    /// Small three-team league used across the core crate's tests.
    pub(crate) fn test_config() -> Config {
        let mut aliases = HashMap::new();
        aliases.insert("Sacapeo860".to_string(), vec!["CMALDONADO101".to_string()]);

        let league = LeagueConfig {
            name: "Test League".into(),
            mode: "LEAGUE".into(),
            season_start: "2025-11-29 00:00:00".into(),
            scheduled_games: 77,
            k_threshold: 15,
            timezone: "America/Santiago".into(),
            et_offset_hours: 1,
            extra_members: vec!["AiramReynoso_".into()],
            roster: vec![
                RosterEntry::new("ENOVA23", "Red Sox"),
                RosterEntry::new("EFLORES1306", "Yankees"),
                RosterEntry::new("Sacapeo860", "Mets"),
            ],
            aliases,
        };
        let runtime = RuntimeConfig {
            run: RunSection {
                mode: RunMode::Online,
            },
            fetch: FetchConfig {
                endpoint: "http://localhost/game_history.json".into(),
                platform: "psn".into(),
                pages: vec![1, 2],
                timeout_secs: 5,
                attempts: 2,
                retry_delay_ms: 0,
                concurrency: 1,
            },
            output: OutputConfig { dir: "out".into() },
        };
        Config::new(league, Adjustments::default(), runtime).unwrap()
    }

    /// A valid league game between two roster users, Red Sox win at home.
    pub(crate) fn league_game() -> GameRecord {
        GameRecord {
            id: "100".into(),
            game_mode: "LEAGUE".into(),
            display_date: "12/02/2025 22:10:00".into(),
            home_full_name: "Red Sox".into(),
            away_full_name: "Yankees".into(),
            home_name: "ENOVA23".into(),
            away_name: "EFLORES1306".into(),
            home_runs: "5".into(),
            away_runs: "2".into(),
            home_display_result: "W".into(),
            away_display_result: "L".into(),
            display_pitcher_info: "W: Sale L: Cole".into(),
        }
    }

    #[test]
    fn valid_game_is_eligible_for_both_teams() {
        let config = test_config();
        assert!(is_eligible(&league_game(), "Red Sox", &config));
        assert!(is_eligible(&league_game(), "yankees", &config));
    }

    #[test]
    fn wrong_mode_is_excluded_first() {
        let config = test_config();
        let g = GameRecord {
            game_mode: "RANKED".into(),
            display_date: "garbage".into(),
            ..league_game()
        };
        assert_eq!(check_eligibility(&g, "Red Sox", &config), Err(Exclusion::GameMode));
    }

    #[test]
    fn unparsable_date_is_excluded() {
        let config = test_config();
        let g = GameRecord {
            display_date: "2025-12-02".into(),
            ..league_game()
        };
        assert_eq!(check_eligibility(&g, "Red Sox", &config), Err(Exclusion::InvalidDate));
    }

    #[test]
    fn season_start_is_inclusive() {
        let config = test_config();
        let on_start = GameRecord {
            display_date: "11/29/2025 00:00:00".into(),
            ..league_game()
        };
        let before = GameRecord {
            display_date: "11/28/2025 23:59".into(),
            ..league_game()
        };
        assert!(is_eligible(&on_start, "Red Sox", &config));
        assert_eq!(
            check_eligibility(&before, "Red Sox", &config),
            Err(Exclusion::BeforeSeason)
        );
    }

    #[test]
    fn team_not_playing_is_excluded() {
        let config = test_config();
        assert_eq!(
            check_eligibility(&league_game(), "Mets", &config),
            Err(Exclusion::TeamMismatch)
        );
    }

    #[test]
    fn cpu_opponent_on_one_side_is_allowed() {
        let config = test_config();
        let g = GameRecord {
            away_name: "^b3^CPU".into(),
            ..league_game()
        };
        assert!(is_eligible(&g, "Red Sox", &config));

        let g = GameRecord {
            home_name: "cpu".into(),
            ..league_game()
        };
        assert!(is_eligible(&g, "Red Sox", &config));
    }

    #[test]
    fn cpu_on_both_sides_is_excluded() {
        let config = test_config();
        let g = GameRecord {
            home_name: "CPU".into(),
            away_name: "CPU".into(),
            ..league_game()
        };
        assert_eq!(check_eligibility(&g, "Red Sox", &config), Err(Exclusion::OutsideLeague));
    }

    #[test]
    fn outsider_opponent_is_excluded() {
        let config = test_config();
        let g = GameRecord {
            away_name: "RandomPlayer99".into(),
            ..league_game()
        };
        assert_eq!(check_eligibility(&g, "Red Sox", &config), Err(Exclusion::OutsideLeague));
    }

    #[test]
    fn alias_and_tagged_handles_are_members() {
        let config = test_config();
        let g = GameRecord {
            home_full_name: "Mets".into(),
            home_name: "^b12^cmaldonado101".into(),
            ..league_game()
        };
        assert!(is_eligible(&g, "Mets", &config));
    }

    #[test]
    fn binding_accepts_roster_game() {
        let config = test_config();
        assert_eq!(check_binding(&league_game(), &config), Ok(()));
    }

    #[test]
    fn binding_rejects_non_roster_team() {
        let config = test_config();
        let g = GameRecord {
            away_full_name: "Astros".into(),
            ..league_game()
        };
        assert_eq!(check_binding(&g, &config), Err(Exclusion::UnknownTeam));
    }

    #[test]
    fn binding_rejects_cpu_opponent() {
        let config = test_config();
        let g = GameRecord {
            away_name: "CPU".into(),
            ..league_game()
        };
        assert_eq!(check_binding(&g, &config), Err(Exclusion::OutsideLeague));
    }

    #[test]
    fn binding_rejects_user_on_foreign_team() {
        let config = test_config();
        let g = GameRecord {
            home_full_name: "Mets".into(),
            ..league_game()
        };
        assert_eq!(check_binding(&g, &config), Err(Exclusion::TeamUserMismatch));
    }

    #[test]
    fn binding_lets_unbound_members_play_any_roster_team() {
        let config = test_config();
        let g = GameRecord {
            home_full_name: "Mets".into(),
            home_name: "AiramReynoso_".into(),
            ..league_game()
        };
        assert_eq!(check_binding(&g, &config), Ok(()));
    }

    #[test]
    fn exclusion_codes_serialize_snake_case() {
        let json = serde_json::to_string(&Exclusion::TeamUserMismatch).unwrap();
        assert_eq!(json, "\"team_user_mismatch\"");
        assert_eq!(Exclusion::BeforeSeason.to_string(), "before_season");
    }
}
