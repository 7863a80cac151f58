// League-wide game listings: today's games and the full season history.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::Config;
use crate::dedup::{dedup_by_content, dedup_by_id, KeyBucket};
use crate::eligibility::{check_binding, check_mode_and_season};
use crate::record::GameRecord;

const GAME_TIME_FORMAT: &str = "%d-%m-%Y - %-I:%M %p";
const GROUP_DATE_FORMAT: &str = "%d-%m-%Y";

/// Games of one local calendar day, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub date: String,
    pub games: Vec<String>,
}

/// Full history grouped by local date. Groups are ordered by their most
/// recent game, newest first; serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedHistory {
    pub groups: Vec<DateGroup>,
}

impl GroupedHistory {
    pub fn get(&self, date: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.date == date)
            .map(|g| g.games.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for GroupedHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.date, &group.games)?;
        }
        map.end()
    }
}

/// Display line for a game, e.g. `Red Sox 5 - Yankees 2  - 02-12-2025 - 6:10 pm ET`.
pub fn format_game(record: &GameRecord, local: &DateTime<Tz>, et_offset_hours: i64) -> String {
    let shown = *local - Duration::hours(et_offset_hours);
    let when = shown.format(GAME_TIME_FORMAT).to_string().to_lowercase();
    format!(
        "{} {} - {} {}  - {} ET",
        record.home_team(),
        record.home_runs(),
        record.away_team(),
        record.away_runs(),
        when
    )
}

/// Records that survive dedup and the league-view checks, with their local
/// time. `keep` filters on the local time before content dedup.
fn league_view<F>(
    records: Vec<GameRecord>,
    bucket: KeyBucket,
    config: &Config,
    keep: F,
) -> Vec<(DateTime<Tz>, GameRecord)>
where
    F: Fn(&DateTime<Tz>) -> bool,
{
    let tz = &config.timezone;
    let windowed = dedup_by_id(records)
        .into_iter()
        .filter(|g| check_mode_and_season(g, config).is_ok())
        .filter(|g| g.played_at_local(tz).is_some_and(|t| keep(&t)))
        .collect();

    dedup_by_content(windowed, bucket, tz)
        .into_iter()
        .filter(|g| check_binding(g, config).is_ok())
        .filter_map(|g| g.played_at_local(tz).map(|t| (t, g)))
        .collect()
}

/// Games played on `now`'s local calendar day, oldest first.
pub fn games_today(records: Vec<GameRecord>, config: &Config, now: &DateTime<Tz>) -> Vec<String> {
    let today = now.date_naive();
    let mut games = league_view(records, KeyBucket::None, config, |t| t.date_naive() == today);
    games.sort_by_key(|(t, _)| *t);
    games
        .iter()
        .map(|(t, g)| format_game(g, t, config.league.et_offset_hours))
        .collect()
}

/// Every league game since the season start, grouped by local date.
///
/// The season floor is `season_start` read as UTC, the same instant the
/// standings use. Reading it as display-timezone local time would start the
/// history a few hours later (three in Santiago summer), so games in that gap
/// appear here.
pub fn full_history(records: Vec<GameRecord>, config: &Config) -> GroupedHistory {
    let mut games = league_view(records, KeyBucket::Minute, config, |_| true);
    games.sort_by(|(a, _), (b, _)| b.cmp(a));

    let mut groups: Vec<DateGroup> = Vec::new();
    for (t, g) in &games {
        let date = t.format(GROUP_DATE_FORMAT).to_string();
        let line = format_game(g, t, config.league.et_offset_hours);
        match groups.last_mut() {
            Some(group) if group.date == date => group.games.push(line),
            _ => groups.push(DateGroup {
                date,
                games: vec![line],
            }),
        }
    }
    GroupedHistory { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::tests::{league_game, test_config};
    use chrono::TimeZone;
    use chrono_tz::America::Santiago;

    /// League game at a UTC `display_date` with its own id and score.
    fn game_at(id: &str, date: &str, home_runs: &str) -> GameRecord {
        GameRecord {
            id: id.into(),
            display_date: date.into(),
            home_runs: home_runs.into(),
            ..league_game()
        }
    }

    fn santiago(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Santiago.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn formats_game_line_one_hour_back() {
        // 22:10 UTC is 19:10 in Santiago (UTC-3 in December).
        let g = league_game();
        let local = g.played_at_local(&Santiago).unwrap();
        assert_eq!(
            format_game(&g, &local, 1),
            "Red Sox 5 - Yankees 2  - 02-12-2025 - 6:10 pm ET"
        );
    }

    #[test]
    fn formats_morning_without_hour_padding() {
        let g = game_at("1", "12/02/2025 12:05", "1");
        let local = g.played_at_local(&Santiago).unwrap();
        assert_eq!(
            format_game(&g, &local, 1),
            "Red Sox 1 - Yankees 2  - 02-12-2025 - 8:05 am ET"
        );
    }

    #[test]
    fn today_keeps_only_local_day_sorted_ascending() {
        let config = test_config();
        let records = vec![
            game_at("1", "12/03/2025 01:30", "7"), // 22:30 on the 2nd locally
            game_at("2", "12/02/2025 15:00", "3"),
            game_at("3", "12/03/2025 03:30", "9"), // 00:30 on the 3rd locally
            game_at("4", "12/01/2025 15:00", "4"),
        ];
        let now = santiago(2025, 12, 2, 23, 59);

        let items = games_today(records, &config, &now);
        assert_eq!(
            items,
            vec![
                "Red Sox 3 - Yankees 2  - 02-12-2025 - 11:00 am ET",
                "Red Sox 7 - Yankees 2  - 02-12-2025 - 9:30 pm ET",
            ]
        );
    }

    #[test]
    fn today_drops_content_duplicates_and_unbound_games() {
        let config = test_config();
        let records = vec![
            game_at("1", "12/02/2025 15:00", "3"),
            game_at("2", "12/02/2025 15:07", "3"), // same content, new id
            GameRecord {
                away_name: "CPU".into(),
                ..game_at("3", "12/02/2025 16:00", "8")
            },
            GameRecord {
                game_mode: "RANKED".into(),
                ..game_at("4", "12/02/2025 17:00", "6")
            },
        ];
        let now = santiago(2025, 12, 2, 12, 0);

        let items = games_today(records, &config, &now);
        assert_eq!(items.len(), 1);
        assert!(items[0].starts_with("Red Sox 3 - Yankees 2"));
    }

    #[test]
    fn history_groups_by_local_date_newest_first() {
        let config = test_config();
        let records = vec![
            game_at("1", "12/01/2025 15:00", "1"),
            game_at("2", "12/02/2025 15:00", "2"),
            game_at("3", "12/02/2025 20:00", "3"),
            game_at("4", "12/03/2025 01:00", "4"), // still the 2nd locally
            game_at("5", "11/20/2025 15:00", "5"), // before season start
        ];

        let history = full_history(records, &config);
        let dates: Vec<&str> = history.groups.iter().map(|g| g.date.as_str()).collect();
        assert_eq!(dates, vec!["02-12-2025", "01-12-2025"]);

        let day = history.get("02-12-2025").unwrap();
        assert_eq!(day.len(), 3);
        assert!(day[0].starts_with("Red Sox 4"));
        assert!(day[1].starts_with("Red Sox 3"));
        assert!(day[2].starts_with("Red Sox 2"));
    }

    #[test]
    fn history_season_floor_is_utc() {
        // 01:00 UTC on the 29th is 22:00 on the 28th in Santiago.
        let config = test_config();
        let records = vec![
            game_at("1", "11/29/2025 01:00", "1"),
            game_at("2", "11/28/2025 23:59", "2"),
        ];
        let history = full_history(records, &config);
        assert_eq!(history.len(), 1);
        let day = history.get("28-11-2025").unwrap();
        assert_eq!(day.len(), 1);
        assert!(day[0].starts_with("Red Sox 1"));
    }

    #[test]
    fn history_keeps_rematches_minutes_apart() {
        let config = test_config();
        let records = vec![
            game_at("1", "12/02/2025 15:00:10", "3"),
            game_at("2", "12/02/2025 15:00:50", "3"),
            game_at("3", "12/02/2025 16:45:00", "3"),
        ];
        let history = full_history(records, &config);
        assert_eq!(history.get("02-12-2025").map(<[String]>::len), Some(2));
    }

    #[test]
    fn history_serializes_in_group_order() {
        let history = GroupedHistory {
            groups: vec![
                DateGroup {
                    date: "02-12-2025".into(),
                    games: vec!["b".into()],
                },
                DateGroup {
                    date: "01-12-2025".into(),
                    games: vec!["a".into()],
                },
            ],
        };
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"{"02-12-2025":["b"],"01-12-2025":["a"]}"#);
    }
}
