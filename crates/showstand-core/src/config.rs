// Configuration loading and parsing (league.toml, runtime.toml).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

use crate::identity::Membership;

/// Format of `league.season_start`.
pub const SEASON_START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

/// Immutable configuration for one pipeline run. Built once at startup and
/// passed by reference into every stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub adjustments: Adjustments,
    pub runtime: RuntimeConfig,
    /// `league.season_start`, parsed.
    pub season_start: DateTime<Utc>,
    /// `league.timezone`, parsed. Calendar days and display times use it.
    pub timezone: Tz,
    pub membership: Membership,
}

impl Config {
    /// Assemble and validate a config from its parsed sections.
    pub fn new(
        league: LeagueConfig,
        adjustments: Adjustments,
        runtime: RuntimeConfig,
    ) -> Result<Self, ConfigError> {
        let season_start = NaiveDateTime::parse_from_str(&league.season_start, SEASON_START_FORMAT)
            .map_err(|e| {
                ConfigError::invalid(
                    "league.season_start",
                    format!("expected `{SEASON_START_FORMAT}`, got {:?}: {e}", league.season_start),
                )
            })?
            .and_utc();
        let timezone: Tz = league.timezone.parse().map_err(|_| {
            ConfigError::invalid(
                "league.timezone",
                format!("unknown timezone {:?}", league.timezone),
            )
        })?;
        let membership =
            Membership::from_roster(&league.roster, &league.aliases, &league.extra_members);

        let config = Self {
            league,
            adjustments,
            runtime,
            season_start,
            timezone,
            membership,
        };
        validate(&config)?;
        Ok(config)
    }

    /// Exact handles fetched for a roster user: the user first, then aliases.
    pub fn fetch_handles(&self, user: &str) -> Vec<String> {
        let mut handles = vec![user.to_string()];
        if let Some(aliases) = self.league.aliases.get(user) {
            handles.extend(aliases.iter().cloned());
        }
        handles
    }

    /// Whether `team` is one of the roster's team names (exact, trimmed).
    pub fn is_roster_team(&self, team: &str) -> bool {
        let team = team.trim();
        self.league.roster.iter().any(|e| e.team == team)
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    #[serde(default)]
    adjustments: Adjustments,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Upstream game mode counted by the league, compared case-insensitively.
    pub mode: String,
    pub season_start: String,
    #[serde(default = "default_scheduled_games")]
    pub scheduled_games: i32,
    #[serde(default = "default_k_threshold")]
    pub k_threshold: i32,
    pub timezone: String,
    /// Hours subtracted from local time when printing game times.
    #[serde(default = "default_et_offset_hours")]
    pub et_offset_hours: i64,
    /// Recognized handles outside the roster (co-owned accounts).
    #[serde(default)]
    pub extra_members: Vec<String>,
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
}

fn default_scheduled_games() -> i32 {
    77
}

fn default_k_threshold() -> i32 {
    15
}

fn default_et_offset_hours() -> i64 {
    1
}

/// One roster line: the exact upstream handle and the team it manages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterEntry {
    pub user: String,
    pub team: String,
}

impl RosterEntry {
    pub fn new(user: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            team: team.into(),
        }
    }
}

/// Manual corrections applied after tallying, keyed by team name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Adjustments {
    #[serde(default)]
    pub record: HashMap<String, RecordAdjustment>,
    #[serde(default)]
    pub points: HashMap<String, PointAdjustment>,
}

impl Adjustments {
    pub fn record_for(&self, team: &str) -> RecordAdjustment {
        self.record.get(team).copied().unwrap_or_default()
    }

    pub fn points_for(&self, team: &str) -> Option<&PointAdjustment> {
        self.points.get(team)
    }
}

/// Win/loss deltas, written as `[wins, losses]` in TOML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "(i32, i32)")]
pub struct RecordAdjustment {
    pub wins: i32,
    pub losses: i32,
}

impl From<(i32, i32)> for RecordAdjustment {
    fn from((wins, losses): (i32, i32)) -> Self {
        Self { wins, losses }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PointAdjustment {
    pub points: i32,
    #[serde(default)]
    pub reason: String,
}

// ---------------------------------------------------------------------------
// runtime.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    pub run: RunSection,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    pub mode: RunMode,
}

/// `debug` additionally writes per-user dumps and the standings audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Online,
    Debug,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub endpoint: String,
    pub platform: String,
    pub pages: Vec<u32>,
    pub timeout_secs: u64,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/runtime.toml` under `base_dir`. Does not copy defaults.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let runtime_path = config_dir.join("runtime.toml");
    let runtime_text = read_file(&runtime_path)?;
    let runtime: RuntimeConfig =
        toml::from_str(&runtime_text).map_err(|e| ConfigError::ParseError {
            path: runtime_path.clone(),
            source: e,
        })?;

    Config::new(league_file.league, league_file.adjustments, runtime)
}

/// Copy every file in `defaults/` that `config/` lacks. Existing config files
/// are never overwritten. Returns the paths that were created.
///
/// A missing `defaults/` is fine as long as `config/` exists.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            })
        };
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}", config_dir.display()), e))?;
    let listing = fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}", defaults_dir.display()), e))?;

    let mut copied = Vec::new();
    for item in listing {
        let source = item
            .map_err(|e| copy_error(format!("cannot list {}", defaults_dir.display()), e))?
            .path();
        let Some(name) = source.file_name().filter(|_| source.is_file()) else {
            continue;
        };
        let target = config_dir.join(name);

        // create_new so a config written concurrently is left alone.
        let mut dest = match fs::OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(copy_error(format!("cannot create {}", target.display()), e)),
        };
        let mut src = fs::File::open(&source)
            .map_err(|e| copy_error(format!("cannot open {}", source.display()), e))?;
        io::copy(&mut src, &mut dest)
            .map_err(|e| copy_error(format!("cannot write {}", target.display()), e))?;
        copied.push(target);
    }

    Ok(copied)
}

fn copy_error(what: String, e: io::Error) -> ConfigError {
    ConfigError::DefaultsCopyError {
        message: format!("{what}: {e}"),
    }
}

/// Load `config/` under the working directory, seeding it from `defaults/`
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;

    if league.mode.trim().is_empty() {
        return Err(ConfigError::invalid("league.mode", "must not be empty"));
    }
    if league.roster.is_empty() {
        return Err(ConfigError::invalid("league.roster", "must list at least one team"));
    }
    if league.scheduled_games <= 0 {
        return Err(ConfigError::invalid(
            "league.scheduled_games",
            format!("must be > 0, got {}", league.scheduled_games),
        ));
    }

    if !(-24..=24).contains(&league.et_offset_hours) {
        return Err(ConfigError::invalid(
            "league.et_offset_hours",
            format!("must be within -24..=24, got {}", league.et_offset_hours),
        ));
    }

    let mut users = HashSet::new();
    let mut teams = HashSet::new();
    for entry in &league.roster {
        if entry.user.trim().is_empty() || entry.team.trim().is_empty() {
            return Err(ConfigError::invalid(
                "league.roster",
                "user and team must not be empty",
            ));
        }
        if !users.insert(entry.user.to_lowercase()) {
            return Err(ConfigError::invalid(
                "league.roster",
                format!("duplicate user {:?}", entry.user),
            ));
        }
        if !teams.insert(entry.team.clone()) {
            return Err(ConfigError::invalid(
                "league.roster",
                format!("duplicate team {:?}", entry.team),
            ));
        }
    }

    let adjusted = config
        .adjustments
        .record
        .keys()
        .map(|t| ("adjustments.record", t))
        .chain(config.adjustments.points.keys().map(|t| ("adjustments.points", t)));
    for (field, team) in adjusted {
        if !teams.contains(team) {
            return Err(ConfigError::invalid(
                field,
                format!("{team:?} is not a roster team"),
            ));
        }
    }

    let fetch = &config.runtime.fetch;
    if fetch.endpoint.trim().is_empty() {
        return Err(ConfigError::invalid("fetch.endpoint", "must not be empty"));
    }
    if fetch.pages.is_empty() {
        return Err(ConfigError::invalid("fetch.pages", "must list at least one page"));
    }
    let numeric_fields: &[(&str, u64)] = &[
        ("fetch.timeout_secs", fetch.timeout_secs),
        ("fetch.attempts", u64::from(fetch.attempts)),
        ("fetch.concurrency", fetch.concurrency as u64),
    ];
    for (name, val) in numeric_fields {
        if *val == 0 {
            return Err(ConfigError::invalid(name, "must be > 0"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
