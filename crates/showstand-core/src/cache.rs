// Cache artifacts: the documents a run writes and the snapshot the served
// endpoint reads back.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::standings::TeamStanding;

pub const STANDINGS_FILE: &str = "standings_cache.json";
pub const TODAY_FILE: &str = "games_today.json";
pub const HISTORY_FILE: &str = "history.json";
pub const AUDIT_FILE: &str = "standings_debug.json";

/// Layout of `generated_at` and `last_updated`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsDocument {
    pub generated_at: String,
    pub standings: Vec<TeamStanding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayDocument {
    pub generated_at: String,
    pub items: Vec<String>,
}

/// What the served endpoint returns: the cached document plus when the cache
/// file was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServedSnapshot {
    #[serde(flatten)]
    pub document: StandingsDocument,
    pub last_updated: String,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("data not available yet: {path} does not exist")]
    Absent { path: PathBuf },

    #[error("failed to read cached data {path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("cached data {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CacheError {
    /// HTTP status the served endpoint answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            CacheError::Absent { .. } => 503,
            CacheError::Unreadable { .. } | CacheError::Corrupt { .. } => 500,
        }
    }
}

pub fn format_timestamp<Z: chrono::TimeZone>(at: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Serialize `value` as pretty JSON into `path`, via a temp file and rename so
/// readers never see a half-written document.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Read the standings cache for serving. A missing file and an unreadable or
/// corrupt one are distinct errors.
pub fn read_snapshot(path: &Path) -> Result<ServedSnapshot, CacheError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CacheError::Absent {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(CacheError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let unreadable = |source: io::Error| CacheError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let raw = fs::read_to_string(path).map_err(unreadable)?;
    let modified = metadata.modified().map_err(unreadable)?;

    let document: StandingsDocument =
        serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(ServedSnapshot {
        document,
        last_updated: format_timestamp(&DateTime::<Local>::from(modified)),
    })
}
