// User-handle canonicalization and league membership.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::RosterEntry;

/// Platform tag the upstream API splices into handles, e.g. `^b12^Player`.
static BRACKET_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\^b\d+\^").expect("bracket tag pattern is valid")
});

/// Handle the upstream API reports for computer-controlled opponents.
pub const NON_HUMAN_HANDLE: &str = "cpu";

/// Canonical comparison form of a raw handle: bracket tags removed, trimmed,
/// lower-cased. Empty input yields an empty string.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    BRACKET_TAG.replace_all(raw, "").trim().to_lowercase()
}

/// True when the handle belongs to a computer-controlled opponent.
pub fn is_non_human(raw: &str) -> bool {
    normalize(raw) == NON_HUMAN_HANDLE
}

/// Normalized set of handles that count as league members, plus the team
/// each roster handle (or one of its aliases) is bound to.
#[derive(Debug, Clone, Default)]
pub struct Membership {
    members: HashSet<String>,
    teams_by_user: HashMap<String, String>,
}

impl Membership {
    pub fn from_roster(
        roster: &[RosterEntry],
        aliases: &HashMap<String, Vec<String>>,
        extra_members: &[String],
    ) -> Self {
        let mut members = HashSet::new();
        let mut teams_by_user = HashMap::new();

        for entry in roster {
            let user = normalize(&entry.user);
            members.insert(user.clone());
            teams_by_user.insert(user, entry.team.clone());

            for alias in aliases.get(&entry.user).into_iter().flatten() {
                let alias = normalize(alias);
                members.insert(alias.clone());
                teams_by_user.entry(alias).or_insert_with(|| entry.team.clone());
            }
        }

        // Aliases keyed by a handle that is not on the roster still count as members.
        for (base, alts) in aliases {
            members.insert(normalize(base));
            members.extend(alts.iter().map(|a| normalize(a)));
        }
        members.extend(extra_members.iter().map(|u| normalize(u)));
        members.remove("");

        Self {
            members,
            teams_by_user,
        }
    }

    /// Whether the raw handle resolves to a league member.
    pub fn contains(&self, raw: &str) -> bool {
        self.members.contains(&normalize(raw))
    }

    /// Roster team the raw handle is bound to, if any.
    pub fn team_for(&self, raw: &str) -> Option<&str> {
        self.teams_by_user.get(&normalize(raw)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<RosterEntry> {
        vec![
            RosterEntry::new("ENOVA23", "Red Sox"),
            RosterEntry::new("Sacapeo860", "Mets"),
        ]
    }

    fn aliases() -> HashMap<String, Vec<String>> {
        let mut m = HashMap::new();
        m.insert(
            "Sacapeo860".to_string(),
            vec!["CMALDONADO101".to_string(), "CALLMETYRONE860".to_string()],
        );
        m
    }

    #[test]
    fn normalize_strips_tag_and_case() {
        assert_eq!(normalize("^b12^ENOVA23"), "enova23");
        assert_eq!(normalize("^B7^  Tabla25 "), "tabla25");
        assert_eq!(normalize("Handy-Barreto^b3^"), "handy-barreto");
    }

    #[test]
    fn normalize_strips_every_tag() {
        assert_eq!(normalize("^b1^^b22^Sacapeo860"), "sacapeo860");
    }

    #[test]
    fn normalize_keeps_non_tag_carets() {
        assert_eq!(normalize("^bx^user"), "^bx^user");
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn cpu_detection() {
        assert!(is_non_human("CPU"));
        assert!(is_non_human("^b4^cpu "));
        assert!(!is_non_human("cpu_fan"));
        assert!(!is_non_human(""));
    }

    #[test]
    fn membership_covers_roster_aliases_and_extras() {
        let extras = vec!["AiramReynoso_".to_string()];
        let m = Membership::from_roster(&roster(), &aliases(), &extras);

        assert!(m.contains("enova23"));
        assert!(m.contains("^b9^CMALDONADO101"));
        assert!(m.contains("airamreynoso_"));
        assert!(!m.contains("stranger"));
        assert!(!m.contains(""));
        assert_eq!(m.len(), 5);
    }

    #[test]
    fn aliases_bind_to_base_team() {
        let m = Membership::from_roster(&roster(), &aliases(), &[]);
        assert_eq!(m.team_for("CallMeTyrone860"), Some("Mets"));
        assert_eq!(m.team_for("ENOVA23"), Some("Red Sox"));
        assert_eq!(m.team_for("AiramReynoso_"), None);
    }
}
