//! Team name to team code lookup.
//!
//! The scoreboard page renders short city names ("LA Lakers", "Golden State")
//! while game pages are addressed by three-letter codes. [`TeamCodes`] bridges
//! the two. It is an ordinary immutable value: the defaults below can be
//! replaced wholesale by the `teams` section of the config file.

use crate::error::Error;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

static TEAM_CODE: Lazy<Regex> = Lazy::new(|| Regex::new("^[A-Z]{3}$").unwrap());

const DEFAULT_TEAMS: [(&str, &str); 30] = [
    ("Atlanta", "ATL"),
    ("Boston", "BOS"),
    ("Brooklyn", "BRK"),
    ("Charlotte", "CHO"),
    ("Chicago", "CHI"),
    ("Cleveland", "CLE"),
    ("Dallas", "DAL"),
    ("Denver", "DEN"),
    ("Detroit", "DET"),
    ("Golden State", "GSW"),
    ("Houston", "HOU"),
    ("Indiana", "IND"),
    ("LA Lakers", "LAL"),
    ("LA Clippers", "LAC"),
    ("Memphis", "MEM"),
    ("Miami", "MIA"),
    ("Milwaukee", "MIL"),
    ("Minnesota", "MIN"),
    ("New Orleans", "NOP"),
    ("New York", "NYK"),
    ("Oklahoma City", "OKC"),
    ("Orlando", "ORL"),
    ("Philadelphia", "PHI"),
    ("Phoenix", "PHO"),
    ("Portland", "POR"),
    ("Sacramento", "SAC"),
    ("San Antonio", "SAS"),
    ("Toronto", "TOR"),
    ("Utah", "UTA"),
    ("Washington", "WAS"),
];

/// Immutable mapping from the team name shown on scoreboards to its code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TeamCodes {
    by_name: BTreeMap<String, String>,
}

impl Default for TeamCodes {
    fn default() -> Self {
        DEFAULT_TEAMS.into_iter().collect()
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for TeamCodes {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        Self {
            by_name: iter
                .into_iter()
                .map(|(name, code)| (name.into(), code.into()))
                .collect(),
        }
    }
}

impl TeamCodes {
    /// Resolve a scoreboard team name to its code.
    ///
    /// Surrounding whitespace is ignored. Unknown names are
    /// [`Error::UnknownTeam`].
    pub fn resolve(&self, name: &str) -> Result<&str, Error> {
        self.by_name
            .get(name.trim())
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownTeam(name.to_string()))
    }

    /// Whether `code` belongs to one of the known teams.
    pub fn knows_code(&self, code: &str) -> bool {
        self.by_name.values().any(|c| c == code)
    }

    /// Normalize a path parameter into a known team code.
    ///
    /// The input is upper-cased, must be exactly three ASCII letters, and
    /// must belong to a known team.
    pub fn validate_code(&self, raw: &str) -> Result<String, Error> {
        let code = raw.trim().to_ascii_uppercase();
        if !TEAM_CODE.is_match(&code) {
            return Err(Error::InvalidTeamCode(raw.to_string()));
        }
        if !self.knows_code(&code) {
            return Err(Error::UnknownTeam(code));
        }
        Ok(code)
    }

    /// Number of teams in the table.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}
