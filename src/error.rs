//! Error type shared by the scrapers, the HTTP layer and the stats loader.
//!
//! Every failure a request or a load can hit is a variant here, so nothing on
//! those paths needs to panic. The server maps each variant onto a status code
//! in [`crate::server`]; [`Error::kind`] gives the stable machine-readable name
//! used in JSON error bodies.

use std::fmt;
use std::time::Duration;

/// Errors raised while scraping, serving or loading data.
#[derive(Debug)]
pub enum Error {
    /// The requested year/month/day is not a calendar date.
    InvalidDate {
        year: String,
        month: String,
        day: String,
    },
    /// A team code path parameter is not three letters.
    InvalidTeamCode(String),
    /// A team name or code is not present in the lookup table.
    UnknownTeam(String),
    /// The upstream fetch did not finish inside the configured timeout.
    Timeout { url: String, after: Duration },
    /// The upstream fetch failed before a response arrived.
    Fetch {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The upstream site answered with a non-success status.
    UpstreamStatus { url: String, status: u16 },
    /// A required element was not found in the upstream document.
    MissingElement { selector: String },
    /// A table row had fewer cells than its column layout needs.
    ShortRow {
        context: String,
        expected: usize,
        found: usize,
    },
    /// A CSV record could not be mapped onto a stats row.
    MalformedRow { line: u64, reason: String },
    Csv(csv::Error),
    Database(rusqlite::Error),
    Io(std::io::Error),
}

impl Error {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidDate { .. } => "invalid_date",
            Error::InvalidTeamCode(_) => "invalid_team_code",
            Error::UnknownTeam(_) => "unknown_team",
            Error::Timeout { .. } => "timeout",
            Error::Fetch { .. } => "fetch",
            Error::UpstreamStatus { .. } => "upstream_status",
            Error::MissingElement { .. } => "missing_element",
            Error::ShortRow { .. } => "short_row",
            Error::MalformedRow { .. } => "malformed_row",
            Error::Csv(_) => "csv",
            Error::Database(_) => "database",
            Error::Io(_) => "io",
        }
    }

    /// Whether a later attempt at the same fetch could succeed.
    ///
    /// Timeouts are excluded so that a slow upstream surfaces quickly as its
    /// own error kind.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Fetch { .. } => true,
            Error::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn short_row(context: impl Into<String>, expected: usize, found: usize) -> Error {
        Error::ShortRow {
            context: context.into(),
            expected,
            found,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDate { year, month, day } => {
                write!(f, "{year}-{month}-{day} is not a valid date")
            }
            Error::InvalidTeamCode(code) => {
                write!(f, "`{code}` is not a three-letter team code")
            }
            Error::UnknownTeam(name) => write!(f, "unknown team `{name}`"),
            Error::Timeout { url, after } => {
                write!(f, "fetching {url} timed out after {after:?}")
            }
            Error::Fetch { url, source } => {
                write!(f, "fetching {url} failed: {source}")?;
                let mut next = source.source();
                while let Some(err) = next {
                    write!(f, ": {err}")?;
                    next = err.source();
                }
                Ok(())
            }
            Error::UpstreamStatus { url, status } => {
                write!(f, "{url} answered with HTTP {status}")
            }
            Error::MissingElement { selector } => {
                write!(f, "no element matches `{selector}`")
            }
            Error::ShortRow {
                context,
                expected,
                found,
            } => write!(
                f,
                "{context}: expected at least {expected} cells, found {found}"
            ),
            Error::MalformedRow { line, reason } => {
                write!(f, "malformed CSV record on line {line}: {reason}")
            }
            Error::Csv(e) => write!(f, "CSV error: {e}"),
            Error::Database(e) => write!(f, "database error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Fetch { source, .. } => Some(source.as_ref()),
            Error::Csv(e) => Some(e),
            Error::Database(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Csv(e)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
