//! Box score scrapers for basketball-reference.com.
//!
//! Each scraper is a short pipeline of separately testable stages:
//!
//! 1. **URL**: build the upstream address from validated request parameters
//! 2. **Fetch**: download the page through a [`FetchHtml`] implementation
//! 3. **Parse**: a pure function from HTML text to typed records
//!
//! | Endpoint data | Module | Upstream page |
//! |---------------|--------|---------------|
//! | Day summary | [`scoreboard`] | `/boxscores/?month=M&day=D&year=Y` |
//! | Team totals | [`team_totals`] | `/boxscores/YYYYMMDD0HOME.html` |
//! | Player totals | [`player_totals`] | `/boxscores/YYYYMMDD0HOME.html` |
//!
//! The CSS classes and table ids used here (`.game_summary`, `.loser`,
//! `.winner`, `.center`, `#box-XXX-game-basic`) belong to the upstream site.
//! If it changes its markup the parsers report [`Error::MissingElement`] or
//! [`Error::ShortRow`] rather than guessing.

pub mod player_totals;
pub mod scoreboard;
pub mod team_totals;

use crate::error::Error;
use crate::fetch::FetchHtml;
use crate::models::GameDate;
use crate::teams::TeamCodes;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument};
use url::Url;

static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Identifies one game: the date plus the away and home team codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameKey {
    pub date: GameDate,
    pub away: String,
    pub home: String,
}

impl GameKey {
    /// Validate raw path parameters into a key.
    pub fn parse(
        teams: &TeamCodes,
        year: &str,
        month: &str,
        day: &str,
        away: &str,
        home: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            date: GameDate::parse(year, month, day)?,
            away: teams.validate_code(away)?,
            home: teams.validate_code(home)?,
        })
    }

    /// Id of this team's basic box score table on the game page.
    pub(crate) fn basic_table_id(code: &str) -> String {
        format!("box-{code}-game-basic")
    }
}

/// Address of a game's box score page. Games are filed under the home team.
pub fn game_url(base: &Url, key: &GameKey) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("/boxscores/{}0{}.html", key.date.compact(), key.home));
    url.set_query(None);
    url
}

/// Fetch a game's box score page.
#[instrument(level = "info", skip_all, fields(date = %key.date, away = %key.away, home = %key.home))]
pub async fn fetch_game_page<F: FetchHtml>(
    fetcher: &F,
    base: &Url,
    key: &GameKey,
) -> Result<String, Error> {
    let url = game_url(base, key);
    let body = fetcher.fetch(&url).await?;
    info!(bytes = body.len(), %url, "Fetched game page");
    Ok(body)
}

pub(crate) fn parse_selector(text: &str) -> Result<Selector, Error> {
    Selector::parse(text).map_err(|_| Error::MissingElement {
        selector: text.to_string(),
    })
}

/// Whitespace-trimmed text content of an element.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the first element matching `selector` under `scope`, or `""`.
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope.select(selector).next().map(text_of).unwrap_or_default()
}

/// Text of every `td` in a row, left to right.
pub(crate) fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    row.select(&CELL).map(text_of).collect()
}

/// The first element in `document` matching `selector_text`.
pub(crate) fn require<'a>(document: &'a Html, selector_text: &str) -> Result<ElementRef<'a>, Error> {
    let selector = parse_selector(selector_text)?;
    document
        .select(&selector)
        .next()
        .ok_or_else(|| Error::MissingElement {
            selector: selector_text.to_string(),
        })
}
