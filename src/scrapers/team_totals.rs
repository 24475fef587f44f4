//! Team totals scraper.
//!
//! Reads the "Team Totals" footer row of each team's basic box score table
//! (`#box-XXX-game-basic tfoot tr`) on a game page. The row's name cell is a
//! `th`, so the `td` cells start at minutes played and run in [`StatLine`]
//! column order.

use crate::error::Error;
use crate::fetch::FetchHtml;
use crate::models::{StatLine, TeamTotals};
use crate::scrapers::{GameKey, cell_texts, fetch_game_page, require};
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

/// Fetch a game page and return `[away, home]` team totals.
///
/// # Arguments
///
/// * `fetcher` - Source of the upstream page
/// * `base` - Root URL of the upstream site
/// * `key` - Date and validated team codes of the game
///
/// # Returns
///
/// Exactly two records, away first, or the first fetch or structure error.
#[instrument(level = "info", skip_all, fields(date = %key.date, away = %key.away, home = %key.home))]
pub async fn fetch_team_totals<F: FetchHtml>(
    fetcher: &F,
    base: &Url,
    key: &GameKey,
) -> Result<Vec<TeamTotals>, Error> {
    let html = fetch_game_page(fetcher, base, key).await?;
    parse_team_totals(&html, key)
}

/// Parse both teams' totals rows, away first.
pub fn parse_team_totals(html: &str, key: &GameKey) -> Result<Vec<TeamTotals>, Error> {
    let document = Html::parse_document(html);
    [key.away.as_str(), key.home.as_str()]
        .into_iter()
        .map(|code| team_totals_for(&document, code))
        .collect()
}

fn team_totals_for(document: &Html, code: &str) -> Result<TeamTotals, Error> {
    let selector = format!("#{} tfoot tr", GameKey::basic_table_id(code));
    let row = require(document, &selector)?;
    let stats = StatLine::from_cells(&cell_texts(row), &selector)?;
    debug!(team = code, points = %stats.points, "Parsed team totals");
    Ok(TeamTotals {
        team: code.to_string(),
        stats,
    })
}
