//! Player totals scraper.
//!
//! Reads the body rows of each team's basic box score table. The upstream
//! layout is: starters, one repeated header row ("Reserves"), then reserves.
//! Players who did not take the floor have a single spanning cell with the
//! reason instead of stat columns.

use crate::error::Error;
use crate::fetch::FetchHtml;
use crate::models::{PlayerTotals, PlayerTotalsTeam, STAT_COLUMNS, StatLine};
use crate::scrapers::{GameKey, cell_texts, fetch_game_page, first_text, parse_selector};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

static NAME_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("th a").unwrap());
static NAME_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());

/// How a team's rows split into starters and reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterLayout {
    pub starters: usize,
    pub max_reserves: usize,
}

impl Default for RosterLayout {
    fn default() -> Self {
        Self {
            starters: 5,
            max_reserves: 10,
        }
    }
}

/// Fetch a game page and return `[away, home]` player totals.
///
/// # Arguments
///
/// * `fetcher` - Source of the upstream page
/// * `base` - Root URL of the upstream site
/// * `key` - Date and validated team codes of the game
/// * `layout` - Starter count and reserve cap
///
/// # Returns
///
/// Two rosters, away first, or the first fetch or structure error.
#[instrument(level = "info", skip_all, fields(date = %key.date, away = %key.away, home = %key.home))]
pub async fn fetch_player_totals<F: FetchHtml>(
    fetcher: &F,
    base: &Url,
    key: &GameKey,
    layout: RosterLayout,
) -> Result<Vec<PlayerTotalsTeam>, Error> {
    let html = fetch_game_page(fetcher, base, key).await?;
    parse_player_totals(&html, key, layout)
}

/// Parse both teams' player rows, away first.
///
/// # Errors
///
/// [`Error::MissingElement`] when a team's table is absent, and
/// [`Error::ShortRow`] when a table has too few rows or a row too few cells.
pub fn parse_player_totals(
    html: &str,
    key: &GameKey,
    layout: RosterLayout,
) -> Result<Vec<PlayerTotalsTeam>, Error> {
    let document = Html::parse_document(html);
    [key.away.as_str(), key.home.as_str()]
        .into_iter()
        .map(|code| players_for(&document, code, layout))
        .collect()
}

fn players_for(document: &Html, code: &str, layout: RosterLayout) -> Result<PlayerTotalsTeam, Error> {
    let selector_text = format!("#{} tbody tr", GameKey::basic_table_id(code));
    let selector = parse_selector(&selector_text)?;
    let rows: Vec<ElementRef<'_>> = document.select(&selector).collect();

    if rows.is_empty() {
        return Err(Error::MissingElement {
            selector: selector_text,
        });
    }
    if rows.len() < layout.starters {
        return Err(Error::short_row(
            format!("{selector_text} starters"),
            layout.starters,
            rows.len(),
        ));
    }

    let decode = |(index, row): (usize, &ElementRef<'_>)| {
        player_from_row(*row, code, &format!("{selector_text} row {index}"))
    };
    let starters = rows
        .iter()
        .enumerate()
        .take(layout.starters)
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;
    let reserves = rows
        .iter()
        .enumerate()
        .skip(layout.starters + 1)
        .take(layout.max_reserves)
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        team = code,
        starters = starters.len(),
        reserves = reserves.len(),
        "Parsed player totals"
    );
    Ok(PlayerTotalsTeam { starters, reserves })
}

fn player_from_row(row: ElementRef<'_>, team: &str, context: &str) -> Result<PlayerTotals, Error> {
    let mut name = first_text(row, &NAME_LINK);
    if name.is_empty() {
        name = first_text(row, &NAME_CELL);
    }
    let mut cells = cell_texts(row);

    if cells.len() == 1 {
        return Ok(PlayerTotals {
            team: team.to_string(),
            name,
            reason: cells.pop(),
            ..PlayerTotals::default()
        });
    }

    let stats = StatLine::from_cells(&cells, context)?;
    let plus_minus = cells.get(STAT_COLUMNS).cloned().unwrap_or_default();
    Ok(PlayerTotals {
        team: team.to_string(),
        name,
        reason: None,
        stats,
        plus_minus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::FixtureFetcher;
    use crate::teams::TeamCodes;

    const GAME: &str = include_str!("../../tests/fixtures/boxscore_201901010BOS.html");

    fn key() -> GameKey {
        GameKey::parse(&TeamCodes::default(), "2019", "1", "1", "GSW", "BOS").unwrap()
    }

    #[test]
    fn test_starters_and_reserves_split() {
        let teams = parse_player_totals(GAME, &key(), RosterLayout::default()).unwrap();
        assert_eq!(teams.len(), 2);
        for team in &teams {
            assert_eq!(team.starters.len(), 5);
            assert_eq!(team.reserves.len(), 6);
        }
        assert_eq!(teams[0].starters[0].name, "Stephen Curry");
        assert_eq!(teams[0].starters[0].team, "GSW");
        assert_eq!(teams[0].reserves[0].name, "Andre Iguodala");
        assert_eq!(teams[1].starters[0].name, "Kyrie Irving");
        assert_eq!(teams[1].reserves[5].name, "Semi Ojeleye");
    }

    #[test]
    fn test_reserves_capped_by_layout() {
        let layout = RosterLayout {
            starters: 5,
            max_reserves: 4,
        };
        let teams = parse_player_totals(GAME, &key(), layout).unwrap();
        assert_eq!(teams[0].reserves.len(), 4);
        assert_eq!(teams[1].reserves.len(), 4);
    }

    #[test]
    fn test_player_line_columns() {
        let teams = parse_player_totals(GAME, &key(), RosterLayout::default()).unwrap();
        let curry = &teams[0].starters[0];
        assert_eq!(curry.reason, None);
        assert_eq!(curry.stats.minutes_played, "36:00");
        assert_eq!(curry.stats.field_goals, "11");
        assert_eq!(curry.stats.three_point, "5");
        assert_eq!(curry.stats.points, "31");
        assert_eq!(curry.plus_minus, "+8");
    }

    #[test]
    fn test_player_points_sum_to_team_points() {
        let teams = parse_player_totals(GAME, &key(), RosterLayout::default()).unwrap();
        let gsw: u32 = teams[0]
            .starters
            .iter()
            .chain(&teams[0].reserves)
            .filter(|p| p.reason.is_none())
            .map(|p| p.stats.points.parse::<u32>().unwrap())
            .sum();
        assert_eq!(gsw, 115);
    }

    #[test]
    fn test_did_not_play_row() {
        let teams = parse_player_totals(GAME, &key(), RosterLayout::default()).unwrap();
        let jerebko = teams[0].reserves.last().unwrap();
        assert_eq!(jerebko.name, "Jonas Jerebko");
        assert_eq!(jerebko.reason.as_deref(), Some("Did Not Play"));
        assert_eq!(jerebko.stats, StatLine::default());
    }

    #[test]
    fn test_too_few_starters_is_error() {
        let html = r#"<table id="box-GSW-game-basic"><tbody>
            <tr><th><a>One</a></th><td>1</td><td>2</td></tr>
            </tbody></table>"#;
        assert!(matches!(
            parse_player_totals(html, &key(), RosterLayout::default()),
            Err(Error::ShortRow { expected: 5, found: 1, .. })
        ));
    }

    #[test]
    fn test_short_player_row_is_error() {
        let row = |name: &str| {
            let cells: String = (0..20).map(|i| format!("<td>{i}</td>")).collect();
            format!("<tr><th><a>{name}</a></th>{cells}</tr>")
        };
        let mut body: String = (0..4).map(|i| row(&format!("P{i}"))).collect();
        body.push_str("<tr><th><a>Short</a></th><td>1</td><td>2</td></tr>");
        let html = format!(r#"<table id="box-GSW-game-basic"><tbody>{body}</tbody></table>"#);
        match parse_player_totals(&html, &key(), RosterLayout::default()) {
            Err(Error::ShortRow { context, found, .. }) => {
                assert_eq!(context, "#box-GSW-game-basic tbody tr row 4");
                assert_eq!(found, 2);
            }
            other => panic!("expected ShortRow, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_plus_minus_is_empty() {
        let row: String = (0..19).map(|i| format!("<td>{i}</td>")).collect();
        let body: String = (0..5).map(|_| format!("<tr><th>Player</th>{row}</tr>")).collect();
        let html = format!(
            r#"<table id="box-GSW-game-basic"><tbody>{body}</tbody></table>
               <table id="box-BOS-game-basic"><tbody>{body}</tbody></table>"#
        );
        let teams = parse_player_totals(&html, &key(), RosterLayout::default()).unwrap();
        assert_eq!(teams[0].starters[0].name, "Player");
        assert_eq!(teams[0].starters[0].plus_minus, "");
        assert!(teams[0].reserves.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_player_totals() {
        let fetcher = FixtureFetcher::default().with_page(
            "https://www.basketball-reference.com/boxscores/201901010BOS.html",
            GAME,
        );
        let base = Url::parse("https://www.basketball-reference.com").unwrap();
        let teams = fetch_player_totals(&fetcher, &base, &key(), RosterLayout::default())
            .await
            .unwrap();
        assert_eq!(teams[1].starters[1].name, "Jayson Tatum");
    }
}
