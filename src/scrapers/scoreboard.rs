//! Day summary scraper.
//!
//! Reads the scoreboard page for one date. Every `.game_summary` block on
//! the page becomes one [`GameSummary`]:
//!
//! - the `table.teams` block gives the winner and loser rows (name, final
//!   score). The game status link sits on the first (away) row only, which
//!   is the winner or the loser depending on the result
//! - the second table is the line score: first row away, second row home,
//!   one `.center` cell per period
//!
//! Missing selectors produce empty strings. The page is a listing, so a game
//! with odd markup should not hide the others.

use crate::error::Error;
use crate::fetch::FetchHtml;
use crate::models::{DayBoxScores, GameDate, GameSummary};
use crate::scrapers::{first_text, text_of};
use crate::teams::TeamCodes;
use itertools::{EitherOrBoth, Itertools};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static GAME_SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse(".game_summary").unwrap());
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static LOSER_TEAM: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody .loser td a").unwrap());
static LOSER_SCORE: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody .loser .right").unwrap());
static WINNER_TEAM: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody .winner td a").unwrap());
static WINNER_SCORE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody .winner .right").unwrap());
static STATUS: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody .gamelink a").unwrap());
static BODY_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static TEAM_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("td a").unwrap());
static PERIOD: Lazy<Selector> = Lazy::new(|| Selector::parse(".center").unwrap());

/// Address of the scoreboard page for `date`.
pub fn scoreboard_url(base: &Url, date: GameDate) -> Url {
    let mut url = base.clone();
    url.set_path("/boxscores/");
    url.query_pairs_mut()
        .clear()
        .append_pair("month", &date.month().to_string())
        .append_pair("day", &date.day().to_string())
        .append_pair("year", &date.year().to_string());
    url
}

/// Fetch and parse the scoreboard for `date`.
///
/// # Arguments
///
/// * `fetcher` - Source of the upstream page
/// * `base` - Root URL of the upstream site
/// * `teams` - Lookup used to build each game's breakdown links
/// * `date` - The day to summarize
///
/// # Returns
///
/// One summary per game block, in page order. A day without games is an
/// empty list; fetch failures are returned as errors.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn fetch_day_summary<F: FetchHtml>(
    fetcher: &F,
    base: &Url,
    teams: &TeamCodes,
    date: GameDate,
) -> Result<DayBoxScores, Error> {
    let url = scoreboard_url(base, date);
    let html = fetcher.fetch(&url).await?;
    let day = parse_scoreboard(&html, date, teams);
    info!(count = day.box_scores.len(), %url, "Parsed scoreboard");
    Ok(day)
}

/// Parse a scoreboard page into one summary per game block.
///
/// Never fails: fields whose markup is missing are left empty.
pub fn parse_scoreboard(html: &str, date: GameDate, teams: &TeamCodes) -> DayBoxScores {
    let document = Html::parse_document(html);
    let box_scores = document
        .select(&GAME_SUMMARY)
        .map(|game| parse_game(game, date, teams))
        .collect();
    DayBoxScores { box_scores }
}

fn parse_game(game: ElementRef<'_>, date: GameDate, teams: &TeamCodes) -> GameSummary {
    let mut tables = game.select(&TABLE);
    let teams_table = tables.next();
    let line_score = tables.next();

    let mut summary = GameSummary::default();
    if let Some(table) = teams_table {
        summary.losing_team = first_text(table, &LOSER_TEAM);
        summary.losing_team_score = first_text(table, &LOSER_SCORE);
        summary.winning_team = first_text(table, &WINNER_TEAM);
        summary.winning_team_score = first_text(table, &WINNER_SCORE);
        summary.status = first_text(table, &STATUS);
    }

    if let Some(table) = line_score {
        let mut rows = table.select(&BODY_ROW);
        let (away_team, away_periods) = line_score_row(rows.next());
        let (home_team, home_periods) = line_score_row(rows.next());
        summary.away_team = away_team;
        summary.home_team = home_team;

        if away_periods.len() != home_periods.len() {
            warn!(
                away = away_periods.len(),
                home = home_periods.len(),
                "Line score rows differ in length; padding the shorter one"
            );
        }
        (summary.away_quarter_score, summary.home_quarter_score) = away_periods
            .into_iter()
            .zip_longest(home_periods)
            .map(|pair| match pair {
                EitherOrBoth::Both(a, h) => (a, h),
                EitherOrBoth::Left(a) => (a, String::new()),
                EitherOrBoth::Right(h) => (String::new(), h),
            })
            .unzip();
    }

    match breakdown_links(date, teams, &summary.away_team, &summary.home_team) {
        Ok((score, player)) => {
            summary.score_breakdown = Some(score);
            summary.player_breakdown = Some(player);
        }
        Err(e) => warn!(
            away = %summary.away_team,
            home = %summary.home_team,
            error = %e,
            "Could not build breakdown links"
        ),
    }

    debug!(
        winner = %summary.winning_team,
        loser = %summary.losing_team,
        periods = summary.away_quarter_score.len(),
        "Parsed game summary"
    );
    summary
}

fn line_score_row(row: Option<ElementRef<'_>>) -> (String, Vec<String>) {
    match row {
        Some(row) => (
            first_text(row, &TEAM_LINK),
            row.select(&PERIOD).map(text_of).collect(),
        ),
        None => (String::new(), Vec::new()),
    }
}

/// Paths of the team totals and player totals endpoints for one game.
pub fn breakdown_links(
    date: GameDate,
    teams: &TeamCodes,
    away_team: &str,
    home_team: &str,
) -> Result<(String, String), Error> {
    let away = teams.resolve(away_team)?;
    let home = teams.resolve(home_team)?;
    let score = format!(
        "/boxscore/{}/{}/{}/{away}/{home}",
        date.year(),
        date.month(),
        date.day()
    );
    let player = format!("{score}/player");
    Ok((score, player))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::FixtureFetcher;

    const SCOREBOARD: &str = include_str!("../../tests/fixtures/scoreboard_2019_01_01.html");

    fn new_years_day() -> GameDate {
        GameDate::parse("2019", "1", "1").unwrap()
    }

    fn base() -> Url {
        Url::parse("https://www.basketball-reference.com").unwrap()
    }

    #[test]
    fn test_scoreboard_url() {
        assert_eq!(
            scoreboard_url(&base(), new_years_day()).as_str(),
            "https://www.basketball-reference.com/boxscores/?month=1&day=1&year=2019"
        );
    }

    #[test]
    fn test_one_summary_per_game_block() {
        let day = parse_scoreboard(SCOREBOARD, new_years_day(), &TeamCodes::default());
        let blocks = SCOREBOARD.matches("class=\"game_summary").count();
        assert_eq!(day.box_scores.len(), blocks);
        assert_eq!(day.box_scores.len(), 2);
    }

    #[test]
    fn test_first_game_fields() {
        let day = parse_scoreboard(SCOREBOARD, new_years_day(), &TeamCodes::default());
        let game = &day.box_scores[0];
        assert_eq!(game.winning_team, "Golden State");
        assert_eq!(game.losing_team, "Boston");
        assert_eq!(game.winning_team_score, "115");
        assert_eq!(game.losing_team_score, "111");
        assert_eq!(game.status, "Final");
        assert_eq!(game.away_team, "Golden State");
        assert_eq!(game.home_team, "Boston");
        assert_eq!(game.away_quarter_score, vec!["30", "27", "31", "27"]);
        assert_eq!(game.home_quarter_score, vec!["28", "29", "25", "29"]);
        assert_eq!(
            game.score_breakdown.as_deref(),
            Some("/boxscore/2019/1/1/GSW/BOS")
        );
        assert_eq!(
            game.player_breakdown.as_deref(),
            Some("/boxscore/2019/1/1/GSW/BOS/player")
        );

        let winner: u32 = game.winning_team_score.parse().unwrap();
        let loser: u32 = game.losing_team_score.parse().unwrap();
        assert!(winner > loser);
    }

    #[test]
    fn test_overtime_game_keeps_periods_aligned() {
        let day = parse_scoreboard(SCOREBOARD, new_years_day(), &TeamCodes::default());
        let game = &day.box_scores[1];
        assert_eq!(game.status, "Final/OT");
        assert_eq!(game.away_quarter_score.len(), 5);
        for game in &day.box_scores {
            assert_eq!(game.away_quarter_score.len(), game.home_quarter_score.len());
        }

        let away: u32 = game
            .away_quarter_score
            .iter()
            .map(|s| s.parse::<u32>().unwrap())
            .sum();
        assert_eq!(away.to_string(), game.losing_team_score);
    }

    #[test]
    fn test_uneven_line_score_is_padded() {
        let html = r#"<div class="game_summary"><table class="teams"><tbody></tbody></table>
            <table><tbody>
            <tr><td><a>Boston</a></td><td class="center">20</td><td class="center">22</td></tr>
            <tr><td><a>Miami</a></td><td class="center">25</td></tr>
            </tbody></table></div>"#;
        let day = parse_scoreboard(html, new_years_day(), &TeamCodes::default());
        let game = &day.box_scores[0];
        assert_eq!(game.away_quarter_score, vec!["20", "22"]);
        assert_eq!(game.home_quarter_score, vec!["25", ""]);
        assert_eq!(game.winning_team, "");
    }

    #[test]
    fn test_status_found_when_away_team_wins() {
        let html = r#"<div class="game_summary"><table class="teams"><tbody>
            <tr class="winner"><td><a>Miami</a></td><td class="right">101</td>
                <td class="right gamelink"><a>Final</a></td></tr>
            <tr class="loser"><td><a>Boston</a></td><td class="right">99</td>
                <td class="right">&nbsp;</td></tr>
            </tbody></table></div>"#;
        let day = parse_scoreboard(html, new_years_day(), &TeamCodes::default());
        let game = &day.box_scores[0];
        assert_eq!(game.winning_team, "Miami");
        assert_eq!(game.losing_team_score, "99");
        assert_eq!(game.status, "Final");
    }

    #[test]
    fn test_unknown_team_leaves_links_empty() {
        let html = r#"<div class="game_summary"><table class="teams"></table>
            <table><tbody>
            <tr><td><a>Seattle</a></td><td class="center">20</td></tr>
            <tr><td><a>Boston</a></td><td class="center">25</td></tr>
            </tbody></table></div>"#;
        let day = parse_scoreboard(html, new_years_day(), &TeamCodes::default());
        assert_eq!(day.box_scores[0].score_breakdown, None);
        assert_eq!(day.box_scores[0].player_breakdown, None);
    }

    #[test]
    fn test_empty_day() {
        let day = parse_scoreboard("<html><body></body></html>", new_years_day(), &TeamCodes::default());
        assert!(day.box_scores.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_day_summary_uses_scoreboard_url() {
        let fetcher = FixtureFetcher::default().with_page(
            "https://www.basketball-reference.com/boxscores/?month=1&day=1&year=2019",
            SCOREBOARD,
        );
        let day = fetch_day_summary(&fetcher, &base(), &TeamCodes::default(), new_years_day())
            .await
            .unwrap();
        assert_eq!(day.box_scores.len(), 2);

        let other_day = GameDate::parse("2019", "1", "2").unwrap();
        let err = fetch_day_summary(&fetcher, &base(), &TeamCodes::default(), other_day)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_status");
    }
}
