//! Records produced by the scrapers and the stats loader.
//!
//! - [`GameDate`]: a validated calendar date used to build upstream URLs
//! - [`GameSummary`] / [`DayBoxScores`]: one day's scoreboard
//! - [`StatLine`], [`TeamTotals`], [`PlayerTotals`], [`PlayerTotalsTeam`]: one game's box score
//! - [`PlayerStatsRow`]: a season stats row from the CSV file
//!
//! Box score numbers are kept as the text the upstream page shows ("48.1",
//! ".455", "+7"); callers that need arithmetic parse them themselves.

use crate::error::Error;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A real calendar date taken from `/boxscore/{year}/{month}/{day}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameDate(NaiveDate);

impl GameDate {
    pub fn parse(year: &str, month: &str, day: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidDate {
            year: year.to_string(),
            month: month.to_string(),
            day: day.to_string(),
        };
        let y: i32 = year.trim().parse().map_err(|_| invalid())?;
        let m: u32 = month.trim().parse().map_err(|_| invalid())?;
        let d: u32 = day.trim().parse().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(y, m, d).map(GameDate).ok_or_else(invalid)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Compact `YYYYMMDD` form used in game page file names.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One game from a day's scoreboard.
///
/// Fields whose selector matched nothing are empty strings. The breakdown
/// links are `None` when a team name could not be resolved to a code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameSummary {
    pub losing_team: String,
    pub winning_team: String,
    pub losing_team_score: String,
    pub winning_team_score: String,
    /// Game link text, usually "Final" or "Final/OT".
    pub status: String,
    pub away_team: String,
    pub home_team: String,
    /// Points per period, overtime included. Same length as `home_quarter_score`.
    pub away_quarter_score: Vec<String>,
    pub home_quarter_score: Vec<String>,
    /// Path of the team totals endpoint for this game.
    pub score_breakdown: Option<String>,
    /// Path of the player totals endpoint for this game.
    pub player_breakdown: Option<String>,
}

/// All games played on one date, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBoxScores {
    pub box_scores: Vec<GameSummary>,
}

/// Number of basic box score columns between the name cell and plus-minus.
pub const STAT_COLUMNS: usize = 19;

/// The 19 basic box score columns, left to right.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatLine {
    pub minutes_played: String,
    pub field_goals: String,
    pub field_goals_attempted: String,
    pub field_goal_percentage: String,
    pub three_point: String,
    pub three_point_attempted: String,
    pub three_point_percentage: String,
    pub free_throws: String,
    pub free_throws_attempted: String,
    pub free_throw_percentage: String,
    pub offensive_rebounds: String,
    pub defensive_rebounds: String,
    pub total_rebounds: String,
    pub assists: String,
    pub steals: String,
    pub blocks: String,
    pub turnovers: String,
    pub personal_fouls: String,
    pub points: String,
}

impl StatLine {
    /// Decode the first [`STAT_COLUMNS`] cells of a row by column name.
    ///
    /// Extra trailing cells are ignored; a shorter row is a
    /// [`Error::ShortRow`] naming `context`.
    pub fn from_cells(cells: &[String], context: &str) -> Result<Self, Error> {
        let Some(head) = cells.get(..STAT_COLUMNS) else {
            return Err(Error::short_row(context, STAT_COLUMNS, cells.len()));
        };
        let [
            minutes_played,
            field_goals,
            field_goals_attempted,
            field_goal_percentage,
            three_point,
            three_point_attempted,
            three_point_percentage,
            free_throws,
            free_throws_attempted,
            free_throw_percentage,
            offensive_rebounds,
            defensive_rebounds,
            total_rebounds,
            assists,
            steals,
            blocks,
            turnovers,
            personal_fouls,
            points,
        ]: [String; STAT_COLUMNS] = head
            .to_vec()
            .try_into()
            .map_err(|_| Error::short_row(context, STAT_COLUMNS, cells.len()))?;

        Ok(StatLine {
            minutes_played,
            field_goals,
            field_goals_attempted,
            field_goal_percentage,
            three_point,
            three_point_attempted,
            three_point_percentage,
            free_throws,
            free_throws_attempted,
            free_throw_percentage,
            offensive_rebounds,
            defensive_rebounds,
            total_rebounds,
            assists,
            steals,
            blocks,
            turnovers,
            personal_fouls,
            points,
        })
    }
}

/// One team's totals row from a game's basic box score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamTotals {
    pub team: String,
    #[serde(flatten)]
    pub stats: StatLine,
}

/// One player's line from a game's basic box score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTotals {
    pub team: String,
    pub name: String,
    /// Why the player has no stats, e.g. "Did Not Play". Absent for players who played.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub stats: StatLine,
    pub plus_minus: String,
}

/// A team's players for one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTotalsTeam {
    pub starters: Vec<PlayerTotals>,
    pub reserves: Vec<PlayerTotals>,
}

/// Number of positional columns in the season stats CSV.
pub const PLAYER_STATS_COLUMNS: usize = 27;

/// A season stats row, column for column with the CSV file and the
/// `playerstats` table. Empty numeric fields become `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatsRow {
    pub name: String,
    pub height: String,
    pub weight: String,
    pub team: String,
    pub age: Option<f64>,
    pub salary: Option<f64>,
    pub points: Option<f64>,
    pub blocks: Option<f64>,
    pub steals: Option<f64>,
    pub assists: Option<f64>,
    pub rebounds: Option<f64>,
    pub ft: Option<f64>,
    pub fta: Option<f64>,
    pub fg3: Option<f64>,
    pub fg3a: Option<f64>,
    pub fg: Option<f64>,
    pub fga: Option<f64>,
    pub mp: Option<f64>,
    pub g: Option<f64>,
    pub per: Option<f64>,
    pub ows: Option<f64>,
    pub dws: Option<f64>,
    pub ws: Option<f64>,
    pub ws48: Option<f64>,
    pub usg: Option<f64>,
    pub bpm: Option<f64>,
    pub vorp: Option<f64>,
}
