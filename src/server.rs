//! HTTP surface.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | landing page from the templates directory |
//! | `GET /searchPlayer` | player search page from the templates directory |
//! | `GET /boxscore/{year}/{month}/{day}` | JSON array of [`GameSummary`](crate::models::GameSummary) |
//! | `GET /boxscore/{year}/{month}/{day}/{awayteam}/{hometeam}` | JSON array of two [`TeamTotals`](crate::models::TeamTotals) |
//! | `GET /boxscore/{year}/{month}/{day}/{awayteam}/{hometeam}/player` | JSON array of two [`PlayerTotalsTeam`](crate::models::PlayerTotalsTeam) |
//! | `GET /players?name=` | JSON array of [`PlayerStatsRow`](crate::models::PlayerStatsRow) |
//!
//! Handlers hold no state beyond the shared, read-only [`AppState`]. Every
//! failure becomes a JSON error body; none of them stop the server.

use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::fetch::FetchHtml;
use crate::models::{GameDate, GameSummary, PlayerStatsRow, PlayerTotalsTeam, TeamTotals};
use crate::scrapers::player_totals::{RosterLayout, fetch_player_totals};
use crate::scrapers::scoreboard::fetch_day_summary;
use crate::scrapers::team_totals::fetch_team_totals;
use crate::scrapers::GameKey;
use crate::teams::TeamCodes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Read-only state shared by every request.
#[derive(Debug)]
pub struct AppState<F> {
    pub fetcher: F,
    pub base_url: Url,
    pub teams: TeamCodes,
    pub layout: RosterLayout,
    pub templates_dir: PathBuf,
    pub database: PathBuf,
}

impl<F> AppState<F> {
    pub fn new(
        fetcher: F,
        config: &Config,
        templates_dir: PathBuf,
        database: PathBuf,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            fetcher,
            base_url: Url::parse(&config.base_url)?,
            teams: config.teams.clone(),
            layout: RosterLayout {
                starters: config.starter_count,
                max_reserves: config.max_reserves,
            },
            templates_dir,
            database,
        })
    }
}

type Shared<F> = State<Arc<AppState<F>>>;

/// Build the router over `state`.
pub fn router<F: FetchHtml + 'static>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/", get(index::<F>))
        .route("/searchPlayer", get(search_page::<F>))
        .route("/boxscore/{year}/{month}/{day}", get(day_summary::<F>))
        .route(
            "/boxscore/{year}/{month}/{day}/{awayteam}/{hometeam}",
            get(team_totals::<F>),
        )
        .route(
            "/boxscore/{year}/{month}/{day}/{awayteam}/{hometeam}/player",
            get(player_totals::<F>),
        )
        .route("/players", get(players::<F>))
        .fallback(fallback)
        .with_state(state)
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::InvalidDate { .. } | Error::InvalidTeamCode(_) => StatusCode::BAD_REQUEST,
            Error::UnknownTeam(_) => StatusCode::NOT_FOUND,
            Error::UpstreamStatus { status: 404, .. } => StatusCode::NOT_FOUND,
            Error::UpstreamStatus { .. }
            | Error::Fetch { .. }
            | Error::MissingElement { .. }
            | Error::ShortRow { .. } => StatusCode::BAD_GATEWAY,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            Error::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::CannotOpen =>
            {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::MalformedRow { .. } | Error::Csv(_) | Error::Database(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            warn!(kind = self.kind(), error = %self, "Request rejected");
        }
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

async fn serve_template(dir: &std::path::Path, file: &str) -> Result<Html<String>, Error> {
    let page = tokio::fs::read_to_string(dir.join(file)).await?;
    Ok(Html(page))
}

#[instrument(level = "info", skip_all)]
async fn index<F: FetchHtml>(State(state): Shared<F>) -> Result<Html<String>, Error> {
    serve_template(&state.templates_dir, "index.html").await
}

#[instrument(level = "info", skip_all)]
async fn search_page<F: FetchHtml>(State(state): Shared<F>) -> Result<Html<String>, Error> {
    serve_template(&state.templates_dir, "search.html").await
}

#[instrument(level = "info", skip_all, fields(%year, %month, %day))]
async fn day_summary<F: FetchHtml>(
    State(state): Shared<F>,
    Path((year, month, day)): Path<(String, String, String)>,
) -> Result<Json<Vec<GameSummary>>, Error> {
    let date = GameDate::parse(&year, &month, &day)?;
    let summary = fetch_day_summary(&state.fetcher, &state.base_url, &state.teams, date).await?;
    Ok(Json(summary.box_scores))
}

#[derive(Debug, Deserialize)]
struct GamePath {
    year: String,
    month: String,
    day: String,
    awayteam: String,
    hometeam: String,
}

impl GamePath {
    fn key(&self, teams: &TeamCodes) -> Result<GameKey, Error> {
        GameKey::parse(
            teams,
            &self.year,
            &self.month,
            &self.day,
            &self.awayteam,
            &self.hometeam,
        )
    }
}

#[instrument(level = "info", skip_all, fields(path = ?game))]
async fn team_totals<F: FetchHtml>(
    State(state): Shared<F>,
    Path(game): Path<GamePath>,
) -> Result<Json<Vec<TeamTotals>>, Error> {
    let key = game.key(&state.teams)?;
    let totals = fetch_team_totals(&state.fetcher, &state.base_url, &key).await?;
    Ok(Json(totals))
}

#[instrument(level = "info", skip_all, fields(path = ?game))]
async fn player_totals<F: FetchHtml>(
    State(state): Shared<F>,
    Path(game): Path<GamePath>,
) -> Result<Json<Vec<PlayerTotalsTeam>>, Error> {
    let key = game.key(&state.teams)?;
    let players = fetch_player_totals(&state.fetcher, &state.base_url, &key, state.layout).await?;
    Ok(Json(players))
}

#[derive(Debug, Deserialize)]
struct PlayerQuery {
    name: Option<String>,
}

#[instrument(level = "info", skip_all, fields(name = ?query.name))]
async fn players<F: FetchHtml>(
    State(state): Shared<F>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<Vec<PlayerStatsRow>>, Error> {
    let path = state.database.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let conn = db::open_read_only(&path)?;
        db::search_players(&conn, query.name.as_deref())
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))??;
    info!(count = rows.len(), "Served player search");
    Ok(Json(rows))
}

async fn fallback() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "kind": "not_found", "message": "no such route" } })),
    )
}
