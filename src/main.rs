//! # hoopsbox
//!
//! A small JSON API over basketball-reference.com box scores, plus a loader
//! for season player stats.
//!
//! ## Usage
//!
//! ```sh
//! hoopsbox serve --port 8000
//! hoopsbox load-stats nbastats2018-2019.csv
//! ```
//!
//! ## Architecture
//!
//! Each box score request runs one short pipeline:
//! 1. **Validate**: parse the date and team codes from the path
//! 2. **Fetch**: download the upstream page (bounded timeout, retry on transient errors)
//! 3. **Parse**: select table cells and map them onto typed records
//! 4. **Respond**: serialize the records as JSON
//!
//! The `load-stats` subcommand reads a 27-column CSV file into the
//! `playerstats` SQLite table that backs `GET /players`.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod db;
mod error;
mod fetch;
mod models;
mod scrapers;
mod server;
mod teams;

use cli::{Cli, Command};
use config::{Config, load_config};
use db::LoadMode;
use fetch::{HttpFetcher, RetryFetch};
use server::AppState;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "hoopsbox starting up");

    let config = load_config(args.config.as_deref()).await?;

    match args.command {
        Command::Serve {
            port,
            host,
            templates_dir,
        } => serve(config, &host, port, templates_dir, args.database).await,
        Command::LoadStats {
            csv,
            no_headers,
            mode,
        } => load_stats(args.database, csv, !no_headers, mode).await,
    }
}

#[instrument(level = "info", skip(config, templates_dir, database))]
async fn serve(
    config: Config,
    host: &str,
    port: u16,
    templates_dir: PathBuf,
    database: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let fetcher = RetryFetch::new(
        HttpFetcher::new(&config)?,
        config.max_retries,
        config.retry_base_delay(),
    );
    let state = AppState::new(fetcher, &config, templates_dir, database)?;
    info!(
        base_url = %state.base_url,
        timeout = ?config.fetch_timeout(),
        templates = %state.templates_dir.display(),
        database = %state.database.display(),
        "Application state ready"
    );
    let app = server::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[instrument(level = "info")]
async fn load_stats(
    database: PathBuf,
    csv: PathBuf,
    has_headers: bool,
    mode: LoadMode,
) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let report = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&csv)?;
        let mut conn = db::open(&database)?;
        let report = db::load_csv(&mut conn, std::io::BufReader::new(file), has_headers, mode)?;
        Ok::<_, error::Error>((report, db::count_rows(&conn)?))
    })
    .await?;

    let (report, total) = match report {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "Loading player stats failed");
            return Err(e.into());
        }
    };

    let elapsed: Duration = start_time.elapsed();
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        total,
        ?elapsed,
        "Player stats loaded"
    );
    Ok(())
}
