//! Season player stats in SQLite.
//!
//! One table, `playerstats`, holds the rows of a season stats CSV file
//! column for column. There is no uniqueness constraint: loading the same
//! file twice stores every row twice.
//!
//! The loader takes the connection by reference, so the caller's connection
//! outlives every statement run against it.

use crate::error::Error;
use crate::models::{PLAYER_STATS_COLUMNS, PlayerStatsRow};
use rusqlite::{Connection, OpenFlags, Row, params, params_from_iter};
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Column names, in CSV order.
pub const COLUMNS: [&str; PLAYER_STATS_COLUMNS] = [
    "name", "height", "weight", "team", "age", "salary", "points", "blocks", "steals", "assists",
    "rebounds", "ft", "fta", "fg3", "fg3a", "fg", "fga", "mp", "g", "per", "ows", "dws", "ws",
    "ws48", "usg", "bpm", "vorp",
];

/// What to do with a CSV record that cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LoadMode {
    /// Log the record and carry on; every good record is kept.
    #[default]
    SkipBadRows,
    /// Abort on the first bad record and keep nothing from this load.
    Strict,
}

/// Outcome of one CSV load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Open (creating if needed) the stats database at `path`.
pub fn open(path: &Path) -> Result<Connection, Error> {
    Ok(Connection::open(path)?)
}

/// Open an existing stats database without write access.
pub fn open_read_only(path: &Path) -> Result<Connection, Error> {
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

/// Create the `playerstats` table if it does not exist.
pub fn create_table(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS playerstats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            height TEXT,
            weight TEXT,
            team TEXT,
            age REAL,
            salary REAL,
            points REAL,
            blocks REAL,
            steals REAL,
            assists REAL,
            rebounds REAL,
            ft REAL,
            fta REAL,
            fg3 REAL,
            fg3a REAL,
            fg REAL,
            fga REAL,
            mp REAL,
            g REAL,
            per REAL,
            ows REAL,
            dws REAL,
            ws REAL,
            ws48 REAL,
            usg REAL,
            bpm REAL,
            vorp REAL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn insert_sql() -> String {
    let placeholders = (1..=PLAYER_STATS_COLUMNS)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO playerstats ({}) VALUES ({placeholders})",
        COLUMNS.join(", ")
    )
}

/// Insert one row.
pub fn insert_row(conn: &Connection, row: &PlayerStatsRow) -> Result<(), Error> {
    let mut stmt = conn.prepare_cached(&insert_sql())?;
    stmt.execute(params![
        row.name, row.height, row.weight, row.team, row.age, row.salary, row.points, row.blocks,
        row.steals, row.assists, row.rebounds, row.ft, row.fta, row.fg3, row.fg3a, row.fg,
        row.fga, row.mp, row.g, row.per, row.ows, row.dws, row.ws, row.ws48, row.usg, row.bpm,
        row.vorp,
    ])?;
    Ok(())
}

/// Load CSV records from `reader` into `playerstats`.
///
/// Records are mapped onto columns by position; a record must have exactly
/// [`PLAYER_STATS_COLUMNS`] fields and numeric fields must be numbers or
/// empty. The whole load runs in one transaction. In
/// [`LoadMode::SkipBadRows`] bad records are logged and skipped; in
/// [`LoadMode::Strict`] the first bad record rolls the load back.
///
/// # Arguments
///
/// * `conn` - Open connection; the table is created if missing
/// * `reader` - CSV source
/// * `has_headers` - Whether the first record is a header row to skip
/// * `mode` - How to treat bad records
///
/// # Returns
///
/// Counts of inserted and skipped records.
#[instrument(level = "info", skip(conn, reader))]
pub fn load_csv<R: Read>(
    conn: &mut Connection,
    reader: R,
    has_headers: bool,
    mode: LoadMode,
) -> Result<LoadReport, Error> {
    create_table(conn)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let tx = conn.transaction()?;
    let mut report = LoadReport::default();

    for result in csv_reader.records() {
        let outcome = result.map_err(Error::from).and_then(|record| {
            let row = decode_record(&record)?;
            insert_row(&tx, &row)
        });

        match outcome {
            Ok(()) => report.inserted += 1,
            Err(e) if mode == LoadMode::Strict => {
                warn!(error = %e, "Rejecting CSV load; rolling back");
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "Skipping CSV record");
                report.skipped += 1;
            }
        }
    }

    tx.commit()?;
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "Loaded player stats"
    );
    Ok(report)
}

/// Map a CSV record onto a [`PlayerStatsRow`] by position.
pub fn decode_record(record: &csv::StringRecord) -> Result<PlayerStatsRow, Error> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    if record.len() != PLAYER_STATS_COLUMNS {
        return Err(Error::MalformedRow {
            line,
            reason: format!(
                "expected {PLAYER_STATS_COLUMNS} fields, found {}",
                record.len()
            ),
        });
    }
    record
        .deserialize::<PlayerStatsRow>(None)
        .map_err(|e| Error::MalformedRow {
            line,
            reason: e.to_string(),
        })
}

/// Rows whose name contains `name` (case-insensitive), or every row.
///
/// `%` and `_` in `name` match literally. A blank `name` is the same as
/// `None`. A database that was never loaded yields no rows.
#[instrument(level = "info", skip(conn))]
pub fn search_players(conn: &Connection, name: Option<&str>) -> Result<Vec<PlayerStatsRow>, Error> {
    if !table_exists(conn)? {
        info!("No playerstats table yet; nothing to search");
        return Ok(Vec::new());
    }

    let columns = COLUMNS.join(", ");
    let (sql, args): (String, Vec<String>) = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => (
            format!(
                "SELECT {columns} FROM playerstats WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name, id"
            ),
            vec![format!("%{}%", escape_like(name))],
        ),
        None => (
            format!("SELECT {columns} FROM playerstats ORDER BY name, id"),
            Vec::new(),
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), row_to_stats)?
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = rows.len(), "Player search finished");
    Ok(rows)
}

/// Whether `load-stats` has created the `playerstats` table in this database.
pub fn table_exists(conn: &Connection) -> Result<bool, Error> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'playerstats')",
        [],
        |r| r.get(0),
    )?;
    Ok(exists)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn row_to_stats(row: &Row<'_>) -> rusqlite::Result<PlayerStatsRow> {
    Ok(PlayerStatsRow {
        name: row.get(0)?,
        height: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        weight: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        team: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        age: row.get(4)?,
        salary: row.get(5)?,
        points: row.get(6)?,
        blocks: row.get(7)?,
        steals: row.get(8)?,
        assists: row.get(9)?,
        rebounds: row.get(10)?,
        ft: row.get(11)?,
        fta: row.get(12)?,
        fg3: row.get(13)?,
        fg3a: row.get(14)?,
        fg: row.get(15)?,
        fga: row.get(16)?,
        mp: row.get(17)?,
        g: row.get(18)?,
        per: row.get(19)?,
        ows: row.get(20)?,
        dws: row.get(21)?,
        ws: row.get(22)?,
        ws48: row.get(23)?,
        usg: row.get(24)?,
        bpm: row.get(25)?,
        vorp: row.get(26)?,
    })
}

/// Number of rows currently stored.
pub fn count_rows(conn: &Connection) -> Result<usize, Error> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM playerstats", [], |r| r.get(0))?;
    Ok(n as usize)
}
