//! Command-line interface definitions for hoopsbox.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options shared by every subcommand live on [`Cli`]; most can also be set
//! through environment variables.

use crate::db::LoadMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for hoopsbox.
///
/// # Examples
///
/// ```sh
/// # Serve the JSON API on the default port
/// hoopsbox serve
///
/// # Serve on another port with a config file
/// PORT=9000 hoopsbox --config hoopsbox.yaml serve
///
/// # Load a season stats file into the database
/// hoopsbox --database stats.db load-stats nbastats2018-2019.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// SQLite database holding season player stats
    #[arg(long, env = "HOOPSBOX_DB", default_value = "playerstats.db", global = true)]
    pub database: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the box score JSON API
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 8000)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Directory holding index.html and search.html
        #[arg(long, default_value = "templates")]
        templates_dir: PathBuf,
    },
    /// Load a season player stats CSV file into the database
    LoadStats {
        /// CSV file with 27 positional columns
        csv: PathBuf,

        /// The file has no header row
        #[arg(long)]
        no_headers: bool,

        /// What to do with records that cannot be loaded
        #[arg(long, value_enum, default_value_t = LoadMode::SkipBadRows)]
        mode: LoadMode,
    },
}
