//! YAML configuration for the scrapers and the HTTP fetcher.
//!
//! Every field has a default, so the config file is optional and may set any
//! subset of keys:
//!
//! ```yaml
//! base_url: https://www.basketball-reference.com
//! fetch_timeout_secs: 10
//! max_retries: 2
//! max_reserves: 10
//! teams:
//!   Boston: BOS
//!   Brooklyn: BRK
//! ```

use crate::teams::TeamCodes;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://www.basketball-reference.com";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the upstream site; scoreboard and game URLs are built on it.
    pub base_url: String,
    pub user_agent: String,
    pub fetch_timeout_secs: u64,
    /// Extra attempts for transient upstream failures. Zero disables retries.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    /// Rows at the top of each basic box score that are starters.
    pub starter_count: usize,
    /// Upper bound on reserve rows read after the separator row.
    pub max_reserves: usize,
    pub teams: TeamCodes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("hoopsbox/", env!("CARGO_PKG_VERSION")).to_string(),
            fetch_timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 500,
            starter_count: 5,
            max_reserves: 10,
            teams: TeamCodes::default(),
        }
    }
}

impl Config {
    /// Upper bound on one upstream request, connect to last byte.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Delay before the first retry.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Load the config from `path`, or fall back to defaults when no path is given.
///
/// # Arguments
///
/// * `path` - Optional path to a YAML file; every key in it is optional
///
/// # Returns
///
/// The merged configuration, or an error if the file cannot be read or parsed.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<Config, Box<dyn Error>> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(Config::default());
    };

    let raw = tokio::fs::read_to_string(path).await?;
    let config = parse_config(&raw)?;
    info!(
        base_url = %config.base_url,
        teams = config.teams.len(),
        "Loaded configuration"
    );
    Ok(config)
}

fn parse_config(raw: &str) -> Result<Config, serde_yaml::Error> {
    // An empty file deserializes to YAML null, which `serde(default)` rejects.
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(raw)
}
