use crate::error::{PollError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:trusty_tally.db";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_BAR_WIDTH: usize = 20;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const MAX_BAR_WIDTH: usize = 200;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub check_interval: Duration,
    pub bar_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);
        let max_connections =
            parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections);
        let check_interval = parse_var::<u64, _>(&lookup, "POLL_CHECK_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.check_interval);
        let bar_width = parse_var(&lookup, "RESULTS_BAR_WIDTH")?.unwrap_or(defaults.bar_width);

        if max_connections == 0 {
            return Err(PollError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        if bar_width > MAX_BAR_WIDTH {
            return Err(PollError::Config(format!(
                "RESULTS_BAR_WIDTH must be at most {}",
                MAX_BAR_WIDTH
            )));
        }
        if check_interval.is_zero() {
            return Err(PollError::Config(
                "POLL_CHECK_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
            check_interval,
            bar_width,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| PollError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}
