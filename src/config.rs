use std::{str::FromStr, time::Duration};

use thiserror::Error;

pub const PORT: u16 = 5000;
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(15);
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("unknown LIMIT_MODE {0:?}, expected \"all\" or \"legacy\"")]
    UnknownLimitMode(String),
}

/// What `GET /messages` answers when `limit` is absent, zero or not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LimitMode {
    /// Every visible message.
    #[default]
    All,
    /// The parsed limit itself (`0`, or `null` for NaN), as older clients expect.
    Legacy,
}

impl FromStr for LimitMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(LimitMode::All),
            "legacy" => Ok(LimitMode::Legacy),
            _ => Err(ConfigError::UnknownLimitMode(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub sweep_interval: Duration,
    pub inactivity_timeout: Duration,
    pub limit_mode: LimitMode,
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Config {
        Config {
            database_url: database_url.into(),
            port: PORT,
            sweep_interval: SWEEP_INTERVAL,
            inactivity_timeout: INACTIVITY_TIMEOUT,
            limit_mode: LimitMode::default(),
        }
    }

    /// Reads `DATABASE_URL` and `LIMIT_MODE`, falling back to `.env`.
    pub fn from_env() -> Result<Config, ConfigError> {
        let database_url = dotenv::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;
        let limit_mode = match dotenv::var("LIMIT_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => LimitMode::default(),
        };

        Ok(Config {
            limit_mode,
            ..Config::new(database_url)
        })
    }
}
