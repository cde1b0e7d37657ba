//! Process configuration.
//!
//! Every setting has a default, so an empty environment yields a working
//! configuration. Values are read from the process environment, after
//! loading a `.env` file if one exists:
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `MESSAGE_SERVER_URL` | messaging service URL | `http://theredshirts-message:1203` |
//! | `SYSTEM_PLAYER_ID` | sender of system events | nil UUID |
//! | `SCAVENGER_INTERVAL_SECS` | time between sweeps | 10 |
//! | `PLAYER_WARNING_SECS` | silence before `PLAYER_LAGGING` | 20 |
//! | `PLAYER_DELETE_SECS` | further silence before eviction | 60 |
//! | `LOG_LEVEL` | fallback log filter when `RUST_LOG` is unset | `crewlobby=info` |

use std::str::FromStr;
use std::time::Duration;

use crewlobby_messaging::MessagingConfig;
use crewlobby_protocol::PlayerId;
use crewlobby_scavenger::ScavengerConfig;

use crate::CrewlobbyError;

pub const DEFAULT_LOG_FILTER: &str = "crewlobby=info";

/// Settings for a whole [`LobbyServer`](crate::LobbyServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub messaging: MessagingConfig,
    pub scavenger: ScavengerConfig,
    /// Filter handed to [`setup_logging`](crate::setup_logging).
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            messaging: MessagingConfig::default(),
            scavenger: ScavengerConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the environment and an optional `.env`
    /// file.
    ///
    /// # Errors
    /// Returns [`CrewlobbyError::Config`] naming the first variable that is
    /// set but cannot be parsed.
    pub fn from_env() -> Result<Self, CrewlobbyError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    ///
    /// Unset and empty variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CrewlobbyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("MESSAGE_SERVER_URL") {
            config.messaging = config.messaging.with_server_url(url.trim());
        }
        if let Some(id) = parse::<PlayerId>(&get, "SYSTEM_PLAYER_ID")? {
            config.messaging = config.messaging.with_system_player_id(id);
        }
        if let Some(secs) = parse::<u64>(&get, "SCAVENGER_INTERVAL_SECS")? {
            config.scavenger = config.scavenger.with_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = parse::<u64>(&get, "PLAYER_WARNING_SECS")? {
            config.scavenger = config
                .scavenger
                .with_warning_after(Duration::from_secs(secs));
        }
        if let Some(secs) = parse::<u64>(&get, "PLAYER_DELETE_SECS")? {
            config.scavenger = config
                .scavenger
                .with_delete_after(Duration::from_secs(secs));
        }
        if let Some(filter) = get("LOG_LEVEL") {
            config.log_filter = filter.trim().to_string();
        }
        Ok(config)
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, CrewlobbyError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|err| CrewlobbyError::Config(format!("{key}: {err}")))
        })
        .transpose()
}
