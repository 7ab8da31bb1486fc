//! Environment-driven server configuration.
//!
//! # Responsibility
//! - Read listen address, storage, logging and Party settings.
//! - Apply defaults and reject malformed values before startup.

use citizen_core::{default_log_level, OAuth2Credentials, PartyClientConfig};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const BIND_ADDR_VAR: &str = "CITIZEN_BIND_ADDR";
const DB_PATH_VAR: &str = "CITIZEN_DB_PATH";
const LOG_LEVEL_VAR: &str = "CITIZEN_LOG_LEVEL";
const LOG_DIR_VAR: &str = "CITIZEN_LOG_DIR";
const DEFAULT_MUNICIPALITY_VAR: &str = "CITIZEN_DEFAULT_MUNICIPALITY_ID";
const PARTY_BASE_URL_VAR: &str = "PARTY_BASE_URL";
const PARTY_CONNECT_TIMEOUT_VAR: &str = "PARTY_CONNECT_TIMEOUT_SECS";
const PARTY_READ_TIMEOUT_VAR: &str = "PARTY_READ_TIMEOUT_SECS";
const PARTY_TOKEN_URL_VAR: &str = "PARTY_OAUTH2_TOKEN_URL";
const PARTY_CLIENT_ID_VAR: &str = "PARTY_OAUTH2_CLIENT_ID";
const PARTY_CLIENT_SECRET_VAR: &str = "PARTY_OAUTH2_CLIENT_SECRET";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_PATH: &str = "citizen.sqlite3";
const DEFAULT_MUNICIPALITY_ID: &str = "2281";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} is required but not set"),
            Self::Invalid { key, value, reason } => {
                write!(f, "{key} `{value}` is invalid: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` logs to stderr.
    pub log_dir: Option<String>,
    /// Used when a guid lookup omits `municipalityId`.
    pub default_municipality_id: String,
    pub party: PartyClientConfig,
}

impl ServerConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bind_raw = get(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                key: BIND_ADDR_VAR,
                value: bind_raw.clone(),
                reason: err.to_string(),
            })?;

        let party = PartyClientConfig {
            base_url: require(PARTY_BASE_URL_VAR)?,
            connect_timeout: parse_secs(
                PARTY_CONNECT_TIMEOUT_VAR,
                get(PARTY_CONNECT_TIMEOUT_VAR),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            read_timeout: parse_secs(
                PARTY_READ_TIMEOUT_VAR,
                get(PARTY_READ_TIMEOUT_VAR),
                DEFAULT_READ_TIMEOUT_SECS,
            )?,
            oauth2: OAuth2Credentials {
                token_url: require(PARTY_TOKEN_URL_VAR)?,
                client_id: require(PARTY_CLIENT_ID_VAR)?,
                client_secret: require(PARTY_CLIENT_SECRET_VAR)?,
            },
        };

        Ok(Self {
            bind_addr,
            db_path: PathBuf::from(get(DB_PATH_VAR).unwrap_or_else(|| DEFAULT_DB_PATH.to_string())),
            log_level: get(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(LOG_DIR_VAR),
            default_municipality_id: get(DEFAULT_MUNICIPALITY_VAR)
                .unwrap_or_else(|| DEFAULT_MUNICIPALITY_ID.to_string()),
            party,
        })
    }
}

fn parse_secs(key: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match raw {
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|err| ConfigError::Invalid {
                key,
                value,
                reason: err.to_string(),
            }),
        None => Ok(Duration::from_secs(default)),
    }
}
