//! Process configuration, read from `PACKSHIP_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` / `PACKSHIP_PORT` | `8080` (`PORT` wins when both are set) |
//! | `PACKSHIP_STORE` | `memory` (`memory` or `postgres`) |
//! | `PACKSHIP_DATABASE_URL` | unset; overrides the `DB_*` parts |
//! | `PACKSHIP_DB_HOST` | required for `postgres` without a URL |
//! | `PACKSHIP_DB_PORT` | `5432` |
//! | `PACKSHIP_DB_USERNAME` | `postgres` |
//! | `PACKSHIP_DB_PASSWORD` | empty |
//! | `PACKSHIP_DB_NAME` | `postgres` |
//! | `PACKSHIP_DB_SSL` | `false` |
//! | `PACKSHIP_LOG_LEVEL` | `info` |
//! | `PACKSHIP_FRONTEND_URL` | unset (no CORS origin) |
//! | `PACKSHIP_PACK_SIZES` | `250,500,1000,2000,5000` |
//! | `PACKSHIP_MAX_ORDER_ITEMS` | `1000000` |

use std::fmt;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

use packship_infra::DEFAULT_MAX_ORDER_ITEMS;
use packship_packing::PackCatalog;

const PREFIX: &str = "PACKSHIP_";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PACK_SIZES: [u64; 5] = [250, 500, 1000, 2000, 5000];
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required")]
    Missing { key: String },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Where orders and the pack catalog live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres(DatabaseConfig),
}

#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        username: String,
        password: String,
        name: String,
        ssl: bool,
    },
}

impl DatabaseConfig {
    /// Connection options for sqlx. Credentials are passed as-is, so
    /// passwords need no URL escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        match self {
            DatabaseConfig::Url(url) => PgConnectOptions::from_str(url).map_err(|e| {
                ConfigError::invalid(&format!("{PREFIX}DATABASE_URL"), "<redacted>", e.to_string())
            }),
            DatabaseConfig::Parts {
                host,
                port,
                username,
                password,
                name,
                ssl,
            } => {
                let mut options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(username)
                    .database(name)
                    .ssl_mode(if *ssl {
                        PgSslMode::Require
                    } else {
                        PgSslMode::Disable
                    });
                if !password.is_empty() {
                    options = options.password(password);
                }
                Ok(options)
            }
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseConfig::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            DatabaseConfig::Parts {
                host,
                port,
                username,
                name,
                ssl,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("password", &"<redacted>")
                .field("name", name)
                .field("ssl", ssl)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub log_level: String,
    pub frontend_url: Option<String>,
    /// Catalog to install at startup.
    pub pack_sizes: Vec<u64>,
    /// `true` when `PACK_SIZES` was set explicitly; the stored catalog is
    /// then replaced instead of only seeded when empty.
    pub pack_sizes_explicit: bool,
    pub max_order_items: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store: StoreBackend::Memory,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            frontend_url: None,
            pack_sizes: DEFAULT_PACK_SIZES.to_vec(),
            pack_sizes_explicit: false,
            max_order_items: DEFAULT_MAX_ORDER_ITEMS,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let port = match env.raw("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_port("PORT", &raw)?,
            None => env.parse("PORT", DEFAULT_PORT, |key, raw| parse_port(key, raw))?,
        };

        let store = match env.get("STORE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => StoreBackend::Postgres(database_config(&env)?),
            Some(other) => {
                return Err(ConfigError::invalid(
                    &env.key("STORE"),
                    other,
                    "expected `memory` or `postgres`",
                ));
            }
        };

        let log_level = env
            .get("LOG_LEVEL")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let frontend_url = env.get("FRONTEND_URL");

        let (pack_sizes, pack_sizes_explicit) = match env.get("PACK_SIZES") {
            Some(raw) => (parse_pack_sizes(&env.key("PACK_SIZES"), &raw)?, true),
            None => (DEFAULT_PACK_SIZES.to_vec(), false),
        };

        let max_order_items = env.parse("MAX_ORDER_ITEMS", DEFAULT_MAX_ORDER_ITEMS, |key, raw| {
            match raw.trim().parse::<u64>() {
                Ok(0) => Err(ConfigError::invalid(key, raw, "must be positive")),
                Ok(n) => Ok(n),
                Err(e) => Err(ConfigError::invalid(key, raw, e.to_string())),
            }
        })?;
        // The selector's search table spans requested + largest pack, so both
        // are held to the same ceiling.
        if let Some(largest) = pack_sizes.iter().copied().max().filter(|s| *s > max_order_items) {
            return Err(ConfigError::invalid(
                &env.key("PACK_SIZES"),
                &largest.to_string(),
                format!("exceeds {PREFIX}MAX_ORDER_ITEMS ({max_order_items})"),
            ));
        }

        Ok(Self {
            port,
            store,
            log_level,
            frontend_url,
            pack_sizes,
            pack_sizes_explicit,
            max_order_items,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, name: &str) -> String {
        format!("{PREFIX}{name}")
    }

    /// Unprefixed lookup.
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    /// Prefixed lookup; blank values count as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.key(name)).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(
        &self,
        name: &str,
        default: T,
        parse: impl Fn(&str, &str) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => parse(&self.key(name), &raw),
            None => Ok(default),
        }
    }
}

fn database_config<F>(env: &Env<F>) -> Result<DatabaseConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env.get("DATABASE_URL") {
        return Ok(DatabaseConfig::Url(url));
    }

    let host = env.get("DB_HOST").ok_or_else(|| ConfigError::Missing {
        key: env.key("DB_HOST"),
    })?;
    let port = env.parse("DB_PORT", DEFAULT_DB_PORT, |key, raw| parse_port(key, raw))?;
    let ssl = env.parse("DB_SSL", false, |key, raw| {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::invalid(key, raw, "expected a boolean")),
        }
    })?;

    Ok(DatabaseConfig::Parts {
        host,
        port,
        username: env.get("DB_USERNAME").unwrap_or_else(|| "postgres".to_string()),
        password: (env.lookup)(&env.key("DB_PASSWORD")).unwrap_or_default(),
        name: env.get("DB_NAME").unwrap_or_else(|| "postgres".to_string()),
        ssl,
    })
}

fn parse_port(key: &str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::invalid(key, raw, e.to_string()))
}

fn parse_pack_sizes(key: &str, raw: &str) -> Result<Vec<u64>, ConfigError> {
    let sizes = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| ConfigError::invalid(key, raw, format!("{s:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    PackCatalog::new(sizes.iter().copied())
        .map_err(|e| ConfigError::invalid(key, raw, e.to_string()))?;
    Ok(sizes)
}
