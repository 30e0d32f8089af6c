//! Process configuration, loaded once at startup and passed explicitly to whatever builds
//! loader registries.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{Error, Result};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(1);
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Batching knobs of a single loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    /// A batch holding this many distinct keys is dispatched without waiting.
    pub max_batch_size: usize,
    /// Longest time a batch stays open after its first key arrived.
    pub max_wait: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self { max_batch_size: DEFAULT_MAX_BATCH_SIZE, max_wait: DEFAULT_MAX_WAIT }
    }
}

/// The entity relationships a request gets a loader for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    UserById,
    VotesByPost,
    VotesByComment,
    CommentsByPost,
    CommentsByComment,
    CommentsByUser,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 6] = [
        LoaderKind::UserById,
        LoaderKind::VotesByPost,
        LoaderKind::VotesByComment,
        LoaderKind::CommentsByPost,
        LoaderKind::CommentsByComment,
        LoaderKind::CommentsByUser,
    ];

    /// Infix used by the per-kind environment overrides, e.g. `LOADER_USER_BY_ID_MAX_WAIT_MS`.
    pub fn env_name(self) -> &'static str {
        match self {
            LoaderKind::UserById => "USER_BY_ID",
            LoaderKind::VotesByPost => "VOTES_BY_POST",
            LoaderKind::VotesByComment => "VOTES_BY_COMMENT",
            LoaderKind::CommentsByPost => "COMMENTS_BY_POST",
            LoaderKind::CommentsByComment => "COMMENTS_BY_COMMENT",
            LoaderKind::CommentsByUser => "COMMENTS_BY_USER",
        }
    }
}

/// Settings for every loader kind: one default plus optional per-kind overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub default: LoaderSettings,
    pub overrides: HashMap<LoaderKind, LoaderSettings>,
}

impl LoaderConfig {
    pub fn settings(&self, kind: LoaderKind) -> LoaderSettings {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }

    pub fn with_override(mut self, kind: LoaderKind, settings: LoaderSettings) -> Self {
        self.overrides.insert(kind, settings);
        self
    }

    fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let default = LoaderSettings {
            max_batch_size: parse_var(&lookup, "LOADER_MAX_BATCH_SIZE")?
                .unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            max_wait: parse_var(&lookup, "LOADER_MAX_WAIT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_MAX_WAIT),
        };

        let mut overrides = HashMap::new();
        for kind in LoaderKind::ALL {
            let size_var = format!("LOADER_{}_MAX_BATCH_SIZE", kind.env_name());
            let wait_var = format!("LOADER_{}_MAX_WAIT_MS", kind.env_name());
            let max_batch_size = parse_var::<usize, _>(&lookup, &size_var)?;
            let max_wait = parse_var::<u64, _>(&lookup, &wait_var)?;
            if max_batch_size.is_none() && max_wait.is_none() {
                continue;
            }
            overrides.insert(
                kind,
                LoaderSettings {
                    max_batch_size: max_batch_size.unwrap_or(default.max_batch_size),
                    max_wait: max_wait.map(Duration::from_millis).unwrap_or(default.max_wait),
                },
            );
        }

        Ok(Self { default, overrides })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub loaders: LoaderConfig,
}

impl Config {
    /// Loads configuration from the environment, reading a `.env` file first if there is one.
    ///
    /// `DATABASE_URL` is required. Everything else has a default.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(%e, "no .env file loaded");
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Config("DATABASE_URL must be set".to_owned()))?;

        Ok(Self {
            database_url,
            max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            loaders: LoaderConfig::from_lookup(&lookup)?,
        })
    }

    pub async fn connect(&self) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;
        tracing::info!(max_connections = self.max_connections, "connected to postgres");
        Ok(pool)
    }
}

fn parse_var<T, L>(lookup: &L, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid {name} value {raw:?}: {e}"))),
    }
}
