//! Startup configuration, read once from the environment and passed to
//! constructors explicitly.

use std::fmt;
use std::time::Duration;

use anyhow::{Context as _, bail};
use biolink_utils::parse::{parse_duration_seconds, parse_flag};
use biolink_utils::time::DEFAULT_WARNING_EXPIRY;

pub const DEFAULT_WARNING_THRESHOLD: u32 = 3;
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_GATEWAY_ATTEMPTS: u32 = 2;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Escalation policy knobs shared by every group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModerationConfig {
    /// Warning count at which the group's escalation action applies.
    pub warning_threshold: u32,
    /// Warnings decay after this long without a new violation.
    pub warning_expiry: Duration,
    /// Upper bound on a single gateway call.
    pub gateway_timeout: Duration,
    /// Total attempts for a transiently failing gateway call.
    pub gateway_attempts: u32,
    /// Delay before the n-th retry is `n * gateway_retry_backoff`.
    pub gateway_retry_backoff: Duration,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            warning_expiry: DEFAULT_WARNING_EXPIRY,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            gateway_attempts: DEFAULT_GATEWAY_ATTEMPTS,
            gateway_retry_backoff: Duration::from_millis(250),
        }
    }
}

impl ModerationConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let warning_threshold = match lookup("WARNING_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("WARNING_THRESHOLD is not a number: `{raw}`"))?,
            None => defaults.warning_threshold,
        };
        if warning_threshold == 0 {
            bail!("WARNING_THRESHOLD must be at least 1");
        }

        let gateway_attempts = match lookup("GATEWAY_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("GATEWAY_ATTEMPTS is not a number: `{raw}`"))?
                .max(1),
            None => defaults.gateway_attempts,
        };

        Ok(Self {
            warning_threshold,
            warning_expiry: env_duration(&lookup, "WARNING_EXPIRY", defaults.warning_expiry)?,
            gateway_timeout: env_duration(&lookup, "GATEWAY_TIMEOUT", defaults.gateway_timeout)?,
            gateway_attempts,
            gateway_retry_backoff: defaults.gateway_retry_backoff,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

/// Process wiring: credentials, endpoints and infrastructure switches.
#[derive(Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub telegram_api_url: String,
    pub http_timeout: Duration,
    pub poll_timeout: Duration,
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub redis_enabled: bool,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub auto_run_migrations: bool,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("http_timeout", &self.http_timeout)
            .field("poll_timeout", &self.poll_timeout)
            .field("storage", &self.storage)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("redis_enabled", &self.redis_enabled)
            .field("redis_key_prefix", &self.redis_key_prefix)
            .field("auto_run_migrations", &self.auto_run_migrations)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bot_token = non_empty(&lookup, "BOT_TOKEN").context("BOT_TOKEN is required")?;

        let storage = match non_empty(&lookup, "STORAGE_BACKEND")
            .map(|raw| raw.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("postgres") => StorageKind::Postgres,
            Some("memory") => StorageKind::Memory,
            Some(other) => bail!("unknown STORAGE_BACKEND `{other}` (expected postgres or memory)"),
        };

        let database_url = non_empty(&lookup, "DATABASE_URL");
        if storage == StorageKind::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORAGE_BACKEND=postgres");
        }

        Ok(Self {
            bot_token,
            telegram_api_url: non_empty(&lookup, "TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_owned()),
            http_timeout: env_duration(&lookup, "HTTP_TIMEOUT", Duration::from_secs(10))?,
            poll_timeout: env_duration(&lookup, "POLL_TIMEOUT", Duration::from_secs(30))?,
            storage,
            database_url,
            redis_enabled: env_bool(&lookup, "REDIS_ENABLED", false),
            redis_url: non_empty(&lookup, "REDIS_URL"),
            redis_key_prefix: non_empty(&lookup, "REDIS_KEY_PREFIX")
                .unwrap_or_else(|| "biolink:prod".to_owned()),
            auto_run_migrations: env_bool(&lookup, "AUTO_RUN_MIGRATIONS", true),
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .and_then(|value| parse_flag(&value))
        .unwrap_or(default)
}

fn env_duration(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    match non_empty(lookup, key) {
        Some(raw) => parse_duration_seconds(&raw)
            .map(Duration::from_secs)
            .with_context(|| format!("{key} is not a duration (try `30s`, `12h`): `{raw}`")),
        None => Ok(default),
    }
}
