//! Application configuration management.
//!
//! Configuration comes from the process environment, optionally seeded from a
//! `.env` file by the binary. The upper-case names are canonical; the
//! camelCase names used by earlier deployments are still read as fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::api::client::REQUEST_TIMEOUT_SECS;
use crate::auth::Credentials;
use crate::models::ServiceConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIME_ZONE: &str = "America/Chicago";
const DEFAULT_LOG_LEVEL: &str = "info";
const STATIC_DIR: &str = "./public";
const DEV_STATIC_DIR: &str = "./frontend/dist";

/// Services blocked whenever no temporary configuration is in effect.
pub const DEFAULT_BLOCKED_SERVICES: &[&str] = &[
    "tinder", "plenty_of_fish", "onlyfans", "playstation", "nintendo", "tiktok",
    "aliexpress", "500px", "activision_blizzard", "battle_net", "betway", "blaze",
    "box", "crunchyroll", "directvgo", "disneyplus", "ebay", "espn", "flickr",
    "iheartradio", "iqiyi", "kook", "line", "mercado_libre", "ok", "origin", "qq",
    "riot_games", "signal", "tidal", "tumblr", "ubisoft", "vimeo", "wargaming",
    "xiaohongshu", "zhihu", "yy", "weibo", "wechat", "voot", "viber", "twitch",
    "wizz", "shein", "paramountplus", "pluto_tv", "mail_ru", "kakaotalk", "imgur",
    "hulu", "globoplay", "dailymotion", "clubhouse", "canais_globo", "betano",
    "bigo_live", "amino", "9gag", "betfair", "bilibili", "bluesky", "claro",
    "coolapk", "deezer", "kik", "leagueoflegends", "lionsgateplus", "mastodon",
    "rockstar_games", "temu", "telegram", "soundcloud", "samsung_tv_plus", "looke",
    "hbomax", "discoveryplus", "gog", "nebula", "facebook", "privacy", "snapchat",
    "youtube", "roblox", "spotify_video", "spotify",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub default_blocked_services: Vec<String>,
    pub default_time_zone: String,
    pub port: u16,
    pub log_level: String,
    /// Directory prefix for the log file; file logging is off when unset.
    pub log_path: Option<String>,
    pub request_timeout: Duration,
    /// `Dev` serves the web UI from the frontend build output.
    pub environment: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get(&["AUTH_BASE_URL", "authBaseURL"]).ok_or(ConfigError::Missing("AUTH_BASE_URL"))?;
        let username = get(&["AUTH_USERNAME", "authUsername"]).unwrap_or_default();
        let password = get(&["AUTH_PASSWORD", "authPassword"]).unwrap_or_default();

        let default_blocked_services = match get(&["DEFAULT_BLOCKED_SERVICES", "defaultBlockedServices"]) {
            Some(list) => list
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            None => DEFAULT_BLOCKED_SERVICES.iter().map(|id| id.to_string()).collect(),
        };

        let port = match get(&["PORT"]) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let request_timeout = match get(&["REQUEST_TIMEOUT_SECS"]) {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid { key: "REQUEST_TIMEOUT_SECS", value })?,
            None => Duration::from_secs(REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            credentials: Credentials::new(base_url, username, password),
            default_blocked_services,
            default_time_zone: get(&["DEFAULT_TIME_ZONE"]).unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
            port,
            log_level: get(&["LOG_LEVEL", "logLevel"]).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_path: get(&["LOG_PATH", "logPath"]),
            request_timeout,
            environment: get(&["ENVIRONMENT", "Environment"]),
        })
    }

    /// The configuration the reset timer restores
    pub fn default_service_config(&self) -> ServiceConfig {
        ServiceConfig::new(self.default_blocked_services.clone(), self.default_time_zone.clone())
    }

    /// Directory the web UI is served from
    pub fn static_dir(&self) -> PathBuf {
        match self.environment.as_deref() {
            Some(env) if env.eq_ignore_ascii_case("dev") => PathBuf::from(DEV_STATIC_DIR),
            _ => PathBuf::from(STATIC_DIR),
        }
    }
}
