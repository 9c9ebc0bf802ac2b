use ligue1_api::FeedConfig;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "ligue1_epg.xml";

/// Points the Fetcher at a local calendar snapshot instead of the network.
pub const CALENDAR_JSON_ENV: &str = "LIGUE1_EPG_CALENDAR_JSON";
/// Overrides the upstream API host.
pub const API_BASE_ENV: &str = "LIGUE1_EPG_API_BASE";

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub id: String,
    pub name: String,
    pub icon_url: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            id: "Ligue1Plus".into(),
            name: "Ligue 1+".into(),
            icon_url: "https://ligue1plus.fr/favicon.ico".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpgConfig {
    pub channel: ChannelConfig,
    pub feed: FeedConfig,
    pub output: PathBuf,
    pub api_base: Option<String>,
    pub calendar_json: Option<PathBuf>,
}

impl Default for EpgConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            feed: FeedConfig::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            api_base: None,
            calendar_json: None,
        }
    }
}

impl EpgConfig {
    /// Defaults, with the `LIGUE1_EPG_*` environment overrides applied.
    pub fn load() -> Self {
        Self::from_env(|key| std::env::var(key).ok())
    }

    fn from_env(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        Self {
            api_base: non_empty(API_BASE_ENV),
            calendar_json: non_empty(CALENDAR_JSON_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }
}
