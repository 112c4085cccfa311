use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const WORKSPACE_ENV: &str = "ROLLCALLD_WORKSPACE";
pub const TODAY_ENV: &str = "ROLLCALLD_TODAY";
pub const DEFAULT_LOG_FILTER: &str = "rollcalld=info";

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Workspace to open before the first request.
    pub workspace: Option<PathBuf>,
    /// Pinned calendar date; the local date is used when unset.
    pub today: Option<NaiveDate>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workspace = lookup(WORKSPACE_ENV)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let today = match lookup(TODAY_ENV).map(|s| s.trim().to_string()) {
            Some(s) if !s.is_empty() => Some(
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .with_context(|| format!("{TODAY_ENV} must be YYYY-MM-DD, got {s:?}"))?,
            ),
            _ => None,
        };
        Ok(Config { workspace, today })
    }
}

/// Log to stderr; stdout is reserved for protocol responses.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
