use std::env;
use std::time::Duration;

use crate::query::NarrativeMode;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub narrative_mode: NarrativeMode,
    pub narrative_poll: Option<Duration>,
    pub stats_poll: Option<Duration>,
    pub stale_after: Duration,
    pub stale_check: Duration,
    pub demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("HOOPS_API_BASE")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let narrative_mode = lookup("NARRATIVE_MODE")
            .and_then(|raw| NarrativeMode::parse(&raw))
            .unwrap_or_default();

        let narrative_poll = parse_secs(&lookup, "NARRATIVE_POLL_SECS")
            .unwrap_or(60);
        let narrative_poll =
            (narrative_poll > 0).then(|| Duration::from_secs(narrative_poll.max(10)));

        let stats_poll = parse_secs(&lookup, "STATS_POLL_SECS").unwrap_or(0);
        let stats_poll = (stats_poll > 0).then(|| Duration::from_secs(stats_poll.max(30)));

        let stale_after = parse_secs(&lookup, "STALE_AFTER_SECS")
            .unwrap_or(60)
            .clamp(5, 3600);
        let stale_check = parse_secs(&lookup, "STALE_CHECK_SECS")
            .unwrap_or(5)
            .clamp(1, 60);

        let demo = lookup("HOOPS_DEMO")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            api_base,
            narrative_mode,
            narrative_poll,
            stats_poll,
            stale_after: Duration::from_secs(stale_after),
            stale_check: Duration::from_secs(stale_check),
            demo,
        }
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|val| val.trim().parse::<u64>().ok())
}
