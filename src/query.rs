use crate::controller::RefreshOptions;
use crate::panel::Page;
use crate::prefs::{MAX_CACHE_TTL, Preferences, TrendsOverride};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrativeMode {
    #[default]
    Template,
    Ai,
}

impl NarrativeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NarrativeMode::Template => "template",
            NarrativeMode::Ai => "ai",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            NarrativeMode::Template => NarrativeMode::Ai,
            NarrativeMode::Ai => NarrativeMode::Template,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "template" => Some(NarrativeMode::Template),
            "ai" => Some(NarrativeMode::Ai),
            _ => None,
        }
    }
}

/// Query for the narrative endpoint. `bust_cache` forces `cache_ttl=0`, which
/// makes the backend skip its response cache.
pub fn narrative_query(
    mode: NarrativeMode,
    prefs: &Preferences,
    bust_cache: bool,
) -> Vec<(String, String)> {
    let mut query = vec![("mode".to_string(), mode.as_str().to_string())];
    match prefs.trends {
        TrendsOverride::Default => {}
        TrendsOverride::On => query.push(("trends".to_string(), "1".to_string())),
        TrendsOverride::Off => query.push(("trends".to_string(), "0".to_string())),
    }
    if prefs.compact {
        query.push(("compact".to_string(), "true".to_string()));
    }
    let ttl = if bust_cache {
        0
    } else {
        prefs.cache_ttl.min(MAX_CACHE_TTL)
    };
    query.push(("cache_ttl".to_string(), ttl.to_string()));
    query
}

pub fn refresh_options(
    page: Page,
    mode: NarrativeMode,
    prefs: &Preferences,
    bust_cache: bool,
) -> RefreshOptions {
    match page {
        Page::Narrative => {
            let options = RefreshOptions {
                query: narrative_query(mode, prefs, false),
                ..RefreshOptions::default()
            };
            if bust_cache {
                options.with_once("cache_ttl", "0")
            } else {
                options
            }
        }
        _ => RefreshOptions::default(),
    }
}
