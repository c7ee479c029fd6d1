//! Team and status resolution for game-shaped payloads.
//!
//! Endpoints disagree on where team names live. Every caller goes through
//! this adapter instead of probing fields inline. Bump [`ADAPTER_VERSION`]
//! whenever the priority lists change.

use serde_json::Value;

pub const ADAPTER_VERSION: u32 = 1;

pub const FALLBACK_HOME: &str = "Home";
pub const FALLBACK_AWAY: &str = "Away";
pub const FALLBACK_STATUS: &str = "Scheduled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    fn key(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }

    fn team_key(self) -> &'static str {
        match self {
            Side::Home => "home_team",
            Side::Away => "away_team",
        }
    }

    fn fallback(self) -> &'static str {
        match self {
            Side::Home => FALLBACK_HOME,
            Side::Away => FALLBACK_AWAY,
        }
    }
}

/// Priority:
/// 1. `<side>_team.name`
/// 2. `teams.<side>.name`
/// 3. `<side>_team` as a string
/// 4. `<side>` as a string
/// 5. "Home" / "Away"
pub fn team_name(game: &Value, side: Side) -> String {
    let candidates = [
        game.get(side.team_key()).and_then(|t| t.get("name")),
        game.get("teams")
            .and_then(|t| t.get(side.key()))
            .and_then(|t| t.get("name")),
        game.get(side.team_key()),
        game.get(side.key()),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(non_empty_str)
        .unwrap_or(side.fallback())
        .to_string()
}

/// Returns `(away, home)`, the order matchups are printed in.
pub fn matchup(game: &Value) -> (String, String) {
    (team_name(game, Side::Away), team_name(game, Side::Home))
}

/// `status.short`, `status.long`, plain-string `status`, then "Scheduled".
pub fn game_status(game: &Value) -> String {
    let status = game.get("status");
    let candidates = [
        status.and_then(|s| s.get("short")),
        status.and_then(|s| s.get("long")),
        status,
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(non_empty_str)
        .unwrap_or(FALLBACK_STATUS)
        .to_string()
}

fn non_empty_str(v: &Value) -> Option<&str> {
    v.as_str().map(str::trim).filter(|s| !s.is_empty())
}
