use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::contract::Contract;

/// Client-side timeout applied by the stats data-access helper.
pub const STATS_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Narrative,
    Games,
    Offense,
    Defense,
    Players,
    Trends,
    Odds,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Narrative,
        Page::Games,
        Page::Offense,
        Page::Defense,
        Page::Players,
        Page::Trends,
        Page::Odds,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Page::Narrative => "Narrative",
            Page::Games => "Games",
            Page::Offense => "Offense",
            Page::Defense => "Defense",
            Page::Players => "Players",
            Page::Trends => "Trends",
            Page::Odds => "Odds",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Narrative => "/nba/narrative/markdown",
            Page::Games => "/nba/games/today",
            Page::Offense => "/nba/offense/teams",
            Page::Defense => "/nba/defense/teams",
            Page::Players => "/nba/player/performance",
            Page::Trends => "/nba/trends",
            Page::Odds => "/nba/odds/today",
        }
    }

    pub fn contract(self) -> Contract {
        match self {
            Page::Narrative => Contract::with_ok("markdown"),
            Page::Games => Contract::with_ok("games"),
            Page::Offense => Contract::field("teams"),
            Page::Defense => Contract::field("teams"),
            Page::Players => Contract::with_ok("players"),
            Page::Trends => Contract::field("player_trends"),
            Page::Odds => Contract::field("games"),
        }
    }

    /// The narrative page relies on the network stack alone; every stats page
    /// goes through the timed helper.
    pub fn timeout(self) -> Option<Duration> {
        match self {
            Page::Narrative => None,
            _ => Some(STATS_TIMEOUT),
        }
    }

    pub fn from_digit(c: char) -> Option<Page> {
        let idx = c.to_digit(10)? as usize;
        if idx == 0 {
            return None;
        }
        Page::ALL.get(idx - 1).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone)]
pub struct PanelState {
    pub status: PanelStatus,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub last_good: Option<Value>,
    pub last_updated: Option<Instant>,
    pub last_updated_at: Option<DateTime<Local>>,
    pub stale: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelState {
    pub fn new() -> Self {
        Self {
            status: PanelStatus::Idle,
            data: None,
            error: None,
            last_good: None,
            last_updated: None,
            last_updated_at: None,
            stale: false,
        }
    }

    pub fn loading(&self) -> bool {
        self.status == PanelStatus::Loading
    }

    /// What the page should draw: current data, else the last good snapshot.
    pub fn visible(&self) -> Option<&Value> {
        self.data.as_ref().or(self.last_good.as_ref())
    }

    /// Error shown as a non-blocking banner above still-visible data.
    pub fn banner(&self) -> Option<&str> {
        if self.visible().is_some() {
            self.error.as_deref()
        } else {
            None
        }
    }

    /// Error shown in place of the page when nothing good was ever fetched.
    pub fn blocking_error(&self) -> Option<&str> {
        if self.visible().is_none() {
            self.error.as_deref()
        } else {
            None
        }
    }

    pub(crate) fn begin_loading(&mut self) {
        self.status = PanelStatus::Loading;
    }

    pub(crate) fn apply_success(&mut self, payload: Value, now: Instant) {
        self.last_good = Some(payload.clone());
        self.data = Some(payload);
        self.error = None;
        self.last_updated = Some(now);
        self.last_updated_at = Some(Local::now());
        self.stale = false;
        self.status = PanelStatus::Ready;
    }

    pub(crate) fn apply_failure(&mut self, message: String) {
        self.error = Some(message);
        self.status = PanelStatus::Error;
    }
}

/// Stale once strictly more than `threshold` has passed since the last good
/// update. Nothing fetched yet is never stale.
pub fn is_stale(last_updated: Option<Instant>, now: Instant, threshold: Duration) -> bool {
    last_updated
        .map(|t| now.saturating_duration_since(t) > threshold)
        .unwrap_or(false)
}

pub fn status_label(status: PanelStatus) -> &'static str {
    match status {
        PanelStatus::Idle => "IDLE",
        PanelStatus::Loading => "LOADING",
        PanelStatus::Ready => "READY",
        PanelStatus::Error => "ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_keeps_previous_data_visible() {
        let mut state = PanelState::new();
        state.apply_success(json!({"ok": true, "markdown": "a"}), Instant::now());
        state.apply_failure("boom".to_string());
        assert_eq!(state.visible(), Some(&json!({"ok": true, "markdown": "a"})));
        assert_eq!(state.banner(), Some("boom"));
        assert_eq!(state.blocking_error(), None);
    }

    #[test]
    fn failure_without_data_blocks() {
        let mut state = PanelState::new();
        state.apply_failure("down".to_string());
        assert_eq!(state.blocking_error(), Some("down"));
        assert_eq!(state.banner(), None);
    }

    #[test]
    fn page_digits_map_in_order() {
        assert_eq!(Page::from_digit('1'), Some(Page::Narrative));
        assert_eq!(Page::from_digit('7'), Some(Page::Odds));
        assert_eq!(Page::from_digit('0'), None);
        assert_eq!(Page::from_digit('8'), None);
    }
}
