use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::normalize::{self, Side};

#[derive(Debug, Clone, PartialEq)]
pub struct GameRow {
    pub away: String,
    pub home: String,
    pub status: String,
    pub date: String,
    pub venue: String,
}

pub fn game_rows(payload: &Value) -> Result<Vec<GameRow>> {
    let games = payload
        .get("games")
        .and_then(Value::as_array)
        .context("`games` is not a list")?;
    Ok(games
        .iter()
        .map(|g| GameRow {
            away: normalize::team_name(g, Side::Away),
            home: normalize::team_name(g, Side::Home),
            status: normalize::game_status(g),
            date: g
                .get("date")
                .and_then(Value::as_str)
                .map(short_time)
                .unwrap_or_default(),
            venue: g
                .get("venue")
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string(),
        })
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamOffense {
    pub team_name: String,
    #[serde(default)]
    pub rank_overall: Option<u32>,
    #[serde(default)]
    pub rank_pg: Option<u32>,
    #[serde(default)]
    pub rank_sg: Option<u32>,
    #[serde(default)]
    pub rank_sf: Option<u32>,
    #[serde(default)]
    pub rank_pf: Option<u32>,
    #[serde(default)]
    pub rank_c: Option<u32>,
    #[serde(default)]
    pub points_per_game: Option<f64>,
    #[serde(default)]
    pub assists_per_game: Option<f64>,
    #[serde(default)]
    pub rebounds_per_game: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamDefense {
    pub team_name: String,
    #[serde(default)]
    pub rank_overall: Option<u32>,
    #[serde(default)]
    pub defensive_rating: Option<f64>,
    #[serde(default)]
    pub opp_points_per_game: Option<f64>,
    #[serde(default)]
    pub opp_rebounds_per_game: Option<f64>,
    #[serde(default)]
    pub opp_assists_per_game: Option<f64>,
}

/// Offense and defense payloads share the same envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamTable<T> {
    #[serde(default)]
    pub date_generated: String,
    pub teams: Vec<T>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub live_error: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> TeamTable<T> {
    /// Backend notes worth surfacing under the table (fallback source, upstream errors).
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(source) = self.source.as_deref().filter(|s| !s.is_empty()) {
            notes.push(format!("source: {source}"));
        }
        if let Some(err) = self.live_error.as_deref().filter(|s| !s.is_empty()) {
            notes.push(format!("live error: {err}"));
        }
        if let Some(err) = self.error.as_deref().filter(|s| !s.is_empty()) {
            notes.push(format!("error: {err}"));
        }
        notes
    }
}

pub fn offense_table(payload: &Value) -> Result<TeamTable<TeamOffense>> {
    let mut table: TeamTable<TeamOffense> =
        TeamTable::deserialize(payload).context("offense payload")?;
    table
        .teams
        .sort_by(|a, b| rank_key(a.rank_overall, &a.team_name).cmp(&rank_key(b.rank_overall, &b.team_name)));
    Ok(table)
}

pub fn defense_table(payload: &Value) -> Result<TeamTable<TeamDefense>> {
    let mut table: TeamTable<TeamDefense> =
        TeamTable::deserialize(payload).context("defense payload")?;
    table
        .teams
        .sort_by(|a, b| rank_key(a.rank_overall, &a.team_name).cmp(&rank_key(b.rank_overall, &b.team_name)));
    Ok(table)
}

fn rank_key(rank: Option<u32>, name: &str) -> (u32, String) {
    (rank.unwrap_or(999), name.to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerPerformance {
    pub player_name: String,
    #[serde(default)]
    pub ppg: Option<f64>,
    #[serde(default)]
    pub rpg: Option<f64>,
    #[serde(default)]
    pub apg: Option<f64>,
    #[serde(default)]
    pub tpm: Option<f64>,
    #[serde(default)]
    pub season_ppg: Option<f64>,
    #[serde(default)]
    pub season_rpg: Option<f64>,
    #[serde(default)]
    pub season_apg: Option<f64>,
    #[serde(default)]
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlayersEnvelope {
    players: Vec<PlayerPerformance>,
}

pub fn player_rows(payload: &Value) -> Result<Vec<PlayerPerformance>> {
    let env = PlayersEnvelope::deserialize(payload).context("players payload")?;
    Ok(env.players)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerTrend {
    pub player_name: String,
    pub stat_type: String,
    #[serde(default)]
    pub last_n_games: Option<u32>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub trend_direction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamTrend {
    pub team_name: String,
    pub stat_type: String,
    #[serde(default)]
    pub home_away_split: Option<String>,
    #[serde(default)]
    pub last_n_games: Option<u32>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub trend_direction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendsSummary {
    #[serde(default)]
    pub date_generated: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub player_trends: Vec<PlayerTrend>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub team_trends: Vec<TeamTrend>,
}

pub fn trends_summary(payload: &Value) -> Result<TrendsSummary> {
    TrendsSummary::deserialize(payload).context("trends payload")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Moneyline {
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub american: Option<i64>,
    #[serde(default)]
    pub bookmaker: Option<String>,
}

impl Moneyline {
    /// Implied win probability from decimal odds; none for prices at or below 1.0.
    pub fn implied_prob(&self) -> Option<f64> {
        implied_prob(self.price?)
    }
}

pub fn implied_prob(decimal: f64) -> Option<f64> {
    if decimal.is_finite() && decimal > 1.0 {
        Some(1.0 / decimal)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsRow {
    pub away: String,
    pub home: String,
    pub commence: String,
    pub away_american: Option<i64>,
    pub home_american: Option<i64>,
    pub away_prob: Option<f64>,
    pub home_prob: Option<f64>,
    pub bookmaker: String,
}

pub fn odds_rows(payload: &Value) -> Result<Vec<OddsRow>> {
    let games = payload
        .get("games")
        .and_then(Value::as_array)
        .context("`games` is not a list")?;
    let mut rows = Vec::with_capacity(games.len());
    for game in games {
        let ml = game.get("moneyline");
        let side = |key: &str| -> Moneyline {
            ml.and_then(|m| m.get(key))
                .and_then(|v| Moneyline::deserialize(v).ok())
                .unwrap_or_default()
        };
        let home = side("home");
        let away = side("away");
        let bookmaker = home
            .bookmaker
            .clone()
            .or_else(|| away.bookmaker.clone())
            .unwrap_or_else(|| "-".to_string());
        rows.push(OddsRow {
            away: normalize::team_name(game, Side::Away),
            home: normalize::team_name(game, Side::Home),
            commence: game
                .get("commence_time")
                .and_then(Value::as_str)
                .map(short_time)
                .unwrap_or_default(),
            away_american: away.american,
            home_american: home.american,
            away_prob: away.implied_prob(),
            home_prob: home.implied_prob(),
            bookmaker,
        });
    }
    Ok(rows)
}

/// Narrative markdown plus the diagnostics the backend attaches.
pub fn narrative_markdown(payload: &Value) -> Option<&str> {
    payload.get("markdown").and_then(Value::as_str)
}

/// `raw.meta` when present, else a top-level `meta` object.
pub fn payload_meta(payload: &Value) -> Option<&Value> {
    payload
        .get("raw")
        .and_then(|raw| raw.get("meta"))
        .or_else(|| payload.get("meta"))
        .filter(|m| m.is_object())
}

pub fn format_american(value: Option<i64>) -> String {
    match value {
        Some(v) if v > 0 => format!("+{v}"),
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

pub fn format_stat(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| "-".to_string())
}

/// `YYYY-MM-DD HH:MM` in the timestamp's own offset. Anything that does not
/// parse ("TBD", "Today") is returned trimmed and untouched.
fn short_time(raw: &str) -> String {
    let cleaned = raw.trim();
    match parse_timestamp(cleaned) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => cleaned.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
