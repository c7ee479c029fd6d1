use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

use crate::error::FetchError;
use crate::fetch::{CancelToken, Fetch, PanelRequest};

const TEAMS: [&str; 12] = [
    "Boston Celtics",
    "Denver Nuggets",
    "Milwaukee Bucks",
    "Phoenix Suns",
    "Golden State Warriors",
    "Los Angeles Lakers",
    "Miami Heat",
    "Dallas Mavericks",
    "New York Knicks",
    "Oklahoma City Thunder",
    "Minnesota Timberwolves",
    "Cleveland Cavaliers",
];

const PLAYERS: [&str; 8] = [
    "Jayson Tatum",
    "Nikola Jokic",
    "Giannis Antetokounmpo",
    "Devin Booker",
    "Stephen Curry",
    "Luka Doncic",
    "Shai Gilgeous-Alexander",
    "Anthony Edwards",
];

/// In-process stand-in for the stats backend. Payloads are randomized on
/// every call, latency is simulated, and a small share of calls fail with
/// `ok:false` so the fallback paths stay visible.
#[derive(Debug, Clone)]
pub struct DemoBackend {
    failure_rate: f64,
    latency: (u64, u64),
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBackend {
    pub fn new() -> Self {
        Self {
            failure_rate: 0.08,
            latency: (120, 700),
        }
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_latency_ms(mut self, min: u64, max: u64) -> Self {
        self.latency = (min.min(max), max.max(min));
        self
    }

    fn simulate_latency(&self, cancel: &CancelToken) -> Result<u64, FetchError> {
        let (min, max) = self.latency;
        let total = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        let started = Instant::now();
        let budget = Duration::from_millis(total);
        while started.elapsed() < budget {
            cancel.check()?;
            thread::sleep(Duration::from_millis(20).min(budget));
        }
        cancel.check()?;
        Ok(total)
    }
}

impl Fetch for DemoBackend {
    fn fetch(&self, request: &PanelRequest, cancel: &CancelToken) -> Result<Value, FetchError> {
        let latency_ms = self.simulate_latency(cancel)?;
        let mut rng = rand::thread_rng();

        if rng.gen_bool(self.failure_rate) {
            return Ok(json!({
                "ok": false,
                "error": "Upstream API error: demo provider hiccup",
            }));
        }

        let payload = match request.path {
            "/nba/narrative/markdown" => narrative(request, latency_ms, &mut rng),
            "/nba/games/today" => games_today(&mut rng),
            "/nba/offense/teams" => offense(&mut rng),
            "/nba/defense/teams" => defense(&mut rng),
            "/nba/player/performance" => players(&mut rng),
            "/nba/trends" => trends(&mut rng),
            "/nba/odds/today" => odds(&mut rng),
            other => {
                return Err(FetchError::Status {
                    status: 404,
                    detail: format!("demo backend has no route {other}"),
                });
            }
        };
        Ok(payload)
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

fn shuffled_pairs(rng: &mut impl Rng, count: usize) -> Vec<(&'static str, &'static str)> {
    let mut teams = TEAMS.to_vec();
    teams.shuffle(rng);
    teams
        .chunks(2)
        .take(count)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

fn jitter(base: f64, spread: f64, rng: &mut impl Rng) -> f64 {
    let v = base + rng.gen_range(-spread..spread);
    (v * 10.0).round() / 10.0
}

fn narrative(request: &PanelRequest, latency_ms: u64, rng: &mut impl Rng) -> Value {
    let mode = request.query_value("mode").unwrap_or("template");
    let compact = request.query_value("compact") == Some("true");
    let trends_override = match request.query_value("trends") {
        Some("1") => Value::Bool(true),
        Some("0") => Value::Bool(false),
        _ => Value::Null,
    };
    let trends_enabled = trends_override.as_bool().unwrap_or(false);
    let cache_ttl: u64 = request
        .query_value("cache_ttl")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let pairs = shuffled_pairs(rng, 3);
    let matchups = pairs
        .iter()
        .map(|(away, home)| format!("{away} @ {home} (NS)"))
        .collect::<Vec<_>>()
        .join("; ");
    let player_trends = if trends_enabled { rng.gen_range(2..6) } else { 0 };

    let mut soft_errors = serde_json::Map::new();
    if !trends_enabled {
        soft_errors.insert(
            "trends".to_string(),
            json!("Disabled (trends=0 override or ENABLE_TRENDS_IN_NARRATIVE=0)."),
        );
    }
    if mode == "ai" {
        soft_errors.insert(
            "ai".to_string(),
            json!("AI mode requested but not allowed (OPENAI_API_KEY missing/disabled)."),
        );
    }

    let mut sections = vec![
        format!(
            "**NBA Narrative**  \n_Generated: {} • Model: {}_",
            now_iso(),
            if mode == "ai" { "gpt-4o" } else { "template" }
        ),
        "\n### Macro Summary".to_string(),
        format!("- Slate overview: {} NBA game(s) were returned for the current window.", pairs.len()),
        format!("- Sample matchups: {matchups}."),
        format!(
            "- Data coverage: odds_games={}, player_trends={player_trends}, team_trends=0, player_props=0.",
            pairs.len()
        ),
    ];
    if !compact {
        sections.push("\n### Key Edges".to_string());
        for (idx, (away, home)) in pairs.iter().enumerate() {
            sections.push(format!("{}. **Market Context** (score: 5.0)", idx + 1));
            sections.push(format!(
                "   {away} @ {home}: moneyline context shows away {:+} and home {:+}.",
                rng.gen_range(100..260),
                -rng.gen_range(110..300)
            ));
        }
        sections.push("\n### Risk & Confidence".to_string());
        sections.push(format!("- **Risk Score:** {}", rng.gen_range(3..8)));
    }
    sections.push("\n### Analyst Takeaway".to_string());
    sections.push("- Grounded template output; no injuries or stats were invented.".to_string());

    let markdown = if compact {
        let joined = sections.join(" ");
        joined.chars().take(1000).collect::<String>()
    } else {
        sections.join("\n")
    };

    json!({
        "ok": true,
        "mode": mode,
        "markdown": markdown,
        "summary": {"metadata": {"generated_at": now_iso(), "model": "template"}},
        "raw": {
            "games_today": [],
            "player_trends": [],
            "team_trends": [],
            "player_props": [],
            "odds": {"games": []},
            "meta": {
                "contract_version": "2.7",
                "request_id": format!("{:08x}", rng.r#gen::<u32>()),
                "latency_ms": latency_ms as f64,
                "cache_used": cache_ttl > 0 && rng.gen_bool(0.5),
                "cache_ttl_s": cache_ttl,
                "mode": mode,
                "trends_enabled_in_narrative": trends_enabled,
                "trends_override": trends_override,
                "source_counts": {
                    "games_today": pairs.len(),
                    "player_trends": player_trends,
                    "team_trends": 0,
                    "player_props": 0,
                    "odds_games": pairs.len(),
                },
                "soft_errors": Value::Object(soft_errors),
            },
        },
    })
}

fn games_today(rng: &mut impl Rng) -> Value {
    let statuses = [("NS", "Not Started"), ("Q2", "Quarter 2"), ("HT", "Halftime"), ("FT", "Game Finished")];
    let games = shuffled_pairs(rng, 5)
        .into_iter()
        .enumerate()
        .map(|(i, (away, home))| {
            let (short, long) = statuses[rng.gen_range(0..statuses.len())];
            json!({
                "id": 1000 + i,
                "date": format!("{}T{:02}:30:00-05:00", Utc::now().format("%Y-%m-%d"), 19 + (i % 3)),
                "venue": format!("{home} Arena"),
                "home_team": {"id": i * 2, "name": home},
                "away_team": {"id": i * 2 + 1, "name": away},
                "status": {"short": short, "long": long, "timer": null},
            })
        })
        .collect::<Vec<_>>();
    json!({
        "ok": true,
        "count": games.len(),
        "generated_at": now_iso(),
        "games": games,
    })
}

fn offense(rng: &mut impl Rng) -> Value {
    let teams = TEAMS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let rank = i as u32 + 1;
            json!({
                "team_name": name,
                "rank_overall": rank,
                "rank_pg": (rank + 1).min(30),
                "rank_sg": (rank + 2).min(30),
                "rank_sf": (rank + 3).min(30),
                "rank_pf": (rank + 4).min(30),
                "rank_c": (rank + 5).min(30),
                "points_per_game": jitter(121.0 - i as f64 * 1.2, 0.8, rng),
                "assists_per_game": jitter(27.0 - i as f64 * 0.4, 0.5, rng),
                "rebounds_per_game": jitter(44.0 + i as f64 * 0.2, 0.5, rng),
            })
        })
        .collect::<Vec<_>>();
    json!({"date_generated": now_iso(), "teams": teams, "source": "demo"})
}

fn defense(rng: &mut impl Rng) -> Value {
    let teams = TEAMS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let rank = i as u32 + 1;
            json!({
                "team_name": name,
                "rank_overall": rank,
                "defensive_rating": jitter(108.0 + i as f64 * 0.7, 0.6, rng),
                "opp_points_per_game": jitter(106.0 + i as f64 * 0.9, 0.8, rng),
                "opp_rebounds_per_game": jitter(41.0 + i as f64 * 0.3, 0.4, rng),
                "opp_assists_per_game": jitter(23.0 + i as f64 * 0.3, 0.4, rng),
            })
        })
        .collect::<Vec<_>>();
    json!({"date_generated": now_iso(), "teams": teams, "source": "demo"})
}

fn players(rng: &mut impl Rng) -> Value {
    let players = PLAYERS
        .iter()
        .map(|name| {
            let ppg = jitter(27.0, 5.0, rng);
            let trend = if ppg >= 29.0 {
                "up"
            } else if ppg <= 24.0 {
                "down"
            } else {
                "neutral"
            };
            json!({
                "player_name": name,
                "last_n_games": 5,
                "ppg": ppg,
                "rpg": jitter(7.0, 3.0, rng),
                "apg": jitter(6.0, 3.0, rng),
                "tpm": jitter(2.5, 1.5, rng),
                "season_ppg": jitter(26.0, 1.0, rng),
                "season_rpg": jitter(7.0, 1.0, rng),
                "season_apg": jitter(6.0, 1.0, rng),
                "trend": trend,
                "generated_at": now_iso(),
            })
        })
        .collect::<Vec<_>>();
    json!({
        "ok": true,
        "date_generated": now_iso(),
        "players": players,
        "source": "demo",
    })
}

fn direction(rng: &mut impl Rng) -> &'static str {
    ["up", "down", "neutral"][rng.gen_range(0..3)]
}

fn trends(rng: &mut impl Rng) -> Value {
    let stats = ["points", "rebounds", "assists", "threes"];
    let player_trends = PLAYERS
        .iter()
        .take(6)
        .map(|name| {
            let stat = stats[rng.gen_range(0..stats.len())];
            json!({
                "player_name": name,
                "stat_type": stat,
                "last_n_games": 5,
                "average": jitter(18.0, 8.0, rng),
                "trend_direction": direction(rng),
            })
        })
        .collect::<Vec<_>>();
    let team_trends = TEAMS
        .iter()
        .take(5)
        .map(|name| {
            let split = ["home", "away", "overall"][rng.gen_range(0..3)];
            json!({
                "team_name": name,
                "stat_type": "points",
                "home_away_split": split,
                "last_n_games": 10,
                "average": jitter(114.0, 6.0, rng),
                "trend_direction": direction(rng),
            })
        })
        .collect::<Vec<_>>();
    json!({
        "date_generated": now_iso(),
        "player_trends": player_trends,
        "team_trends": team_trends,
        "meta": {"provider": "demo"},
    })
}

fn odds(rng: &mut impl Rng) -> Value {
    let books = ["draftkings", "fanduel", "betmgm"];
    let games = shuffled_pairs(rng, 5)
        .into_iter()
        .map(|(away, home)| {
            let home_price = jitter(1.75, 0.5, rng).max(1.05);
            let away_price = jitter(2.2, 0.5, rng).max(1.05);
            let book = books[rng.gen_range(0..books.len())];
            json!({
                "sport_key": "basketball_nba",
                "commence_time": now_iso(),
                "home_team": home,
                "away_team": away,
                "moneyline": {
                    "home": {"team": home, "price": home_price, "american": to_american(home_price), "bookmaker": book},
                    "away": {"team": away, "price": away_price, "american": to_american(away_price), "bookmaker": book},
                },
            })
        })
        .collect::<Vec<_>>();
    json!({"date": Utc::now().format("%Y-%m-%d").to_string(), "games": games})
}

fn to_american(decimal: f64) -> i64 {
    if decimal >= 2.0 {
        ((decimal - 1.0) * 100.0).round() as i64
    } else {
        (-100.0 / (decimal - 1.0)).round() as i64
    }
}
