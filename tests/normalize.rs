use hoops_terminal::models::game_rows;
use hoops_terminal::normalize::{Side, game_status, matchup, team_name};
use serde_json::json;

#[test]
fn nested_team_object_wins() {
    let game = json!({
        "home_team": {"name": "Boston Celtics"},
        "teams": {"home": {"name": "Celtics"}},
        "home": "BOS"
    });
    assert_eq!(team_name(&game, Side::Home), "Boston Celtics");
}

#[test]
fn teams_map_is_second() {
    let game = json!({
        "home_team": {"id": 2},
        "teams": {"home": {"name": "Celtics"}, "away": {"name": "Knicks"}},
        "home": "BOS"
    });
    assert_eq!(team_name(&game, Side::Home), "Celtics");
    assert_eq!(team_name(&game, Side::Away), "Knicks");
}

#[test]
fn plain_strings_follow() {
    let game = json!({"away_team": "Lakers", "home": "Warriors"});
    assert_eq!(matchup(&game), ("Lakers".to_string(), "Warriors".to_string()));
}

#[test]
fn blank_names_fall_through_to_defaults() {
    let game = json!({"home_team": {"name": "  "}, "away": ""});
    assert_eq!(team_name(&game, Side::Home), "Home");
    assert_eq!(team_name(&game, Side::Away), "Away");
}

#[test]
fn status_priority() {
    assert_eq!(
        game_status(&json!({"status": {"short": "Q3", "long": "Third Quarter"}})),
        "Q3"
    );
    assert_eq!(game_status(&json!({"status": {"long": "Final"}})), "Final");
    assert_eq!(game_status(&json!({"status": "Halftime"})), "Halftime");
    assert_eq!(game_status(&json!({"status": {"short": ""}})), "Scheduled");
    assert_eq!(game_status(&json!({})), "Scheduled");
}

#[test]
fn game_rows_mix_shapes() {
    let payload = json!({
        "ok": true,
        "games": [
            {"home_team": {"name": "Heat"}, "away_team": {"name": "Bulls"}, "status": {"short": "FT"}, "date": "2026-01-05T19:30:00+00:00"},
            {"teams": {"home": {"name": "Suns"}, "away": {"name": "Jazz"}}, "venue": "Footprint Center"},
            {}
        ]
    });
    let rows = game_rows(&payload).expect("games list");
    assert_eq!(rows.len(), 3);
    assert_eq!((rows[0].away.as_str(), rows[0].home.as_str()), ("Bulls", "Heat"));
    assert_eq!(rows[0].status, "FT");
    assert_eq!(rows[0].date, "2026-01-05 19:30");
    assert_eq!(rows[1].venue, "Footprint Center");
    assert_eq!(rows[1].status, "Scheduled");
    assert_eq!((rows[2].away.as_str(), rows[2].home.as_str()), ("Away", "Home"));
}
