mod common;

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hoops_terminal::app::App;
use hoops_terminal::boundary::{self, BoundaryFault};
use hoops_terminal::config::Config;
use hoops_terminal::diagnostics::DiagnosticSnapshot;
use hoops_terminal::error::FetchError;
use hoops_terminal::fetch::Fetch;
use hoops_terminal::panel::Page;
use hoops_terminal::prefs::PrefsStore;
use hoops_terminal::ui;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use serde_json::{Value, json};

use common::{StaticFetcher, WAIT, gated, narrative, next_call};

fn app_with(fetcher: Arc<dyn Fetch>) -> App {
    App::new(Config::default(), fetcher, PrefsStore::in_memory())
}

fn render(app: &App) -> (String, Option<BoundaryFault>) {
    let backend = TestBackend::new(120, 40);
    let mut terminal = Terminal::new(backend).expect("test terminal");
    let mut fault = None;
    terminal
        .draw(|f| fault = ui::draw(f, app))
        .expect("draw frame");
    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    let text = buffer
        .content
        .chunks(width)
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    (text, fault)
}

fn narrative_with_meta() -> Value {
    json!({
        "ok": true,
        "markdown": "# Slate Overview\n- **Games:** 3\n_Generated: now_",
        "raw": {
            "meta": {
                "model": "template",
                "trends_override": "on",
                "cache_ttl": 30,
                "sources": {"odds_games": 3, "player_trends": 12}
            }
        }
    })
}

#[test]
fn narrative_markdown_is_rendered_not_raw() {
    let mut app = app_with(Arc::new(StaticFetcher::new(narrative_with_meta())));
    assert!(app.panel.wait_event(WAIT));

    let (screen, fault) = render(&app);
    assert!(fault.is_none());
    assert!(screen.contains("Slate Overview"));
    assert!(!screen.contains("# Slate Overview"));
    assert!(screen.contains("• Games: 3"));
    assert!(!screen.contains("**"));
}

#[test]
fn diagnostics_meta_is_the_payload_meta() {
    let mut app = app_with(Arc::new(StaticFetcher::new(narrative_with_meta())));
    assert!(app.panel.wait_event(WAIT));

    let snapshot = DiagnosticSnapshot::capture(&app.panel, None);
    assert_eq!(snapshot.meta, Some(narrative_with_meta()["raw"]["meta"].clone()));
    assert!(snapshot.to_text().contains("\"trends_override\": \"on\""));

    app.show_diagnostics = true;
    let (screen, _) = render(&app);
    assert!(screen.contains("trends_override: on"));
    assert!(screen.contains("cache_ttl: 30"));
}

#[test]
fn error_banner_sits_above_last_good_data() {
    let (fetcher, calls) = gated();
    let mut app = app_with(Arc::new(fetcher));
    next_call(&calls).resolve(Ok(narrative("# Still Here")));
    assert!(app.panel.wait_event(WAIT));

    app.refresh(false);
    next_call(&calls).resolve(Err(FetchError::transport("connection refused")));
    assert!(app.panel.wait_event(WAIT));
    app.drain_notices();

    let (screen, _) = render(&app);
    assert!(screen.contains("Network error: connection refused"));
    assert!(screen.contains("Still Here"));
    assert!(app.logs.iter().any(|l| l.starts_with("[WARN] Narrative")));
}

#[test]
fn first_load_failure_shows_retry_hint() {
    let fetcher = StaticFetcher::new(json!({"ok": false, "error": "Upstream API error: 500"}));
    let mut app = app_with(Arc::new(fetcher));
    assert!(app.panel.wait_event(WAIT));

    let (screen, _) = render(&app);
    assert!(screen.contains("Upstream API error: 500"));
    assert!(screen.contains("Press r to retry."));
}

#[test]
fn loading_placeholder_before_first_payload() {
    let (fetcher, calls) = gated();
    let app = app_with(Arc::new(fetcher));
    let pending = next_call(&calls);

    let (screen, _) = render(&app);
    assert!(screen.contains("Loading…"));
    assert!(screen.contains("LOADING"));
    pending.resolve(Ok(narrative("done")));
}

#[test]
fn unrecognized_payload_renders_inline() {
    let fetcher = StaticFetcher::new(json!({"ok": true, "games": {"not": "a list"}}));
    let mut app = app_with(Arc::new(fetcher));
    app.switch_page(Page::Games);
    assert!(app.panel.wait_event(WAIT));

    let (screen, fault) = render(&app);
    assert!(fault.is_none());
    assert!(screen.contains("Payload not recognized"));
}

#[test]
fn guard_turns_panic_into_fault() {
    let fault = boundary::guard(|| panic!("kaboom")).unwrap_err();
    assert_eq!(fault.message, "kaboom");
    assert!(boundary::guard(|| {}).is_ok());
}

#[test]
fn fault_screen_offers_recovery() {
    let mut app = app_with(Arc::new(StaticFetcher::new(narrative("x"))));
    app.record_fault(BoundaryFault {
        message: "index out of bounds".to_string(),
        detail: None,
    });

    let (screen, _) = render(&app);
    assert!(screen.contains("Narrative failed to render"));
    assert!(screen.contains("index out of bounds"));
    assert!(screen.contains("r retry render"));

    app.on_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE));
    assert!(app.fault.is_none());
}
