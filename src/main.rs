use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::prelude::*;

use hoops_terminal::app::App;
use hoops_terminal::boundary;
use hoops_terminal::config::Config;
use hoops_terminal::fake_backend::DemoBackend;
use hoops_terminal::fetch::{Fetch, HttpFetcher};
use hoops_terminal::logging;
use hoops_terminal::prefs::PrefsStore;
use hoops_terminal::terminal::TerminalGuard;
use hoops_terminal::ui;

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let log_path = logging::init();
    boundary::install_panic_hook();

    let config = Config::from_env();
    let fetcher: Arc<dyn Fetch> = if config.demo {
        Arc::new(DemoBackend::default())
    } else {
        Arc::new(HttpFetcher::new(&config.api_base))
    };
    tracing::info!(
        event = "app.start",
        api_base = %config.api_base,
        demo = config.demo,
        mode = config.narrative_mode.as_str()
    );

    let mut guard = TerminalGuard::new(io::stdout());
    guard.enter()?;
    let backend = ratatui::backend::CrosstermBackend::new(io::stdout());
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(config, fetcher, PrefsStore::from_env());
    if app.config.demo {
        app.push_log("[INFO] Demo backend (HOOPS_DEMO)");
    } else {
        let base = app.config.api_base.clone();
        app.push_log(format!("[INFO] Backend {base}"));
    }
    if let Some(path) = log_path {
        app.push_log(format!("[INFO] Logging to {}", path.display()));
    }
    let res = run_app(&mut terminal, &mut app);

    // Panel workers and timers stop before the screen is handed back.
    drop(app);
    drop(guard);

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        app.pump();

        let mut fault = None;
        terminal.draw(|f| fault = ui::draw(f, app))?;
        if let Some(fault) = fault {
            app.record_fault(fault);
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            tracing::info!(event = "app.quit");
            return Ok(());
        }
    }
}
