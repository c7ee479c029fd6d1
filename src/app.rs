use std::collections::VecDeque;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};

use crate::boundary::BoundaryFault;
use crate::config::Config;
use crate::controller::PanelController;
use crate::diagnostics::{self, DiagnosticSnapshot};
use crate::fetch::Fetch;
use crate::panel::Page;
use crate::prefs::{Preferences, PrefsStore};
use crate::query::{self, NarrativeMode};

const MAX_LOGS: usize = 200;

pub struct App {
    pub config: Config,
    pub prefs: Preferences,
    prefs_store: PrefsStore,
    fetcher: Arc<dyn Fetch>,
    pub mode: NarrativeMode,
    pub panel: PanelController,
    pub polling_enabled: bool,
    pub scroll: u16,
    pub help_overlay: bool,
    pub show_diagnostics: bool,
    pub fault: Option<BoundaryFault>,
    pub logs: VecDeque<String>,
    pub should_quit: bool,
}

impl App {
    /// Loads preferences and mounts the narrative page.
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>, prefs_store: PrefsStore) -> Self {
        let prefs = prefs_store.load();
        let mode = config.narrative_mode;
        let panel = PanelController::new(Page::Narrative, Arc::clone(&fetcher));
        let mut app = Self {
            config,
            prefs,
            prefs_store,
            fetcher,
            mode,
            panel,
            polling_enabled: true,
            scroll: 0,
            help_overlay: false,
            show_diagnostics: false,
            fault: None,
            logs: VecDeque::new(),
            should_quit: false,
        };
        app.start_panel(false);
        app
    }

    pub fn page(&self) -> Page {
        self.panel.page()
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Applies pending panel events and moves its notices to the console.
    pub fn pump(&mut self) -> usize {
        let handled = self.panel.pump();
        self.drain_notices();
        handled
    }

    pub fn drain_notices(&mut self) {
        for notice in self.panel.take_notices() {
            self.push_log(notice);
        }
    }

    pub fn poll_interval_for(&self, page: Page) -> Option<std::time::Duration> {
        match page {
            Page::Narrative => self.config.narrative_poll,
            _ => self.config.stats_poll,
        }
    }

    /// Drops the current panel (aborting its request and timers) and mounts
    /// a fresh one for `page`.
    pub fn switch_page(&mut self, page: Page) {
        if page == self.page() && self.fault.is_none() {
            return;
        }
        self.panel = PanelController::new(page, Arc::clone(&self.fetcher));
        self.scroll = 0;
        self.fault = None;
        self.start_panel(false);
    }

    /// Remounts the current page from scratch.
    pub fn reload(&mut self) {
        let page = self.page();
        self.panel = PanelController::new(page, Arc::clone(&self.fetcher));
        self.fault = None;
        self.scroll = 0;
        self.push_log(format!("[INFO] {} reloaded", page.label()));
        self.start_panel(false);
    }

    fn start_panel(&mut self, bust_cache: bool) {
        let page = self.page();
        self.panel
            .start_stale_checks(self.config.stale_check, self.config.stale_after);
        if self.polling_enabled {
            if let Some(interval) = self.poll_interval_for(page) {
                self.panel.start_polling(interval);
            }
        }
        self.refresh(bust_cache);
    }

    pub fn refresh(&mut self, bust_cache: bool) -> u64 {
        let options = query::refresh_options(self.page(), self.mode, &self.prefs, bust_cache);
        self.panel.refresh(options)
    }

    fn prefs_changed(&mut self) {
        if let Err(err) = self.prefs_store.save(&self.prefs) {
            tracing::warn!(event = "prefs.save_failed", error = %err);
            self.push_log(format!("[WARN] Saving preferences failed: {err:#}"));
        }
        if self.page() == Page::Narrative {
            self.refresh(false);
        }
    }

    pub fn toggle_polling(&mut self) {
        if self.panel.is_polling() {
            self.panel.stop_polling();
            self.polling_enabled = false;
            self.push_log("[INFO] Polling paused");
            return;
        }
        self.polling_enabled = true;
        match self.poll_interval_for(self.page()) {
            Some(interval) => {
                self.panel.start_polling(interval);
                self.push_log(format!("[INFO] Polling every {}s", interval.as_secs()));
            }
            None => self.push_log("[INFO] Polling not configured for this page"),
        }
    }

    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot::capture(&self.panel, self.fault.as_ref())
    }

    pub fn copy_diagnostics(&mut self) {
        let text = self.diagnostics().to_text();
        match diagnostics::copy_to_clipboard(&text) {
            Ok(()) => self.push_log("[INFO] Diagnostics copied to clipboard"),
            Err(err) => {
                tracing::warn!(event = "clipboard.failed", error = format!("{err:#}"));
                self.push_log(format!("[WARN] Clipboard unavailable: {err:#}"));
            }
        }
    }

    pub fn record_fault(&mut self, fault: BoundaryFault) {
        if self.fault.as_ref() == Some(&fault) {
            return;
        }
        self.push_log(format!(
            "[WARN] {} failed to render: {}",
            self.page().label(),
            fault.message
        ));
        self.fault = Some(fault);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if self.fault.is_some() {
            self.on_fault_key(key);
            return;
        }
        if self.help_overlay && !matches!(key.code, KeyCode::Char('?') | KeyCode::Char('q')) {
            self.help_overlay = false;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(c @ '1'..='9') => {
                if let Some(page) = Page::from_digit(c) {
                    self.switch_page(page);
                }
            }
            KeyCode::Tab => {
                let idx = Page::ALL.iter().position(|p| *p == self.page()).unwrap_or(0);
                self.switch_page(Page::ALL[(idx + 1) % Page::ALL.len()]);
            }
            KeyCode::Char('r') => {
                self.refresh(false);
            }
            KeyCode::Char('R') => {
                self.refresh(true);
                self.push_log("[INFO] Forced refresh (cache bypass)");
            }
            KeyCode::Char('t') => {
                self.prefs.trends = self.prefs.trends.cycle();
                self.push_log(format!("[INFO] Trends: {}", self.prefs.trends.label()));
                self.prefs_changed();
            }
            KeyCode::Char('c') => {
                self.prefs.compact = !self.prefs.compact;
                self.prefs_changed();
            }
            KeyCode::Char('T') => {
                self.prefs.cycle_cache_ttl();
                self.push_log(format!("[INFO] Cache TTL: {}s", self.prefs.cache_ttl));
                self.prefs_changed();
            }
            KeyCode::Char('m') => {
                self.mode = self.mode.toggle();
                self.push_log(format!("[INFO] Mode: {}", self.mode.as_str()));
                if self.page() == Page::Narrative {
                    self.refresh(false);
                }
            }
            KeyCode::Char('p') => self.toggle_polling(),
            KeyCode::Char('d') => self.show_diagnostics = !self.show_diagnostics,
            KeyCode::Char('y') => self.copy_diagnostics(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::Home => self.scroll = 0,
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            _ => {}
        }
    }

    fn on_fault_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                self.fault = None;
                self.scroll = 0;
                self.push_log("[INFO] Retrying render");
            }
            KeyCode::Char('l') => self.reload(),
            KeyCode::Char('y') => self.copy_diagnostics(),
            KeyCode::Char(c @ '1'..='9') => {
                if let Some(page) = Page::from_digit(c) {
                    self.switch_page(page);
                }
            }
            _ => {}
        }
    }
}
