use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::contract;
use crate::error::FetchError;
use crate::fetch::{CancelToken, Fetch, PanelRequest};
use crate::panel::{Page, PanelState, PanelStatus, is_stale};
use crate::schedule::ScheduledTask;

const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    pub query: Vec<(String, String)>,
    /// Applied to this request only, replacing same-named `query` entries.
    /// Polls and retries replay `query` without them.
    pub once: Vec<(String, String)>,
}

impl RefreshOptions {
    pub fn with_once(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.once.push((key.into(), value.into()));
        self
    }

    /// The query actually sent: `query` with `once` entries merged over it.
    pub fn request_query(&self) -> Vec<(String, String)> {
        let mut query = self.query.clone();
        for (key, value) in &self.once {
            match query.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.clone(),
                None => query.push((key.clone(), value.clone())),
            }
        }
        query
    }

    fn replayable(self) -> Self {
        Self {
            query: self.query,
            once: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum PanelEvent {
    Resolved {
        token: u64,
        result: Result<Value, FetchError>,
    },
    PollTick,
    StaleTick,
}

struct InFlight {
    token: u64,
    cancel: CancelToken,
}

/// Owns one page's fetch lifecycle: request tokens, the in-flight request,
/// the poll and staleness timers, and the panel state they feed.
///
/// All state changes happen on the thread that calls [`pump`](Self::pump);
/// workers and timers only post events into the panel's channel.
pub struct PanelController {
    page: Page,
    fetcher: Arc<dyn Fetch>,
    state: PanelState,
    latest_token: u64,
    inflight: Option<InFlight>,
    last_options: RefreshOptions,
    last_request: Option<PanelRequest>,
    tx: Sender<PanelEvent>,
    rx: Receiver<PanelEvent>,
    poll: Option<ScheduledTask>,
    stale_check: Option<ScheduledTask>,
    stale_after: Duration,
    live_timers: Arc<AtomicUsize>,
    notices: Vec<String>,
}

impl PanelController {
    pub fn new(page: Page, fetcher: Arc<dyn Fetch>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            page,
            fetcher,
            state: PanelState::new(),
            latest_token: 0,
            inflight: None,
            last_options: RefreshOptions::default(),
            last_request: None,
            tx,
            rx,
            poll: None,
            stale_check: None,
            stale_after: DEFAULT_STALE_AFTER,
            live_timers: Arc::new(AtomicUsize::new(0)),
            notices: Vec::new(),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn latest_token(&self) -> u64 {
        self.latest_token
    }

    pub fn in_flight(&self) -> bool {
        self.inflight.is_some()
    }

    pub fn last_request(&self) -> Option<&PanelRequest> {
        self.last_request.as_ref()
    }

    pub fn last_options(&self) -> &RefreshOptions {
        &self.last_options
    }

    /// Cancels whatever is in flight and starts a new request. Returns its
    /// token without waiting; the result is applied by a later `pump`.
    pub fn refresh(&mut self, options: RefreshOptions) -> u64 {
        if let Some(prev) = self.inflight.take() {
            prev.cancel.cancel();
            tracing::debug!(
                event = "panel.superseded",
                page = self.page.label(),
                token = prev.token
            );
        }

        self.latest_token += 1;
        let token = self.latest_token;
        let cancel = CancelToken::new();
        let request = PanelRequest {
            path: self.page.path(),
            query: options.request_query(),
            timeout: self.page.timeout(),
        };

        tracing::info!(
            event = "panel.refresh",
            page = self.page.label(),
            token,
            request = %request.describe()
        );

        self.last_options = options.replayable();
        self.last_request = Some(request.clone());
        self.inflight = Some(InFlight {
            token,
            cancel: cancel.clone(),
        });
        self.state.begin_loading();

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let contract = self.page.contract();
        let spawned = thread::Builder::new()
            .name(format!("fetch-{}", self.page.label().to_lowercase()))
            .spawn(move || {
                let result = fetcher
                    .fetch(&request, &cancel)
                    .and_then(|payload| contract::validate(contract, &payload).map(|_| payload));
                let _ = tx.send(PanelEvent::Resolved { token, result });
            });
        if let Err(err) = spawned {
            let _ = self.tx.send(PanelEvent::Resolved {
                token,
                result: Err(FetchError::transport(format!("worker spawn failed: {err}"))),
            });
        }
        token
    }

    /// Refreshes with the options of the previous call, minus its one-shot
    /// overrides.
    pub fn retry(&mut self) -> u64 {
        let options = self.last_options.clone();
        self.refresh(options)
    }

    /// Replaces any existing poll timer; never more than one per panel.
    pub fn start_polling(&mut self, interval: Duration) {
        self.stop_polling();
        let tx = self.tx.clone();
        self.poll = Some(ScheduledTask::every(
            "poll",
            interval,
            Arc::clone(&self.live_timers),
            move || tx.send(PanelEvent::PollTick).is_ok(),
        ));
        tracing::debug!(
            event = "panel.poll_started",
            page = self.page.label(),
            interval_ms = interval.as_millis() as u64
        );
    }

    pub fn stop_polling(&mut self) {
        if let Some(task) = self.poll.take() {
            task.stop();
            tracing::debug!(event = "panel.poll_stopped", page = self.page.label());
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll.as_ref().map(ScheduledTask::period)
    }

    /// Starts the independent staleness timer, replacing any previous one.
    pub fn start_stale_checks(&mut self, every: Duration, threshold: Duration) {
        self.stop_stale_checks();
        self.stale_after = threshold;
        let tx = self.tx.clone();
        self.stale_check = Some(ScheduledTask::every(
            "stale",
            every,
            Arc::clone(&self.live_timers),
            move || tx.send(PanelEvent::StaleTick).is_ok(),
        ));
    }

    pub fn stop_stale_checks(&mut self) {
        if let Some(task) = self.stale_check.take() {
            task.stop();
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    pub fn set_stale_after(&mut self, threshold: Duration) {
        self.stale_after = threshold;
    }

    /// Number of timer threads currently alive for this panel.
    pub fn active_timers(&self) -> usize {
        self.live_timers.load(Ordering::SeqCst)
    }

    /// Shared handle on the timer count, still readable after the panel drops.
    pub fn timer_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live_timers)
    }

    pub fn check_stale(&mut self) -> bool {
        self.check_stale_at(Instant::now())
    }

    /// Recomputes only the derived flag; data is never touched.
    pub fn check_stale_at(&mut self, now: Instant) -> bool {
        let stale = is_stale(self.state.last_updated, now, self.stale_after);
        if stale && !self.state.stale {
            self.notices.push(format!(
                "[INFO] {} data is stale (>{}s old)",
                self.page.label(),
                self.stale_after.as_secs()
            ));
        }
        self.state.stale = stale;
        stale
    }

    /// Applies every queued event. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Blocks up to `timeout` for one event and applies it.
    pub fn wait_event(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle(event);
                true
            }
            Err(_) => false,
        }
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn handle(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Resolved { token, result } => self.resolve(token, result),
            PanelEvent::PollTick => {
                self.retry();
            }
            PanelEvent::StaleTick => {
                self.check_stale();
            }
        }
    }

    fn resolve(&mut self, token: u64, result: Result<Value, FetchError>) {
        if token != self.latest_token {
            tracing::debug!(
                event = "panel.discarded",
                page = self.page.label(),
                token,
                latest = self.latest_token
            );
            return;
        }
        self.inflight = None;

        match result {
            Ok(payload) => {
                self.state.apply_success(payload, Instant::now());
                tracing::info!(event = "panel.ready", page = self.page.label(), token);
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!(event = "panel.cancelled", page = self.page.label(), token);
                self.state.status = if self.state.data.is_some() {
                    PanelStatus::Ready
                } else {
                    PanelStatus::Idle
                };
            }
            Err(err) => {
                tracing::warn!(
                    event = "panel.failed",
                    page = self.page.label(),
                    token,
                    kind = err.kind(),
                    error = %err
                );
                self.notices
                    .push(format!("[WARN] {}: {err}", self.page.label()));
                self.state.apply_failure(err.to_string());
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(inflight) = self.inflight.take() {
            inflight.cancel.cancel();
        }
        self.stop_polling();
        self.stop_stale_checks();
    }
}

impl Drop for PanelController {
    fn drop(&mut self) {
        self.teardown();
        tracing::debug!(event = "panel.unmounted", page = self.page.label());
    }
}
