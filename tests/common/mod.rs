#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use hoops_terminal::error::FetchError;
use hoops_terminal::fetch::{CancelToken, Fetch, PanelRequest};
use serde_json::Value;

pub const WAIT: Duration = Duration::from_secs(3);

/// A request parked inside [`GatedFetcher`] until the test answers it.
pub struct PendingCall {
    pub request: PanelRequest,
    pub cancel: CancelToken,
    reply: Sender<Result<Value, FetchError>>,
}

impl PendingCall {
    pub fn tag(&self) -> Option<&str> {
        self.request.query_value("tag")
    }

    pub fn resolve(self, result: Result<Value, FetchError>) {
        let _ = self.reply.send(result);
    }
}

/// Hands every request to the test and blocks until it is resolved, so tests
/// control the order in which responses arrive.
pub struct GatedFetcher {
    calls: Mutex<Sender<PendingCall>>,
}

pub fn gated() -> (GatedFetcher, Receiver<PendingCall>) {
    let (tx, rx) = mpsc::channel();
    (
        GatedFetcher {
            calls: Mutex::new(tx),
        },
        rx,
    )
}

impl Fetch for GatedFetcher {
    fn fetch(&self, request: &PanelRequest, cancel: &CancelToken) -> Result<Value, FetchError> {
        let (reply, answer) = mpsc::channel();
        let call = PendingCall {
            request: request.clone(),
            cancel: cancel.clone(),
            reply,
        };
        let sent = self
            .calls
            .lock()
            .map(|tx| tx.send(call).is_ok())
            .unwrap_or(false);
        if !sent {
            return Err(FetchError::Cancelled);
        }
        answer.recv().unwrap_or(Err(FetchError::Cancelled))
    }
}

pub fn next_call(rx: &Receiver<PendingCall>) -> PendingCall {
    rx.recv_timeout(WAIT).expect("fetch should have been issued")
}

/// Returns the same payload for every request and counts calls.
pub struct StaticFetcher {
    payload: Value,
    pub calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for StaticFetcher {
    fn fetch(&self, _request: &PanelRequest, cancel: &CancelToken) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        cancel.check()?;
        Ok(self.payload.clone())
    }
}

pub fn narrative(markdown: &str) -> Value {
    serde_json::json!({ "ok": true, "markdown": markdown })
}

/// In-memory writer for capturing subscriber output.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a plain-text subscriber and returns what it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buf.contents())
}
