use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

static LAST_PANIC: Mutex<Option<String>> = Mutex::new(None);

/// A render-time panic caught around a page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryFault {
    pub message: String,
    /// Location and backtrace, when the panic hook captured them.
    pub detail: Option<String>,
}

impl BoundaryFault {
    pub fn report(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}\n\n{}", self.message, detail),
            None => self.message.clone(),
        }
    }
}

/// Routes panic output to tracing and keeps the location/backtrace for the
/// boundary screen. The default hook would print over the alternate screen.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = payload_message(info.payload());
        let backtrace = Backtrace::force_capture();
        tracing::error!(event = "ui.panic", %location, message = %message);
        if let Ok(mut slot) = LAST_PANIC.lock() {
            *slot = Some(format!("at {location}\n{backtrace}"));
        }
    }));
}

/// Runs `render`, turning a panic into a [`BoundaryFault`].
pub fn guard<F>(render: F) -> Result<(), BoundaryFault>
where
    F: FnOnce(),
{
    match panic::catch_unwind(AssertUnwindSafe(render)) {
        Ok(()) => Ok(()),
        Err(payload) => {
            let detail = LAST_PANIC.lock().ok().and_then(|mut slot| slot.take());
            Err(BoundaryFault {
                message: payload_message(payload.as_ref()),
                detail,
            })
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "render panicked".to_string()
}
