use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// An owned repeating timer. Stopping or dropping it joins the thread, so once
/// `stop` returns the callback will not run again.
pub struct ScheduledTask {
    name: &'static str,
    period: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Calls `tick` every `period` until stopped or until `tick` returns false.
    /// `live` counts running timers for the owner.
    pub fn every<F>(name: &'static str, period: Duration, live: Arc<AtomicUsize>, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        live.fetch_add(1, Ordering::SeqCst);
        let counter = Arc::clone(&live);
        let spawned = thread::Builder::new()
            .name(format!("timer-{name}"))
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !tick() {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                counter.fetch_sub(1, Ordering::SeqCst);
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                live.fetch_sub(1, Ordering::SeqCst);
                tracing::error!(event = "timer.spawn_failed", timer = name, error = %err);
                None
            }
        };

        Self {
            name,
            period,
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(event = "timer.panicked", timer = self.name);
            }
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn stop_joins_and_decrements() {
        let live = Arc::new(AtomicUsize::new(0));
        let task = ScheduledTask::every("t", Duration::from_secs(60), Arc::clone(&live), || true);
        assert_eq!(live.load(Ordering::SeqCst), 1);
        let started = Instant::now();
        task.stop();
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn ticks_until_callback_declines() {
        let live = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let mut n = 0;
        let _task = ScheduledTask::every("t", Duration::from_millis(5), Arc::clone(&live), move || {
            n += 1;
            tx.send(n).is_ok() && n < 3
        });
        let got: Vec<i32> = rx.iter().take(3).collect();
        assert_eq!(got, vec![1, 2, 3]);
    }
}
