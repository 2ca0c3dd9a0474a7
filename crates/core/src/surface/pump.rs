//! Cancellable background event pump.
//!
//! The background discipline runs a dedicated worker that services
//! platform events on a fixed cadence. The worker carries a stop token
//! and is joined during cleanup, so shutdown is an explicit handshake
//! rather than a thread abandoned at process exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;

/// Cadence the worker polls at between ticks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A worker thread that invokes a tick closure until stopped.
///
/// The closure must only touch platform event-queue state -- never the
/// GL driver, whose calls belong to the thread that owns the context.
pub struct BackgroundPump {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundPump {
    /// Spawns the worker. Each iteration runs `tick`, then sleeps for
    /// `interval`, until [`stop`](Self::stop) is called.
    pub fn spawn<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("event-pump".into())
            .spawn(move || {
                debug!("background event pump started");
                while !stop_flag.load(Ordering::Acquire) {
                    tick();
                    thread::sleep(interval);
                }
                debug!("background event pump stopped");
            })
            .ok();
        Self { stop, worker }
    }

    /// Signals the worker and joins it. Idempotent; later calls return
    /// immediately.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            // A panicked tick already unwound the worker; there is
            // nothing further to do with the result.
            let _ = worker.join();
        }
    }

    /// Whether the worker has been stopped and joined.
    pub fn is_stopped(&self) -> bool {
        self.worker.is_none()
    }
}

impl Drop for BackgroundPump {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn pump_ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut pump = BackgroundPump::spawn(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        while count.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        pump.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 3);
        // Joined: no further ticks can land.
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut pump = BackgroundPump::spawn(Duration::from_millis(1), || {});
        pump.stop();
        assert!(pump.is_stopped());
        pump.stop();
        assert!(pump.is_stopped());
    }

    #[test]
    fn drop_joins_the_worker() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        {
            let _pump = BackgroundPump::spawn(Duration::from_millis(1), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            thread::sleep(Duration::from_millis(5));
        }
        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn default_interval_is_ten_milliseconds() {
        assert_eq!(POLL_INTERVAL, Duration::from_millis(10));
    }
}
