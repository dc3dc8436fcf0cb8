//! The acquisition engine never reaches for a process-wide timer singleton:
//! every [`crate::Acquisition`] is handed a `TimerService` at construction,
//! so a host can substitute a deterministic one in tests or a shared
//! reactor in production.

use std::time::Duration;

/// A place to schedule a one-shot deferred callback.
pub trait TimerService: Send + Sync {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>);
}

/// The default `TimerService`: one sleeping thread per scheduled callback.
/// Adequate for a node with a modest number of in-flight acquisitions;
/// a host embedding this engine into an existing async reactor should
/// supply its own `TimerService` instead.
#[derive(Default)]
pub struct ThreadTimerService;

impl TimerService for ThreadTimerService {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) {
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            callback();
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn thread_timer_fires_after_delay() {
        let (tx, rx) = mpsc::channel();
        ThreadTimerService.schedule(Duration::from_millis(10), Box::new(move || {
            tx.send(()).unwrap();
        }));
        rx.recv_timeout(Duration::from_secs(1))
            .expect("callback fires");
    }
}
