//! Cancellable once-per-period ticks driving the session countdown.

use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Handle to one running tick stream.
///
/// Every stream gets a fresh generation number so the receiver can tell a
/// late tick from a cancelled stream apart from a live one.
#[derive(Debug, Clone)]
pub struct TickToken {
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl TickToken {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("tick stream {} cancelled", self.generation);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub trait TickScheduler {
    /// Begin delivering ticks every `period` until the returned token is cancelled
    fn start_ticking(&mut self, period: Duration) -> TickToken;
}

type TickCallback = Arc<dyn Fn(u64) -> bool + Send + Sync + 'static>;

/// Runs each tick stream on its own sleeper thread.
///
/// The callback gets the stream's generation and returns `false` once nobody
/// is listening anymore, which also ends the thread.
pub struct ThreadTickScheduler {
    callback: TickCallback,
    next_generation: u64,
}

impl ThreadTickScheduler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            next_generation: 1,
        }
    }
}

impl TickScheduler for ThreadTickScheduler {
    fn start_ticking(&mut self, period: Duration) -> TickToken {
        let token = TickToken::new(self.next_generation);
        self.next_generation += 1;

        let callback = Arc::clone(&self.callback);
        let thread_token = token.clone();
        thread::spawn(move || loop {
            thread::sleep(period);
            if thread_token.is_cancelled() {
                break;
            }
            if !callback(thread_token.generation()) {
                break;
            }
        });

        token
    }
}

/// Scheduler that never fires on its own. Tests read the issued tokens back
/// through a clone and deliver ticks by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualTickScheduler {
    issued: Arc<Mutex<Vec<TickToken>>>,
}

impl ManualTickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every token handed out so far, oldest first
    pub fn issued(&self) -> Vec<TickToken> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn latest(&self) -> Option<TickToken> {
        self.issued().pop()
    }

    /// Number of issued streams nobody has cancelled
    pub fn live_count(&self) -> usize {
        self.issued()
            .iter()
            .filter(|token| !token.is_cancelled())
            .count()
    }
}

impl TickScheduler for ManualTickScheduler {
    fn start_ticking(&mut self, _period: Duration) -> TickToken {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        let token = TickToken::new(issued.len() as u64 + 1);
        issued.push(token.clone());
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = TickToken::new(3);
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.generation(), 3);
    }

    #[test]
    fn manual_scheduler_hands_out_increasing_generations() {
        let mut scheduler = ManualTickScheduler::new();
        let handle = scheduler.clone();

        let a = scheduler.start_ticking(Duration::from_secs(1));
        let b = scheduler.start_ticking(Duration::from_secs(1));
        assert!(b.generation() > a.generation());
        assert_eq!(handle.issued().len(), 2);
        assert_eq!(handle.live_count(), 2);

        a.cancel();
        assert_eq!(handle.live_count(), 1);
        assert_eq!(handle.latest().map(|t| t.generation()), Some(b.generation()));
    }

    #[test]
    fn manual_scheduler_keeps_counting_after_a_panicked_holder() {
        let mut scheduler = ManualTickScheduler::new();
        scheduler.start_ticking(Duration::from_secs(1));

        let holder = scheduler.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = holder.issued.lock().unwrap();
            panic!("holder gave up");
        })
        .join();
        assert!(crashed.is_err());
        assert!(scheduler.issued.is_poisoned());

        let next = scheduler.start_ticking(Duration::from_secs(1));
        assert_eq!(next.generation(), 2);
        assert_eq!(scheduler.issued().len(), 2);
    }

    #[test]
    fn thread_scheduler_delivers_until_cancelled() {
        let (tx, rx) = mpsc::channel();
        let mut scheduler = ThreadTickScheduler::new(move |generation| tx.send(generation).is_ok());

        let token = scheduler.start_ticking(Duration::from_millis(5));
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, token.generation());

        token.cancel();
        // drain whatever was in flight, then the stream goes quiet
        std::thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
