//! Counting semaphore guarding the dump slot

use std::sync::{Arc, Condvar, Mutex};

struct SemState {
    permits: Mutex<usize>,
    cond: Condvar,
}

/// A counting semaphore with blocking acquire.
///
/// The monitor creates one with a single permit so at most one dump child
/// is in flight at any time.
#[derive(Clone)]
pub struct Semaphore {
    state: Arc<SemState>,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Arc::new(SemState {
                permits: Mutex::new(permits),
                cond: Condvar::new(),
            }),
        }
    }

    /// Block until a permit is available, then take it.
    pub fn acquire(&self) {
        let mut permits = self.state.permits.lock().expect("semaphore poisoned");
        while *permits == 0 {
            permits = self.state.cond.wait(permits).expect("semaphore poisoned");
        }
        *permits -= 1;
    }

    /// Take a permit without blocking; false when none is available.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.state.permits.lock().expect("semaphore poisoned");
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Return a permit and wake one blocked acquirer.
    pub fn release(&self) {
        let mut permits = self.state.permits.lock().expect("semaphore poisoned");
        *permits += 1;
        drop(permits);
        self.state.cond.notify_one();
    }

    pub fn available(&self) -> usize {
        *self.state.permits.lock().expect("semaphore poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_initial_permits() {
        let sem = Semaphore::new(1);
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn test_acquire_release_round_trip() {
        let sem = Semaphore::new(1);
        sem.acquire();
        assert_eq!(sem.available(), 0);
        sem.release();
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn test_try_acquire_fails_when_empty() {
        let sem = Semaphore::new(1);
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        sem.release();
        assert!(sem.try_acquire());
    }

    #[test]
    fn test_release_wakes_blocked_acquirer() {
        let sem = Semaphore::new(0);
        let waiter = {
            let sem = sem.clone();
            thread::spawn(move || sem.acquire())
        };
        thread::sleep(Duration::from_millis(50));
        sem.release();
        waiter.join().unwrap();
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_single_permit_serializes_holders() {
        let sem = Semaphore::new(1);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let sem = sem.clone();
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for _ in 0..20 {
                        sem.acquire();
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        sem.release();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(sem.available(), 1);
    }
}
