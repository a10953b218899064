//! Manual-reset events over a shared mutex and condition variable

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Outcome of waiting on a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The event was set on entry or became set before the timeout.
    Signaled,
    /// The timeout elapsed with the event unset.
    TimedOut,
}

/// Outcome of waiting on several events at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitAny {
    /// Index of the first signaled event; lowest index wins on ties.
    Event(usize),
    /// The timeout elapsed with every event unset.
    TimedOut,
}

struct SetState {
    flags: Mutex<Vec<bool>>,
    cond: Condvar,
}

/// A family of manual-reset events sharing one condition variable.
///
/// All events waited on together must come from the same set; mixing sets
/// is a programmer error and panics.
pub struct EventSet {
    state: Arc<SetState>,
}

impl EventSet {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SetState {
                flags: Mutex::new(Vec::new()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Register a new event in the unset state.
    pub fn register(&self, name: &'static str) -> Event {
        let mut flags = self.state.flags.lock().expect("event set poisoned");
        flags.push(false);
        Event {
            state: Arc::clone(&self.state),
            slot: flags.len() - 1,
            name,
        }
    }
}

impl Default for EventSet {
    fn default() -> Self {
        Self::new()
    }
}

/// A named manual-reset event.
///
/// Once signaled the event stays set for every current and future waiter
/// until explicitly reset. Signaling an already-set event is a no-op.
#[derive(Clone)]
pub struct Event {
    state: Arc<SetState>,
    slot: usize,
    name: &'static str,
}

impl Event {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Set the event and wake every waiter in the set.
    pub fn signal(&self) {
        let mut flags = self.state.flags.lock().expect("event set poisoned");
        flags[self.slot] = true;
        drop(flags);
        self.state.cond.notify_all();
    }

    /// Return the event to the unset state.
    pub fn reset(&self) {
        let mut flags = self.state.flags.lock().expect("event set poisoned");
        flags[self.slot] = false;
    }

    pub fn is_set(&self) -> bool {
        self.state.flags.lock().expect("event set poisoned")[self.slot]
    }

    /// Wait until the event is set or the timeout elapses.
    ///
    /// A zero timeout polls the current state. `Duration::MAX` waits without
    /// a deadline.
    pub fn wait(&self, timeout: Duration) -> WaitResult {
        let deadline = Instant::now().checked_add(timeout);
        let mut flags = self.state.flags.lock().expect("event set poisoned");
        loop {
            if flags[self.slot] {
                return WaitResult::Signaled;
            }
            match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return WaitResult::TimedOut;
                    }
                    flags = self
                        .state
                        .cond
                        .wait_timeout(flags, remaining)
                        .expect("event set poisoned")
                        .0;
                }
                None => {
                    flags = self.state.cond.wait(flags).expect("event set poisoned");
                }
            }
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("set", &self.is_set())
            .finish()
    }
}

/// Wait until any of the given events is set or the timeout elapses.
///
/// If several events are set concurrently the lowest index wins, so callers
/// get a deterministic tie-break. Panics when the slice is empty or the
/// events belong to different sets.
pub fn wait_any(events: &[&Event], timeout: Duration) -> WaitAny {
    let first = events.first().expect("wait_any requires at least one event");
    assert!(
        events.iter().all(|e| Arc::ptr_eq(&e.state, &first.state)),
        "wait_any events must belong to the same set"
    );

    let deadline = Instant::now().checked_add(timeout);
    let mut flags = first.state.flags.lock().expect("event set poisoned");
    loop {
        if let Some(index) = events.iter().position(|e| flags[e.slot]) {
            return WaitAny::Event(index);
        }
        match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return WaitAny::TimedOut;
                }
                flags = first
                    .state
                    .cond
                    .wait_timeout(flags, remaining)
                    .expect("event set poisoned")
                    .0;
            }
            None => {
                flags = first.state.cond.wait(flags).expect("event set poisoned");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_event_starts_unset() {
        let set = EventSet::new();
        let event = set.register("unset");
        assert!(!event.is_set());
        assert_eq!(event.wait(Duration::ZERO), WaitResult::TimedOut);
    }

    #[test]
    fn test_signal_is_sticky() {
        let set = EventSet::new();
        let event = set.register("sticky");
        event.signal();
        assert_eq!(event.wait(Duration::ZERO), WaitResult::Signaled);
        // latecomers still observe the set state
        assert_eq!(event.wait(Duration::ZERO), WaitResult::Signaled);
    }

    #[test]
    fn test_signal_twice_is_noop() {
        let set = EventSet::new();
        let event = set.register("twice");
        event.signal();
        event.signal();
        assert!(event.is_set());
    }

    #[test]
    fn test_reset_clears_state() {
        let set = EventSet::new();
        let event = set.register("reset");
        event.signal();
        event.reset();
        assert_eq!(event.wait(Duration::ZERO), WaitResult::TimedOut);
    }

    #[test]
    fn test_wait_times_out() {
        let set = EventSet::new();
        let event = set.register("timeout");
        assert_eq!(event.wait(Duration::from_millis(20)), WaitResult::TimedOut);
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let set = EventSet::new();
        let event = set.register("wake");
        let waiter = {
            let event = event.clone();
            thread::spawn(move || event.wait(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(50));
        event.signal();
        assert_eq!(waiter.join().unwrap(), WaitResult::Signaled);
    }

    #[test]
    fn test_signal_wakes_all_waiters() {
        let set = EventSet::new();
        let event = set.register("broadcast");
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let event = event.clone();
                thread::spawn(move || event.wait(Duration::from_secs(5)))
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        event.signal();
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), WaitResult::Signaled);
        }
    }

    #[test]
    fn test_wait_any_lowest_index_wins() {
        let set = EventSet::new();
        let a = set.register("a");
        let b = set.register("b");
        a.signal();
        b.signal();
        assert_eq!(wait_any(&[&a, &b], Duration::ZERO), WaitAny::Event(0));
        assert_eq!(wait_any(&[&b, &a], Duration::ZERO), WaitAny::Event(0));
    }

    #[test]
    fn test_wait_any_reports_signaled_index() {
        let set = EventSet::new();
        let a = set.register("a");
        let b = set.register("b");
        b.signal();
        assert_eq!(wait_any(&[&a, &b], Duration::ZERO), WaitAny::Event(1));
    }

    #[test]
    fn test_wait_any_times_out() {
        let set = EventSet::new();
        let a = set.register("a");
        let b = set.register("b");
        assert_eq!(
            wait_any(&[&a, &b], Duration::from_millis(20)),
            WaitAny::TimedOut
        );
    }

    #[test]
    fn test_wait_any_wakes_on_later_signal() {
        let set = EventSet::new();
        let a = set.register("a");
        let b = set.register("b");
        let waiter = {
            let a = a.clone();
            let b = b.clone();
            thread::spawn(move || wait_any(&[&a, &b], Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(50));
        b.signal();
        assert_eq!(waiter.join().unwrap(), WaitAny::Event(1));
    }

    #[test]
    #[should_panic(expected = "same set")]
    fn test_wait_any_rejects_mixed_sets() {
        let left = EventSet::new();
        let right = EventSet::new();
        let a = left.register("a");
        let b = right.register("b");
        wait_any(&[&a, &b], Duration::ZERO);
    }
}
