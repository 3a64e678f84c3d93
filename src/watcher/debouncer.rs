//! Per-path debouncing for file change events.
//!
//! Coalesces rapid change events into a single update with two bounds: a
//! quiet period `d` that rearms on every event, and a hard deadline `D`
//! after which a continuously-edited file fires anyway. Implemented as a
//! pure state machine over injected timestamps so the logic is
//! deterministic under test; wall-clock timers live in the watch loop.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What the caller should do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceAction {
    /// A timer was (re)scheduled; poll `take_due` at `next_deadline`.
    Scheduled,
    /// Process the path immediately.
    FireNow,
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    first_event: Instant,
    deadline: Instant,
}

/// Debounces change events independently per path.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    max_wait: Duration,
    pending: HashMap<PathBuf, PendingChange>,
    in_flight: HashSet<PathBuf>,
    /// Paths that changed again while their update was running.
    queued: HashSet<PathBuf>,
}

impl Debouncer {
    pub fn new(quiet: Duration, max_wait: Duration) -> Self {
        Self {
            quiet,
            max_wait,
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            queued: HashSet::new(),
        }
    }

    /// Record a change event. With a zero quiet period debouncing is
    /// disabled and every event fires immediately.
    pub fn on_event(&mut self, path: &Path, now: Instant) -> DebounceAction {
        if self.in_flight.contains(path) {
            // At most one in-flight update per path; the event is not
            // lost - completion schedules the next timer.
            self.queued.insert(path.to_path_buf());
            return DebounceAction::Scheduled;
        }
        if self.quiet.is_zero() {
            return DebounceAction::FireNow;
        }

        match self.pending.get_mut(path) {
            Some(pending) => {
                if now.duration_since(pending.first_event) >= self.max_wait {
                    self.pending.remove(path);
                    DebounceAction::FireNow
                } else {
                    pending.deadline = now + self.quiet;
                    DebounceAction::Scheduled
                }
            }
            None => {
                self.pending.insert(
                    path.to_path_buf(),
                    PendingChange {
                        first_event: now,
                        deadline: now + self.quiet,
                    },
                );
                DebounceAction::Scheduled
            }
        }
    }

    /// Paths whose quiet period has elapsed; removed from pending.
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due = Vec::new();
        self.pending.retain(|path, pending| {
            if now >= pending.deadline {
                due.push(path.clone());
                false
            } else {
                true
            }
        });
        due
    }

    /// The earliest scheduled deadline, for the event loop's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Mark a path's update as started.
    pub fn begin(&mut self, path: &Path) {
        self.in_flight.insert(path.to_path_buf());
    }

    /// Mark a path's update as finished. Events that arrived during the
    /// update schedule the next timer; returns true when that happened.
    pub fn finish(&mut self, path: &Path, now: Instant) -> bool {
        self.in_flight.remove(path);
        if self.queued.remove(path) {
            if self.quiet.is_zero() {
                // No timer to arm; the caller fires again right away.
                self.pending.insert(
                    path.to_path_buf(),
                    PendingChange {
                        first_event: now,
                        deadline: now,
                    },
                );
            } else {
                self.pending.insert(
                    path.to_path_buf(),
                    PendingChange {
                        first_event: now,
                        deadline: now + self.quiet,
                    },
                );
            }
            true
        } else {
            false
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn rapid_events_coalesce_into_one_firing() {
        let mut debouncer = Debouncer::new(secs(0.2), secs(5.0));
        let path = Path::new("/repo/a.py");
        let start = Instant::now();

        // 5 modification events, 50ms apart.
        for i in 0..5 {
            let at = start + secs(0.05 * i as f64);
            assert_eq!(debouncer.on_event(path, at), DebounceAction::Scheduled);
        }
        assert_eq!(debouncer.pending_count(), 1);

        // Quiet period measured from the last event.
        let last = start + secs(0.2);
        assert!(debouncer.take_due(last + secs(0.1)).is_empty());
        let due = debouncer.take_due(last + secs(0.25));
        assert_eq!(due.len(), 1);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn zero_quiet_period_fires_immediately() {
        let mut debouncer = Debouncer::new(Duration::ZERO, secs(30.0));
        let path = Path::new("/repo/a.py");
        assert_eq!(
            debouncer.on_event(path, Instant::now()),
            DebounceAction::FireNow
        );
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn max_wait_forces_firing_during_continuous_edits() {
        let mut debouncer = Debouncer::new(secs(0.5), secs(0.3));
        let path = Path::new("/repo/a.py");
        let start = Instant::now();

        assert_eq!(debouncer.on_event(path, start), DebounceAction::Scheduled);
        // Next event lands past the hard deadline.
        assert_eq!(
            debouncer.on_event(path, start + secs(0.4)),
            DebounceAction::FireNow
        );
        // State was reset.
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn distinct_paths_are_independent(){
        let mut debouncer = Debouncer::new(secs(0.2), secs(5.0));
        let start = Instant::now();
        debouncer.on_event(Path::new("/repo/a.py"), start);
        debouncer.on_event(Path::new("/repo/b.py"), start + secs(0.1));
        assert_eq!(debouncer.pending_count(), 2);

        let due = debouncer.take_due(start + secs(0.25));
        assert_eq!(due, vec![PathBuf::from("/repo/a.py")]);
        assert_eq!(debouncer.pending_count(), 1);
    }

    #[test]
    fn events_during_in_flight_update_are_not_lost() {
        let mut debouncer = Debouncer::new(secs(0.2), secs(5.0));
        let path = Path::new("/repo/a.py");
        let start = Instant::now();

        debouncer.on_event(path, start);
        let due = debouncer.take_due(start + secs(0.3));
        assert_eq!(due.len(), 1);

        debouncer.begin(path);
        // A save lands while the update runs.
        assert_eq!(
            debouncer.on_event(path, start + secs(0.35)),
            DebounceAction::Scheduled
        );
        assert!(!debouncer.has_pending());

        // Completion schedules the follow-up timer.
        assert!(debouncer.finish(path, start + secs(0.4)));
        assert_eq!(debouncer.pending_count(), 1);
        let due = debouncer.take_due(start + secs(0.65));
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn next_deadline_is_earliest() {
        let mut debouncer = Debouncer::new(secs(0.2), secs(5.0));
        let start = Instant::now();
        debouncer.on_event(Path::new("/repo/a.py"), start);
        debouncer.on_event(Path::new("/repo/b.py"), start + secs(0.1));
        assert_eq!(debouncer.next_deadline(), Some(start + secs(0.2)));
    }
}
