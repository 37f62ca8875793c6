//! EventTracker - dedup/throttle gate
//!
//! Check-and-record is atomic per (subject, kind): the first caller inside
//! a cooldown window wins, every later caller is suppressed until the
//! window elapses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use contracts::ActionKind;
use tracing::debug;

/// Throttle gate shared across action instances
#[derive(Debug)]
pub struct EventTracker {
    /// Default cooldown window
    cooldown: Duration,
    /// Per-kind overrides
    kind_cooldowns: HashMap<ActionKind, Duration>,
    /// Last pass-through instant per (subject, kind)
    last_event: Mutex<HashMap<(String, ActionKind), Instant>>,
    passed_count: AtomicU64,
    suppressed_count: AtomicU64,
}

impl EventTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            kind_cooldowns: HashMap::new(),
            last_event: Mutex::new(HashMap::new()),
            passed_count: AtomicU64::new(0),
            suppressed_count: AtomicU64::new(0),
        }
    }

    /// Override the cooldown window for one action kind
    pub fn with_kind_cooldown(mut self, kind: ActionKind, cooldown: Duration) -> Self {
        self.kind_cooldowns.insert(kind, cooldown);
        self
    }

    /// Atomically decide whether this occurrence proceeds.
    ///
    /// Returns `true` when the caller should produce its side effect and
    /// records the occurrence; returns `false` when a prior occurrence for
    /// the same (subject, kind) is still inside the cooldown window.
    pub fn track_event(&self, subject: &str, kind: ActionKind) -> bool {
        let window = self.window_for(kind);
        let now = Instant::now();

        let mut last_event = self
            .last_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let key = (subject.to_string(), kind);
        if let Some(last) = last_event.get(&key) {
            if now.duration_since(*last) < window {
                drop(last_event);
                self.suppressed_count.fetch_add(1, Ordering::Relaxed);
                debug!(subject, kind = %kind, "Event suppressed inside cooldown window");
                return false;
            }
        }
        last_event.insert(key, now);
        drop(last_event);

        self.passed_count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Drop entries older than twice the largest window.
    ///
    /// Callers run this periodically so the map does not grow with the
    /// all-time species count.
    pub fn prune(&self) {
        let max_window = self
            .kind_cooldowns
            .values()
            .copied()
            .chain(std::iter::once(self.cooldown))
            .max()
            .unwrap_or(self.cooldown);
        let max_age = max_window * 2;
        let now = Instant::now();

        let mut last_event = self
            .last_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        last_event.retain(|_, last| now.duration_since(*last) <= max_age);
    }

    /// Total pass-through decisions
    pub fn passed_count(&self) -> u64 {
        self.passed_count.load(Ordering::Relaxed)
    }

    /// Total suppressed decisions
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed_count.load(Ordering::Relaxed)
    }

    fn window_for(&self, kind: ActionKind) -> Duration {
        self.kind_cooldowns.get(&kind).copied().unwrap_or(self.cooldown)
    }
}
