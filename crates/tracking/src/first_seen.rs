//! SpeciesTracker - atomic first-seen bookkeeping
//!
//! Many detections of the same species can arrive concurrently; the
//! check-and-update below holds one lock across the read and the write so
//! exactly one of them observes "first ever".

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

/// First-seen tracker shared across persistence actions
#[derive(Debug, Default)]
pub struct SpeciesTracker {
    /// Scientific name -> first recorded occurrence
    first_seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SpeciesTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the tracker from already-persisted records.
    ///
    /// Called once at startup so a process restart does not re-announce
    /// known species. Later occurrences never shift an earlier date.
    pub fn hydrate<I>(&self, records: I)
    where
        I: IntoIterator<Item = (String, DateTime<Utc>)>,
    {
        let mut first_seen = self
            .first_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (scientific_name, seen_at) in records {
            first_seen
                .entry(scientific_name)
                .and_modify(|existing| {
                    if seen_at < *existing {
                        *existing = seen_at;
                    }
                })
                .or_insert(seen_at);
        }
    }

    /// Atomically determine and record whether this is the first-ever
    /// occurrence of the species.
    ///
    /// Returns `(is_new, days_since_first_seen)`; `days_since_first_seen`
    /// is 0 for a first occurrence.
    pub fn check_and_update(&self, scientific_name: &str, now: DateTime<Utc>) -> (bool, i64) {
        let mut first_seen = self
            .first_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match first_seen.get(scientific_name) {
            Some(first) => {
                let days = (now - *first).num_days().max(0);
                (false, days)
            }
            None => {
                first_seen.insert(scientific_name.to_string(), now);
                debug!(scientific_name, "First-ever occurrence recorded");
                (true, 0)
            }
        }
    }

    /// Number of distinct species seen so far
    pub fn species_count(&self) -> usize {
        self.first_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
