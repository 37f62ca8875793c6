//! # Tracking
//!
//! Shared stateful collaborators for the dispatch layer:
//!
//! - [`EventTracker`]: dedup/throttle gate suppressing repeated side
//!   effects for the same (subject, kind) within a cooldown window
//! - [`SpeciesTracker`]: atomic first-seen bookkeeping per species
//!
//! Both are constructed once at process setup and shared by reference
//! across arbitrarily many concurrently-executing action instances; all
//! synchronization lives inside this crate.

mod first_seen;
mod throttle;

pub use first_seen::SpeciesTracker;
pub use throttle::EventTracker;
