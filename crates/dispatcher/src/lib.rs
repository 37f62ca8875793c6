//! # Dispatcher
//!
//! Detection fan-out core: wraps one classified detection into one
//! instance of each relevant action variant and executes the instances
//! concurrently through a retrying executor.
//!
//! Responsibilities:
//! - Action variants (log, persist, clip export, weather upload, broker
//!   publish, range-filter refresh, live broadcast)
//! - Consistency-wait protocol inside the broadcast variant
//! - Per-action retry execution and metrics
//!
//! The classifier, the store, the network clients and the streaming
//! transport are external collaborators behind `contracts` traits.

pub mod actions;
mod dispatcher;
mod executor;
mod metrics;

pub use crate::dispatcher::{Collaborators, Dispatcher, DispatcherConfig};
pub use crate::executor::RetryExecutor;
pub use crate::metrics::{ActionMetrics, MetricsSnapshot};
