//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Detections carry wall-clock UTC timestamps (`chrono::DateTime<Utc>`)
//! - `row_id` is assigned by the persistence layer and stays 0 until the
//!   store write completes

mod action;
mod collaborators;
mod detection;
mod error;
mod settings;

pub use action::*;
pub use collaborators::*;
pub use detection::*;
pub use error::*;
pub use settings::*;
