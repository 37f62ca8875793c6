//! Command implementations.

mod info;
mod validate;

pub use info::run_info;
pub use validate::run_validate;
