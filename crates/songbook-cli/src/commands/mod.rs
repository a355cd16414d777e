//! CLI command implementations

pub mod json_output;
pub mod sync;
pub mod unwrap;
pub mod volume;

mod reporting;
