//! CLI command implementations.

pub mod check_indexes;
pub mod diff;
pub mod hash;
