//! # colldiff Testkit
//!
//! Test utilities for colldiff.
//!
//! This crate provides:
//! - The canonical replication divergence scenario
//! - In-memory index catalogs and replica nodes with scripted failures
//! - Cursors that fail on demand
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```
//! use colldiff_core::diff_collections;
//! use colldiff_testkit::prelude::*;
//!
//! let scenario = replication_scenario();
//! let diff = diff_collections(scenario.source_cursor(), scenario.syncing_cursor()).unwrap();
//! assert_eq!(diff.docs_with_different_contents.len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
