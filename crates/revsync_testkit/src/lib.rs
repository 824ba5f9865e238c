//! # revsync Testkit
//!
//! Test utilities for revsync.
//!
//! This crate provides:
//! - Named graph builders and layered random graphs over `InMemoryStore`
//! - Reference-file trees for reachability scanning
//! - Property-based generators for identifiers and acyclic graphs
//! - Bare git repository fixtures
//!
//! ## Usage
//!
//! ```rust
//! use revsync_testkit::prelude::*;
//!
//! let mut graph = GraphBuilder::new();
//! graph.commit("base", &[]);
//! graph.commit("tip", &["base"]);
//! assert_eq!(graph.store().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod git;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::git::*;
}

pub use fixtures::*;
pub use generators::*;
pub use git::*;
