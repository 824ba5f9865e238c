//! # revsync Store
//!
//! Object store trait and implementations for revsync.
//!
//! A store is the repository-side collaborator of a sync session: it answers
//! existence queries, lists immediate parents, and turns a slice of the
//! object graph into a payload and back. Stores know nothing about the wire.
//!
//! ## Design Principles
//!
//! - Stores are content-addressed and immutable per object
//! - Every present object has all of its ancestors present
//! - Payload formats are private to each store; peers must use the same kind
//! - Must be `Send + Sync` so sessions can share them across threads
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and embedding
//! - [`GitStore`] - For git repositories on disk, via the `git` executable
//!
//! ## Example
//!
//! ```rust
//! use revsync_store::{InMemoryStore, ObjectStore};
//!
//! let store = InMemoryStore::new();
//! let root = store.insert(&[], b"root").unwrap();
//! let child = store.insert(&[root], b"child").unwrap();
//!
//! assert_eq!(store.exists_all(&[root, child]).unwrap(), vec![true, true]);
//! assert_eq!(store.immediate_parents(&child).unwrap(), vec![root]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod git;
mod memory;

pub use backend::ObjectStore;
pub use error::{StoreError, StoreResult};
pub use git::{GitStore, PackOptions};
pub use memory::{InMemoryStore, PackedObject};
