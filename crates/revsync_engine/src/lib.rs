//! # revsync Engine
//!
//! Negotiation, transfer and orchestration for revsync.
//!
//! This crate provides:
//! - Breadth-first existence negotiation with ancestor pruning
//! - Chunked payload handoff that keeps a channel reusable
//! - Requester/fulfiller sessions and bidirectional exchanges
//! - Root discovery from reference files and repository discovery
//! - A multi-repository orchestrator and the matching remote service loop
//! - Single-repository `get` and `put`
//!
//! ## Architecture
//!
//! Two processes talk over one ordered byte channel. The requester owns a
//! set of roots and asks the fulfiller, object by object, whether it has
//! them, walking to parents only for objects the fulfiller lacks. It then
//! sends exactly the missing slice of the graph:
//!
//! ```text
//! requester                      fulfiller
//!     Q <id> Q <id> ...  ---->
//!                        <----   Y / N (in query order)
//!     Q <parent> ...     ---->
//!     T + payload chunks ---->   materialize
//! ```
//!
//! A sync runs both directions per repository pair, with `F` handing the
//! requester role to the other side.
//!
//! ## Key Invariants
//!
//! - An object is queried at most once per negotiation
//! - Ancestors of an object the fulfiller has are never queried
//! - Answers are consumed strictly in query order
//! - After any error that keeps the channel aligned, both sides are at the
//!   same position in the stream

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod discovery;
mod error;
mod fetch;
mod handoff;
mod negotiation;
mod observer;
mod orchestrator;
mod reachability;
mod server;
mod session;
mod transport;

pub use config::{SyncConfig, DEFAULT_REPOSITORY_SUFFIX};
pub use discovery::{discover_repositories, repository_path};
pub use error::{SyncError, SyncResult};
pub use fetch::{get, put};
pub use handoff::{abort_payload, receive_payload, send_payload, TransferPlan};
pub use negotiation::{NegotiationOutcome, NegotiationSession};
pub use observer::{RecordingObserver, SyncEvent, SyncObserver, TracingObserver};
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use reachability::ReachabilityScanner;
pub use server::serve;
pub use session::{ExchangeStats, RepositorySession, Role, Side, TransferStats};
pub use transport::{memory_duplex, pipe, Channel, MemoryChannel, PipeReader, PipeWriter};
