//! Ballot Core
//!
//! Append-mostly voting ledger: a fixed set of proposals, one vote per
//! opaque identity, durable tallies.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task owns the ballot state; the
//!   check-then-increment of a vote never interleaves with another vote
//! - **Append-Only Log**: accepted votes are persisted as sequence-numbered
//!   records; replaying the log reconstructs the ballot exactly
//! - **Explicit Identity**: every operation that cares who is calling takes
//!   a [`VoterId`] argument; there is no ambient session state
//!
//! # Invariants
//!
//! - Proposal names and count are fixed at creation
//! - Each identity's voted flag flips false→true at most once
//! - Σ(vote_count) == number of identities that have voted, at all times
//! - No tally is ever decremented

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::BallotLedger;
pub use metrics::Metrics;
pub use storage::Storage;
pub use types::{BallotManifest, Proposal, VoteRecord, VoterId};
