//! Error types for the ballot

use crate::types::VoterId;
use thiserror::Error;

/// Result type for ballot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ballot errors
#[derive(Error, Debug)]
pub enum Error {
    /// Bad constructor input (empty proposal list, ballot already exists)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Voter identity has already cast a vote
    #[error("Already voted: {0}")]
    AlreadyVoted(VoterId),

    /// Proposal index outside `[0, N)`
    ///
    /// Clients probing indices sequentially treat this as end-of-list,
    /// so it must be raised reliably and only when out of bounds.
    #[error("Proposal index {index} out of range (ballot has {len} proposals)")]
    IndexOutOfRange {
        /// Index requested by the caller
        index: usize,
        /// Number of proposals on the ballot
        len: usize,
    },

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Invariant violation (corrupt vote log detected during replay)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl Error {
    /// True for the terminal vote-rejection errors
    ///
    /// Retrying `vote` with the same inputs after one of these will fail
    /// again; only a corrected proposal index can succeed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::AlreadyVoted(_) | Error::IndexOutOfRange { .. }
        )
    }
}
