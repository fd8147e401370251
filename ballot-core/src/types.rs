//! Core types for the ballot
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Opaque identities (no assumptions about the identity scheme)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque voter identity
///
/// One identity casts at most one vote over the lifetime of a ballot.
/// In the reference deployment this is a hex account address, but the
/// ledger treats it as an uninterpreted token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoterId(String);

impl VoterId {
    /// Create new voter identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One candidate option on the ballot
///
/// The name is fixed at ballot creation; `vote_count` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal name (immutable after creation)
    pub name: String,

    /// Number of votes received
    pub vote_count: u64,
}

impl Proposal {
    /// Create a proposal with a zero tally
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vote_count: 0,
        }
    }
}

/// Accepted vote, as persisted in the append-only log
///
/// Records are sequence-numbered in acceptance order and never modified
/// or deleted. Replaying the log in `seq` order reconstructs the tallies
/// and the voted set exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Position in the log (0-based, contiguous)
    pub seq: u64,

    /// Identity that cast the vote
    pub voter: VoterId,

    /// Index of the proposal voted for
    pub proposal_index: usize,

    /// Acceptance timestamp
    pub cast_at: DateTime<Utc>,
}

/// Ballot manifest, written once at creation
///
/// The manifest is the durable source of the immutable parts of the
/// ballot: the proposal names (and therefore N), the owner, and the
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotManifest {
    /// Unique ballot ID (UUIDv7 for time-ordering)
    pub ballot_id: Uuid,

    /// Identity that created the ballot (informational; gates nothing)
    pub owner: VoterId,

    /// Proposal names in construction order. Indices are stable and
    /// 0-based; names need not be unique.
    pub proposal_names: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voter_id_roundtrip() {
        let voter = VoterId::new("0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        assert_eq!(voter.as_str(), "0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        assert_eq!(voter.to_string(), voter.as_str());
    }

    #[test]
    fn test_proposal_starts_at_zero() {
        let proposal = Proposal::new("A");
        assert_eq!(proposal.name, "A");
        assert_eq!(proposal.vote_count, 0);
    }

    #[test]
    fn test_vote_record_serialization() {
        let record = VoteRecord {
            seq: 7,
            voter: VoterId::new("0xvoter"),
            proposal_index: 2,
            cast_at: Utc::now(),
        };

        let bytes = bincode::serialize(&record).unwrap();
        let decoded: VoteRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
    }
}
