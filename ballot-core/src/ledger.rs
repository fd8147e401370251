//! Main ballot orchestration layer
//!
//! This module ties together storage and actor components into a
//! high-level API for creating a ballot and casting votes.
//!
//! # Example
//!
//! ```no_run
//! use ballot_core::{BallotLedger, Config, VoterId};
//!
//! #[tokio::main]
//! async fn main() -> ballot_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = BallotLedger::create(
//!         config,
//!         VoterId::new("0xowner"),
//!         vec!["A".to_string(), "B".to_string()],
//!     )
//!     .await?;
//!
//!     ledger.vote(VoterId::new("0xvoter1"), 0).await?;
//!     let proposal = ledger.proposal(0).await?;
//!     assert_eq!(proposal.vote_count, 1);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ballot_actor, BallotHandle, BallotState},
    types::{BallotManifest, Proposal, VoteRecord, VoterId},
    Config, Error, Metrics, Result, Storage,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Main ballot interface
///
/// Every mutating and reading operation takes the caller's identity
/// explicitly where it matters; there is no ambient session state.
pub struct BallotLedger {
    /// Actor handle for async operations
    handle: BallotHandle,

    /// Direct storage access (for audit reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Actor task; joined on shutdown so storage is released before
    /// shutdown returns
    task: JoinHandle<()>,
}

impl BallotLedger {
    /// Create a new ballot
    ///
    /// Allocates one zero-count proposal per name, in input order, and
    /// records `owner`. Fails with [`Error::InvalidConfiguration`] if the
    /// name list is empty or the data directory already holds a ballot.
    pub async fn create(
        config: Config,
        owner: VoterId,
        proposal_names: Vec<String>,
    ) -> Result<Self> {
        if proposal_names.is_empty() {
            return Err(Error::InvalidConfiguration(
                "Ballot requires at least one proposal".to_string(),
            ));
        }

        let storage = Arc::new(Storage::open(&config)?);

        let manifest = BallotManifest {
            ballot_id: Uuid::now_v7(),
            owner,
            proposal_names,
            created_at: Utc::now(),
        };
        storage.put_manifest(&manifest)?;

        tracing::info!(
            ballot_id = %manifest.ballot_id,
            proposals = manifest.proposal_names.len(),
            owner = %manifest.owner,
            "Ballot created"
        );

        let state = BallotState::fresh(&manifest);
        Self::start(&config, storage, state)
    }

    /// Open an existing ballot
    ///
    /// Replays the vote log against the manifest; tallies, the voted set
    /// and the owner come out exactly as they were before shutdown. A log
    /// that violates the ballot invariants is rejected with
    /// [`Error::InvariantViolation`].
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        let manifest = storage.get_manifest()?.ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "No ballot found in {:?}; create one first",
                config.data_dir
            ))
        })?;

        let log = storage.vote_log()?;
        let state = BallotState::restore(&manifest, &log)?;

        tracing::info!(
            ballot_id = %manifest.ballot_id,
            proposals = state.proposals.len(),
            votes = log.len(),
            "Ballot opened"
        );

        Self::start(&config, storage, state)
    }

    fn start(config: &Config, storage: Arc<Storage>, state: BallotState) -> Result<Self> {
        let metrics = Metrics::new()?;
        let (handle, task) = spawn_ballot_actor(
            storage.clone(),
            state,
            metrics.clone(),
            config.mailbox_capacity,
        );

        Ok(Self {
            handle,
            storage,
            metrics,
            task,
        })
    }

    /// Cast a vote
    ///
    /// Atomic as a unit: the identity is marked as having voted and the
    /// proposal's tally is incremented, or neither happens. Fails with
    /// [`Error::AlreadyVoted`] or [`Error::IndexOutOfRange`]; both leave
    /// all state unchanged and will fail again for identical inputs.
    pub async fn vote(&self, voter: VoterId, proposal_index: usize) -> Result<()> {
        self.handle.cast_vote(voter, proposal_index).await
    }

    /// Get a snapshot of one proposal
    ///
    /// [`Error::IndexOutOfRange`] doubles as the end-of-list signal for
    /// clients that enumerate by probing indices 0, 1, 2, …
    pub async fn proposal(&self, index: usize) -> Result<Proposal> {
        self.handle.get_proposal(index).await
    }

    /// Get all proposals as one consistent snapshot
    ///
    /// Yields exactly N items in construction order; no concurrent vote
    /// can land between two items of the same snapshot.
    pub async fn proposals(&self) -> Result<Vec<Proposal>> {
        self.handle.list_proposals().await
    }

    /// Number of proposals on the ballot
    pub async fn proposal_count(&self) -> Result<usize> {
        Ok(self.handle.list_proposals().await?.len())
    }

    /// Has this identity voted?
    pub async fn has_voted(&self, voter: VoterId) -> Result<bool> {
        self.handle.has_voted(voter).await
    }

    /// Identity that created the ballot (informational only)
    pub async fn owner(&self) -> Result<VoterId> {
        self.handle.owner().await
    }

    /// Full vote history in acceptance order (audit surface)
    ///
    /// Reads the durable log directly; a vote acked before this call is
    /// guaranteed to appear.
    pub fn vote_history(&self) -> Result<Vec<VoteRecord>> {
        self.storage.vote_log()
    }

    /// Metrics collector for this ballot
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ballot
    ///
    /// Waits for the actor task to exit before returning, so the data
    /// directory can be reopened immediately afterwards (the actor holds
    /// the storage handle, and RocksDB keeps its lock until that drops).
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        self.task
            .await
            .map_err(|_| Error::Concurrency("Actor task panicked".to_string()))?;
        Ok(())
    }
}
