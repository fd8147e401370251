//! Actor-based concurrency for the ballot
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task is the global serialization point, so
//!   `CastVote` is linearizable: the has-voted check and the tally
//!   increment execute as a unit with no interleaving
//! - Reads go through the same mailbox and therefore observe a
//!   consistent post-operation snapshot (a tally increment is never
//!   visible without its voted-set entry)
//! - Async message passing with backpressure (bounded mailbox)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Clients / sessions                    │
//! │        Many concurrent identities casting votes       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ vote / read requests
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               BallotHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              BallotActor (Single Task)                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ proposals: Vec<Proposal>                        │  │
//! │  │ voted: HashSet<VoterId>                         │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │            Storage::append_vote()                     │
//! │         (durable write before the ack)                │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::types::{BallotManifest, Proposal, VoteRecord, VoterId};
use crate::{Error, Metrics, Result, Storage};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// In-memory ballot state owned by the actor
#[derive(Debug)]
pub struct BallotState {
    /// Ballot ID from the manifest
    pub ballot_id: Uuid,

    /// Identity that created the ballot (inert, informational)
    pub owner: VoterId,

    /// Proposals in construction order; names never change
    pub proposals: Vec<Proposal>,

    /// Identities that have voted; grows monotonically
    pub voted: HashSet<VoterId>,

    /// Sequence number for the next vote record
    pub next_seq: u64,
}

impl BallotState {
    /// Fresh state from a manifest (no votes yet)
    pub fn fresh(manifest: &BallotManifest) -> Self {
        Self {
            ballot_id: manifest.ballot_id,
            owner: manifest.owner.clone(),
            proposals: manifest
                .proposal_names
                .iter()
                .map(|name| Proposal::new(name.as_str()))
                .collect(),
            voted: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Rebuild state by replaying the vote log against a manifest
    ///
    /// The log is validated as it is applied: an out-of-range index, a
    /// duplicate voter, or a sequence gap means the log does not describe
    /// a ballot this code could have produced.
    pub fn restore(manifest: &BallotManifest, log: &[VoteRecord]) -> Result<Self> {
        let mut state = Self::fresh(manifest);

        for record in log {
            if record.seq != state.next_seq {
                return Err(Error::InvariantViolation(format!(
                    "Vote log gap: expected seq {}, found {}",
                    state.next_seq, record.seq
                )));
            }
            if record.proposal_index >= state.proposals.len() {
                return Err(Error::InvariantViolation(format!(
                    "Vote log references proposal {} on a ballot of {}",
                    record.proposal_index,
                    state.proposals.len()
                )));
            }
            if !state.voted.insert(record.voter.clone()) {
                return Err(Error::InvariantViolation(format!(
                    "Vote log contains two votes from {}",
                    record.voter
                )));
            }

            state.proposals[record.proposal_index].vote_count += 1;
            state.next_seq += 1;
        }

        Ok(state)
    }
}

/// Message sent to the ballot actor
pub enum BallotMessage {
    /// Cast a vote for a proposal
    CastVote {
        voter: VoterId,
        proposal_index: usize,
        response: oneshot::Sender<Result<()>>,
    },

    /// Get a snapshot of one proposal
    GetProposal {
        index: usize,
        response: oneshot::Sender<Result<Proposal>>,
    },

    /// Get a consistent snapshot of all proposals
    ListProposals {
        response: oneshot::Sender<Vec<Proposal>>,
    },

    /// Has this identity voted?
    HasVoted {
        voter: VoterId,
        response: oneshot::Sender<bool>,
    },

    /// Get the ballot owner
    GetOwner {
        response: oneshot::Sender<VoterId>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ballot messages
pub struct BallotActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<BallotMessage>,

    /// Ballot state (exclusively owned; this is the serialization point)
    state: BallotState,

    /// Metrics collector
    metrics: Metrics,
}

impl BallotActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<BallotMessage>,
        state: BallotState,
        metrics: Metrics,
    ) -> Self {
        metrics.set_proposals(state.proposals.len());
        metrics.set_voters(state.voted.len());

        Self {
            storage,
            mailbox,
            state,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                BallotMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }

        tracing::debug!(ballot_id = %self.state.ballot_id, "Ballot actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: BallotMessage) {
        match msg {
            BallotMessage::CastVote {
                voter,
                proposal_index,
                response,
            } => {
                let started = std::time::Instant::now();
                let result = self.cast_vote(voter, proposal_index);
                self.metrics
                    .record_vote_duration(started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            BallotMessage::GetProposal { index, response } => {
                let result = match self.state.proposals.get(index) {
                    Some(proposal) => Ok(proposal.clone()),
                    None => Err(Error::IndexOutOfRange {
                        index,
                        len: self.state.proposals.len(),
                    }),
                };
                let _ = response.send(result);
            }

            BallotMessage::ListProposals { response } => {
                let _ = response.send(self.state.proposals.clone());
            }

            BallotMessage::HasVoted { voter, response } => {
                let _ = response.send(self.state.voted.contains(&voter));
            }

            BallotMessage::GetOwner { response } => {
                let _ = response.send(self.state.owner.clone());
            }

            BallotMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Apply one vote
    ///
    /// Checks run before any mutation, and the durable write lands before
    /// the in-memory mutation, so every error path leaves the aggregate
    /// untouched and every acked vote survives a restart.
    fn cast_vote(&mut self, voter: VoterId, proposal_index: usize) -> Result<()> {
        let len = self.state.proposals.len();
        if proposal_index >= len {
            self.metrics.record_rejected_out_of_range();
            return Err(Error::IndexOutOfRange {
                index: proposal_index,
                len,
            });
        }

        if self.state.voted.contains(&voter) {
            self.metrics.record_rejected_duplicate();
            return Err(Error::AlreadyVoted(voter));
        }

        let record = VoteRecord {
            seq: self.state.next_seq,
            voter: voter.clone(),
            proposal_index,
            cast_at: Utc::now(),
        };
        self.storage.append_vote(&record)?;

        self.state.voted.insert(voter);
        self.state.proposals[proposal_index].vote_count += 1;
        self.state.next_seq += 1;
        self.metrics.record_vote();

        Ok(())
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct BallotHandle {
    sender: mpsc::Sender<BallotMessage>,
}

impl BallotHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<BallotMessage>) -> Self {
        Self { sender }
    }

    /// Cast a vote
    pub async fn cast_vote(&self, voter: VoterId, proposal_index: usize) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BallotMessage::CastVote {
                voter,
                proposal_index,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get one proposal snapshot
    pub async fn get_proposal(&self, index: usize) -> Result<Proposal> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BallotMessage::GetProposal {
                index,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get a consistent snapshot of all proposals
    pub async fn list_proposals(&self) -> Result<Vec<Proposal>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BallotMessage::ListProposals { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Has this identity voted?
    pub async fn has_voted(&self, voter: VoterId) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BallotMessage::HasVoted {
                voter,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Get the ballot owner
    pub async fn owner(&self) -> Result<VoterId> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BallotMessage::GetOwner { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(BallotMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ballot actor
///
/// Returns the handle and the actor's join handle. The actor holds the
/// storage `Arc` until its task exits, so a caller that needs storage
/// released (shutdown before reopening the same data directory) must
/// await the join handle after sending `Shutdown`.
pub fn spawn_ballot_actor(
    storage: Arc<Storage>,
    state: BallotState,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> (BallotHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = BallotActor::new(storage, rx, state, metrics);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (BallotHandle::new(tx), task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use tempfile::TempDir;

    fn test_manifest(names: &[&str]) -> BallotManifest {
        BallotManifest {
            ballot_id: Uuid::now_v7(),
            owner: VoterId::new("0xowner"),
            proposal_names: names.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    fn spawn_test_actor(names: &[&str]) -> (BallotHandle, JoinHandle<()>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let storage = Arc::new(Storage::open(&config).unwrap());
        let state = BallotState::fresh(&test_manifest(names));
        let (handle, task) = spawn_ballot_actor(storage, state, Metrics::new().unwrap(), 64);
        (handle, task, temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, task, _temp) = spawn_test_actor(&["A", "B"]);
        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cast_vote_and_read_back() {
        let (handle, _task, _temp) = spawn_test_actor(&["A", "B"]);

        handle.cast_vote(VoterId::new("0xvoter1"), 0).await.unwrap();

        let p0 = handle.get_proposal(0).await.unwrap();
        assert_eq!(p0.name, "A");
        assert_eq!(p0.vote_count, 1);

        assert!(handle.has_voted(VoterId::new("0xvoter1")).await.unwrap());
        assert!(!handle.has_voted(VoterId::new("0xvoter2")).await.unwrap());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_vote_rejected() {
        let (handle, _task, _temp) = spawn_test_actor(&["A", "B"]);
        let voter = VoterId::new("0xvoter1");

        handle.cast_vote(voter.clone(), 0).await.unwrap();
        let result = handle.cast_vote(voter, 1).await;
        assert!(matches!(result, Err(Error::AlreadyVoted(_))));

        // Tallies untouched by the rejected vote
        let proposals = handle.list_proposals().await.unwrap();
        assert_eq!(proposals[0].vote_count, 1);
        assert_eq!(proposals[1].vote_count, 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_range_vote_rejected() {
        let (handle, _task, _temp) = spawn_test_actor(&["A", "B"]);
        let voter = VoterId::new("0xvoter1");

        let result = handle.cast_vote(voter.clone(), 5).await;
        assert!(matches!(
            result,
            Err(Error::IndexOutOfRange { index: 5, len: 2 })
        ));

        // A rejected index does not consume the identity's vote
        assert!(!handle.has_voted(voter.clone()).await.unwrap());
        handle.cast_vote(voter, 1).await.unwrap();

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_owner_is_inert_but_visible() {
        let (handle, _task, _temp) = spawn_test_actor(&["A"]);
        assert_eq!(handle.owner().await.unwrap(), VoterId::new("0xowner"));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_mailbox_surfaces_concurrency_error() {
        let (handle, task, _temp) = spawn_test_actor(&["A", "B"]);

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        // The actor is gone; every operation on a retained handle must
        // surface as a concurrency error, not hang or panic
        let vote = handle.cast_vote(VoterId::new("0xvoter1"), 0).await;
        assert!(matches!(vote, Err(Error::Concurrency(_))));

        let lookup = handle.get_proposal(0).await;
        assert!(matches!(lookup, Err(Error::Concurrency(_))));

        let voted = handle.has_voted(VoterId::new("0xvoter1")).await;
        assert!(matches!(voted, Err(Error::Concurrency(_))));
    }

    #[test]
    fn test_restore_replays_log() {
        let manifest = test_manifest(&["A", "B"]);
        let log = vec![
            VoteRecord {
                seq: 0,
                voter: VoterId::new("0xvoter1"),
                proposal_index: 0,
                cast_at: Utc::now(),
            },
            VoteRecord {
                seq: 1,
                voter: VoterId::new("0xvoter2"),
                proposal_index: 0,
                cast_at: Utc::now(),
            },
        ];

        let state = BallotState::restore(&manifest, &log).unwrap();
        assert_eq!(state.proposals[0].vote_count, 2);
        assert_eq!(state.proposals[1].vote_count, 0);
        assert_eq!(state.voted.len(), 2);
        assert_eq!(state.next_seq, 2);
    }

    #[test]
    fn test_restore_rejects_duplicate_voter() {
        let manifest = test_manifest(&["A", "B"]);
        let log = vec![
            VoteRecord {
                seq: 0,
                voter: VoterId::new("0xvoter1"),
                proposal_index: 0,
                cast_at: Utc::now(),
            },
            VoteRecord {
                seq: 1,
                voter: VoterId::new("0xvoter1"),
                proposal_index: 1,
                cast_at: Utc::now(),
            },
        ];

        let result = BallotState::restore(&manifest, &log);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_restore_rejects_seq_gap() {
        let manifest = test_manifest(&["A"]);
        let log = vec![VoteRecord {
            seq: 3,
            voter: VoterId::new("0xvoter1"),
            proposal_index: 0,
            cast_at: Utc::now(),
        }];

        let result = BallotState::restore(&manifest, &log);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }
}
