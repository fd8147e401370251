//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ballot.
//!
//! # Metrics
//!
//! - `ballot_votes_total` - Total number of votes accepted
//! - `ballot_votes_rejected_duplicate_total` - Votes rejected because the identity already voted
//! - `ballot_votes_rejected_out_of_range_total` - Votes rejected for a bad proposal index
//! - `ballot_vote_duration_seconds` - Histogram of vote latencies
//! - `ballot_proposals` - Number of proposals on the ballot
//! - `ballot_voters` - Number of identities that have voted
//!
//! Metrics are registered on a per-instance [`Registry`] rather than the
//! process-wide default, so multiple ballots (or tests) can coexist in
//! one process.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total votes accepted
    pub votes_total: IntCounter,

    /// Votes rejected: identity already voted
    pub votes_rejected_duplicate: IntCounter,

    /// Votes rejected: proposal index out of range
    pub votes_rejected_out_of_range: IntCounter,

    /// Vote latency histogram
    pub vote_duration: Histogram,

    /// Number of proposals on the ballot
    pub proposals: IntGauge,

    /// Number of identities that have voted
    pub voters: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let votes_total = IntCounter::with_opts(Opts::new(
            "ballot_votes_total",
            "Total number of votes accepted",
        ))?;
        registry.register(Box::new(votes_total.clone()))?;

        let votes_rejected_duplicate = IntCounter::with_opts(Opts::new(
            "ballot_votes_rejected_duplicate_total",
            "Votes rejected because the identity already voted",
        ))?;
        registry.register(Box::new(votes_rejected_duplicate.clone()))?;

        let votes_rejected_out_of_range = IntCounter::with_opts(Opts::new(
            "ballot_votes_rejected_out_of_range_total",
            "Votes rejected for an out-of-range proposal index",
        ))?;
        registry.register(Box::new(votes_rejected_out_of_range.clone()))?;

        let vote_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ballot_vote_duration_seconds",
                "Histogram of vote latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(vote_duration.clone()))?;

        let proposals = IntGauge::with_opts(Opts::new(
            "ballot_proposals",
            "Number of proposals on the ballot",
        ))?;
        registry.register(Box::new(proposals.clone()))?;

        let voters = IntGauge::with_opts(Opts::new(
            "ballot_voters",
            "Number of identities that have voted",
        ))?;
        registry.register(Box::new(voters.clone()))?;

        Ok(Self {
            votes_total,
            votes_rejected_duplicate,
            votes_rejected_out_of_range,
            vote_duration,
            proposals,
            voters,
            registry,
        })
    }

    /// Record an accepted vote
    pub fn record_vote(&self) {
        self.votes_total.inc();
        self.voters.inc();
    }

    /// Record a duplicate-identity rejection
    pub fn record_rejected_duplicate(&self) {
        self.votes_rejected_duplicate.inc();
    }

    /// Record an out-of-range rejection
    pub fn record_rejected_out_of_range(&self) {
        self.votes_rejected_out_of_range.inc();
    }

    /// Record vote latency
    pub fn record_vote_duration(&self, duration_seconds: f64) {
        self.vote_duration.observe(duration_seconds);
    }

    /// Set the proposal count gauge
    pub fn set_proposals(&self, count: usize) {
        self.proposals.set(count as i64);
    }

    /// Set the voter count gauge (used when restoring from the log)
    pub fn set_voters(&self, count: usize) {
        self.voters.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
