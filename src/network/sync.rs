//! Majority-vote round state machine used by the synchronizer.
//!
//! Peers answer `RequestChash(idx)` with the hash they hold at `idx`; each
//! answer is a [`ChashVote`]. The first vote opens a round for its index and
//! the round closes when its window expires or a vote for another index
//! arrives. The hash with the most distinct reporting ports wins and its
//! block is requested from exactly those ports. Equal counts go to the
//! lexicographically smallest hash.
//!
//! Votes carry no round identifier, so a late vote from an earlier round at
//! the same index is counted in the current one.
//!
//! This module keeps no clock of its own: callers pass `now`, which keeps
//! every transition testable.

use crate::core::HashField;
use log::debug;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// One peer's answer to `RequestChash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChashVote {
    pub idx: u64,
    pub port: u16,
    pub hash: HashField,
}

/// Block request issued when a round closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub idx: u64,
    pub hash: HashField,
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    RequestData(DataRequest),
    /// Start over by asking every peer for the hash at index 0.
    Resync,
}

/// Reporting ports per hash for one round.
#[derive(Debug, Default, Clone)]
pub struct VoteTally {
    votes: BTreeMap<HashField, Vec<u16>>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `port` for `hash`; a port repeating the same hash counts once.
    pub fn record(&mut self, hash: HashField, port: u16) {
        let ports = self.votes.entry(hash).or_default();
        if !ports.contains(&port) {
            ports.push(port);
        }
    }

    /// The hash with the most ports, ties broken by the smaller hash.
    pub fn winner(&self) -> Option<(&HashField, &[u16])> {
        let mut best: Option<(&HashField, &Vec<u16>)> = None;
        // Ascending key order: only a strictly larger count displaces the leader.
        for (hash, ports) in &self.votes {
            match best {
                Some((_, leader)) if ports.len() <= leader.len() => {}
                _ => best = Some((hash, ports)),
            }
        }
        best.map(|(hash, ports)| (hash, ports.as_slice()))
    }
}

#[derive(Debug)]
struct Round {
    idx: u64,
    opened_at: Instant,
    tally: VoteTally,
}

/// Synchronizer state: idle, or voting on one index until a deadline.
#[derive(Debug)]
pub struct SyncState {
    round: Option<Round>,
    last_activity: Instant,
    vote_window: Duration,
    resync_after: Duration,
}

impl SyncState {
    pub fn new(vote_window: Duration, resync_after: Duration, now: Instant) -> Self {
        SyncState {
            round: None,
            last_activity: now,
            vote_window,
            resync_after,
        }
    }

    /// Index of the open round, if any.
    pub fn voting_on(&self) -> Option<u64> {
        self.round.as_ref().map(|r| r.idx)
    }

    /// Feed one vote. A vote for a different index first closes the open
    /// round, whose data request is returned, and then opens a new one.
    pub fn on_vote(&mut self, vote: ChashVote, now: Instant) -> Option<DataRequest> {
        self.last_activity = now;

        let mut closed = None;
        if self.round.as_ref().is_some_and(|r| r.idx != vote.idx) {
            closed = self.close_round();
        }

        let round = self.round.get_or_insert_with(|| Round {
            idx: vote.idx,
            opened_at: now,
            tally: VoteTally::new(),
        });
        round.tally.record(vote.hash, vote.port);
        closed
    }

    /// Advance time: close an expired round, and after a quiet spell longer
    /// than the resync threshold close whatever is open and ask for a resync.
    pub fn on_tick(&mut self, now: Instant) -> Vec<SyncAction> {
        let mut actions = Vec::new();

        let expired = self
            .round
            .as_ref()
            .is_some_and(|r| now.saturating_duration_since(r.opened_at) >= self.vote_window);
        if expired {
            actions.extend(self.close_round().map(SyncAction::RequestData));
        }

        if now.saturating_duration_since(self.last_activity) >= self.resync_after {
            actions.extend(self.close_round().map(SyncAction::RequestData));
            actions.push(SyncAction::Resync);
            self.last_activity = now;
        }
        actions
    }

    fn close_round(&mut self) -> Option<DataRequest> {
        let round = self.round.take()?;
        let (hash, ports) = round.tally.winner()?;
        debug!(
            "Round for index {} closed: {} vote(s) for {hash}",
            round.idx,
            ports.len()
        );
        Some(DataRequest {
            idx: round.idx,
            hash: *hash,
            ports: ports.to_vec(),
        })
    }
}
