//! Proposal lifecycle management.
//!
//! Proposal state is never stored. It is derived from the recorded tallies,
//! the voting window, the queue markers and the current time, so there is no
//! separate finalization step that can be forgotten or applied twice.

use std::collections::HashMap;

use quill_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// One administrative call a proposal wants performed.
///
/// Targets are opaque collaborator identifiers (vesting, staking, faucet,
/// reserve manager, the timelock itself); the governance core never
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    /// Collaborator the call is addressed to
    pub target: Address,
    /// Token value forwarded with the call
    pub value: Amount,
    /// Human-readable method signature
    pub signature: String,
    /// Encoded call arguments
    pub call_data: Vec<u8>,
}

/// Which way a vote counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteSupport {
    For,
    Against,
}

/// Record of a cast vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub support: VoteSupport,
    /// Voting power at the moment the vote was cast
    pub weight: u64,
}

/// Derived proposal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Before the voting window opens
    Pending,
    /// Within the voting window
    Active,
    /// Window closed, passed quorum and the tally
    Succeeded,
    /// Window closed, failed quorum or the tally (ties defeat)
    Defeated,
    /// Actions queued in the timelock, waiting for their eta
    Queued,
    /// All actions executed
    Executed,
    /// Explicitly canceled
    Canceled,
    /// Queued but the execution window lapsed
    Expired,
}

/// A governance proposal. Append-only: defeated, executed and canceled
/// proposals stay queryable forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique, monotonically assigned identifier
    pub id: u64,
    /// Principal that created the proposal
    pub proposer: Address,
    /// Ordered action list, executed atomically as a set
    pub actions: Vec<ProposalAction>,
    /// Free-text description
    pub description: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Voting window open
    pub start_time: Timestamp,
    /// Voting window close (inclusive)
    pub end_time: Timestamp,
    /// Weighted for-votes
    pub for_votes: u128,
    /// Weighted against-votes
    pub against_votes: u128,
    /// Per-principal vote receipts
    pub receipts: HashMap<Address, VoteReceipt>,
    /// Execution time recorded when the actions were queued
    pub eta: Option<Timestamp>,
    /// One-way latch set when every action has executed
    pub executed: bool,
    /// One-way latch set by the cancel path
    pub canceled: bool,
}

impl Proposal {
    /// Derive the current state.
    ///
    /// `quorum` must be evaluated against the *current* locked supply by the
    /// caller; it is deliberately not captured at creation time.
    pub fn state(&self, quorum: u128, grace_period: u64, now: Timestamp) -> ProposalState {
        if self.canceled {
            return ProposalState::Canceled;
        }
        if self.executed {
            return ProposalState::Executed;
        }
        if now < self.start_time {
            return ProposalState::Pending;
        }
        if now <= self.end_time {
            return ProposalState::Active;
        }
        // Window closed: an exact tie defeats.
        if self.for_votes <= self.against_votes || self.for_votes < quorum {
            return ProposalState::Defeated;
        }
        match self.eta {
            None => ProposalState::Succeeded,
            Some(eta) if now > eta + grace_period => ProposalState::Expired,
            Some(_) => ProposalState::Queued,
        }
    }

    /// Cast a vote with the given live weight.
    ///
    /// Weight is whatever the voter's power is at this moment; locking more
    /// tokens later never retroactively changes a recorded receipt.
    pub fn cast_vote(
        &mut self,
        voter: Address,
        support: VoteSupport,
        weight: u64,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let in_window = now >= self.start_time && now <= self.end_time;
        if self.canceled || self.executed || !in_window {
            return Err(GovernanceError::VotingClosed);
        }
        if self.receipts.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }
        if weight == 0 {
            return Err(GovernanceError::NoVotingPower);
        }

        match support {
            VoteSupport::For => self.for_votes += weight as u128,
            VoteSupport::Against => self.against_votes += weight as u128,
        }
        self.receipts.insert(voter, VoteReceipt { support, weight });
        Ok(())
    }

    /// Check if `voter` has voted.
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.receipts.contains_key(voter)
    }

    /// The recorded receipt for `voter`, if any.
    pub fn receipt(&self, voter: &Address) -> Option<&VoteReceipt> {
        self.receipts.get(voter)
    }
}

/// Append-only registry of all proposals.
#[derive(Debug, Clone, Default)]
pub struct ProposalStore {
    proposals: HashMap<u64, Proposal>,
    next_id: u64,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self {
            proposals: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create a proposal with the voting window `[now, now + voting_period]`.
    ///
    /// The action list must be non-empty and bounded; the proposer's
    /// standing is the orchestrator's concern.
    pub fn create(
        &mut self,
        proposer: Address,
        actions: Vec<ProposalAction>,
        description: String,
        max_actions: usize,
        voting_period: u64,
        now: Timestamp,
    ) -> Result<u64, GovernanceError> {
        if actions.is_empty() {
            return Err(GovernanceError::NoActions);
        }
        if actions.len() > max_actions {
            return Err(GovernanceError::TooManyActions {
                max: max_actions,
                actual: actions.len(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;

        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                actions,
                description,
                created_at: now,
                start_time: now,
                end_time: now + voting_period,
                for_votes: 0,
                against_votes: 0,
                receipts: HashMap::new(),
                eta: None,
                executed: false,
                canceled: false,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Proposal> {
        self.proposals.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
