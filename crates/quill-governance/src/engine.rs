//! The governance orchestrator.
//!
//! Composes the stake ledger, proposal store and timelock into one
//! authorization pipeline. The engine acts as the timelock admin: external
//! callers only ever see `propose`/`cast_vote`/`queue`/`execute`/`cancel`,
//! never the per-entry queue operations.
//!
//! All mutable state sits behind a single `parking_lot::RwLock`, so on a
//! host without a serializing transaction sequencer every mutating call is
//! still applied under mutual exclusion, and reads observe a consistent
//! snapshot.

use parking_lot::RwLock;

use quill_timelock::{CallExecutor, QueuedCall, Timelock, TimelockError};
use quill_types::{Address, Amount, Hash, Timestamp};

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::ledger::TokenLedger;
use crate::proposal::{Proposal, ProposalAction, ProposalState, ProposalStore, VoteSupport};
use crate::stake::StakeLedger;

struct EngineState<L> {
    config: GovernanceConfig,
    stake: StakeLedger,
    proposals: ProposalStore,
    timelock: Timelock,
    token: L,
}

impl<L> EngineState<L> {
    /// Quorum in vote weight: quorum_bps of the current locked supply.
    fn quorum(&self) -> u128 {
        self.stake.total_locked() * self.config.quorum_bps as u128 / 10_000
    }

    fn grace_period(&self) -> u64 {
        self.config.timelock.grace_period
    }
}

/// Composition root for QUILL governance.
pub struct GovernanceEngine<L> {
    /// Identity the engine acts as when calling the timelock
    authority: Address,
    inner: RwLock<EngineState<L>>,
}

impl<L: TokenLedger> GovernanceEngine<L> {
    /// Create an engine with a fresh timelock it controls from the start.
    pub fn new(
        config: GovernanceConfig,
        authority: Address,
        token: L,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        let timelock = Timelock::new(config.timelock, authority)?;
        Ok(Self::assemble(config, authority, token, timelock))
    }

    /// Create an engine around an existing timelock, e.g. one whose admin is
    /// still the deployer mid-handover. Use [`claim_admin`](Self::claim_admin)
    /// once this engine has been nominated.
    pub fn adopt(
        config: GovernanceConfig,
        authority: Address,
        token: L,
        timelock: Timelock,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        Ok(Self::assemble(config, authority, token, timelock))
    }

    fn assemble(
        config: GovernanceConfig,
        authority: Address,
        token: L,
        timelock: Timelock,
    ) -> Self {
        let stake = StakeLedger::new(config.custody, config.min_lock_amount);
        Self {
            authority,
            inner: RwLock::new(EngineState {
                config,
                stake,
                proposals: ProposalStore::new(),
                timelock,
                token,
            }),
        }
    }

    /// The identity this engine uses toward the timelock.
    pub fn authority(&self) -> Address {
        self.authority
    }

    // ---- stake -----------------------------------------------------------

    /// Lock tokens for voting power.
    pub fn lock(
        &self,
        principal: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        let EngineState { stake, token, .. } = &mut *st;
        stake.lock(token, principal, amount, now)
    }

    /// Release locked tokens.
    ///
    /// Partial release is refused while the principal has a proposal still
    /// in flight; a full exit is always allowed, and it is exactly what
    /// opens that proposal's lapsed-standing cancel path to everyone.
    pub fn unlock(
        &self,
        principal: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        let quorum = st.quorum();
        let grace = st.grace_period();
        let partial = amount < st.stake.locked_of(principal);
        if partial {
            if let Some(live) = st.proposals.iter().find(|p| {
                p.proposer == principal
                    && matches!(
                        p.state(quorum, grace, now),
                        ProposalState::Pending
                            | ProposalState::Active
                            | ProposalState::Succeeded
                            | ProposalState::Queued
                    )
            }) {
                return Err(GovernanceError::LockInUse(live.id));
            }
        }

        let EngineState { stake, token, .. } = &mut *st;
        stake.unlock(token, principal, amount)
    }

    /// Voting power of `principal` right now.
    pub fn voting_power_of(&self, principal: Address) -> u64 {
        self.inner.read().stake.voting_power_of(principal)
    }

    /// Current governance-participating supply.
    pub fn total_locked(&self) -> Amount {
        self.inner.read().stake.total_locked()
    }

    /// Current quorum, in vote weight.
    pub fn quorum(&self) -> u128 {
        self.inner.read().quorum()
    }

    // ---- proposals -------------------------------------------------------

    /// Create a proposal. The proposer must hold at least the configured
    /// threshold of voting power.
    pub fn propose(
        &self,
        proposer: Address,
        actions: Vec<ProposalAction>,
        description: String,
        now: Timestamp,
    ) -> Result<u64, GovernanceError> {
        let mut st = self.inner.write();

        let power = st.stake.voting_power_of(proposer);
        let required = st.config.proposal_threshold;
        if power < required {
            return Err(GovernanceError::BelowThreshold { required, actual: power });
        }

        let max_actions = st.config.max_actions;
        let voting_period = st.config.voting_period;
        let id = st
            .proposals
            .create(proposer, actions, description, max_actions, voting_period, now)?;
        tracing::info!(id, %proposer, "proposal created");
        Ok(id)
    }

    /// Cast a vote weighted by the voter's power at this moment.
    pub fn cast_vote(
        &self,
        voter: Address,
        id: u64,
        support: VoteSupport,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        let weight = st.stake.voting_power_of(voter);
        let proposal = st
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.cast_vote(voter, support, weight, now)?;
        tracing::debug!(id, %voter, weight, ?support, "vote cast");
        Ok(())
    }

    /// Derived state of a proposal against the live quorum.
    pub fn state(&self, id: u64, now: Timestamp) -> Result<ProposalState, GovernanceError> {
        let st = self.inner.read();
        let quorum = st.quorum();
        let grace = st.grace_period();
        st.proposals
            .get(id)
            .map(|p| p.state(quorum, grace, now))
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    /// Snapshot of a proposal record.
    pub fn proposal(&self, id: u64) -> Option<Proposal> {
        self.inner.read().proposals.get(id).cloned()
    }

    // ---- queue / execute / cancel ---------------------------------------

    /// Queue every action of a succeeded proposal into the timelock with
    /// `eta = now + min_delay`. All-or-nothing: if any action cannot be
    /// queued, the siblings queued so far are rolled back and the proposal
    /// stays `Succeeded`.
    pub fn queue(&self, id: u64, now: Timestamp) -> Result<Timestamp, GovernanceError> {
        let mut st = self.inner.write();
        let quorum = st.quorum();
        let grace = st.grace_period();

        let proposal = st
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let state = proposal.state(quorum, grace, now);
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidState { expected: "Succeeded", actual: state });
        }
        let actions = proposal.actions.clone();

        let eta = now + st.config.timelock.min_delay;
        let authority = self.authority;
        let mut queued: Vec<Hash> = Vec::with_capacity(actions.len());
        for action in &actions {
            match st.timelock.queue(authority, as_queued_call(action, eta), now) {
                Ok(hash) => queued.push(hash),
                Err(e) => {
                    // Roll back siblings so the proposal can be re-queued
                    // intact later.
                    for hash in &queued {
                        let _ = st.timelock.cancel(authority, hash);
                    }
                    return Err(e.into());
                }
            }
        }

        let proposal = st
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.eta = Some(eta);
        tracing::info!(id, eta, entries = queued.len(), "proposal queued");
        Ok(eta)
    }

    /// Execute every queued entry of a proposal through `executor`.
    ///
    /// The proposal is marked `Executed` only after all entries have
    /// executed. On the first failure it stays `Queued`: entries already
    /// executed remain latched and the rest can be retried once the blocking
    /// condition clears. Partial execution is never a terminal state.
    pub fn execute(
        &self,
        id: u64,
        now: Timestamp,
        executor: &mut dyn CallExecutor,
    ) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        let quorum = st.quorum();
        let grace = st.grace_period();

        let proposal = st
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let state = proposal.state(quorum, grace, now);
        // Expired proposals fall through to the timelock so the caller gets
        // the Stale timing error with its deadline, not a state mismatch.
        if !matches!(state, ProposalState::Queued | ProposalState::Expired) {
            return Err(GovernanceError::InvalidState { expected: "Queued", actual: state });
        }
        let actions = proposal.actions.clone();
        let eta = proposal.eta.ok_or(GovernanceError::InvalidState {
            expected: "Queued",
            actual: state,
        })?;

        let authority = self.authority;
        for action in &actions {
            let hash = as_queued_call(action, eta).content_hash();
            match st.timelock.execute(authority, &hash, now, &mut *executor) {
                Ok(()) => {}
                // Already latched by an earlier partial attempt.
                Err(TimelockError::AlreadyExecuted(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let proposal = st
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.executed = true;
        tracing::info!(id, "proposal executed");
        Ok(())
    }

    /// Cancel a proposal and any still-pending timelock entries.
    ///
    /// Allowed to the proposer themselves, or to anyone once the proposer's
    /// voting power has fallen below the proposal threshold.
    pub fn cancel(
        &self,
        caller: Address,
        id: u64,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        let quorum = st.quorum();
        let grace = st.grace_period();

        let proposal = st
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let state = proposal.state(quorum, grace, now);
        if matches!(state, ProposalState::Executed | ProposalState::Canceled) {
            return Err(GovernanceError::InvalidState {
                expected: "not yet executed",
                actual: state,
            });
        }

        let proposer = proposal.proposer;
        let standing = st.stake.voting_power_of(proposer);
        if caller != proposer && standing >= st.config.proposal_threshold {
            return Err(GovernanceError::CannotCancel);
        }

        let actions = proposal.actions.clone();
        let eta = proposal.eta;
        let authority = self.authority;
        if let Some(eta) = eta {
            for action in &actions {
                let hash = as_queued_call(action, eta).content_hash();
                // Entries may already be executed or expired out of the
                // queue; cancellation of the proposal still proceeds.
                let _ = st.timelock.cancel(authority, &hash);
            }
        }

        let proposal = st
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.canceled = true;
        tracing::info!(id, %caller, "proposal canceled");
        Ok(())
    }

    // ---- timelock admin --------------------------------------------------

    /// Nominate a successor timelock admin (first half of the two-phase
    /// handover). The nominee must accept against the same timelock.
    pub fn begin_admin_handover(&self, nominee: Address) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        st.timelock.set_pending_admin(self.authority, nominee)?;
        Ok(())
    }

    /// Accept a pending nomination addressed to this engine's authority.
    pub fn claim_admin(&self) -> Result<(), GovernanceError> {
        let mut st = self.inner.write();
        st.timelock.accept_admin(self.authority)?;
        Ok(())
    }

    /// Current timelock admin.
    pub fn timelock_admin(&self) -> Address {
        self.inner.read().timelock.admin()
    }

    /// Pending timelock admin, if a handover is in flight.
    pub fn pending_timelock_admin(&self) -> Option<Address> {
        self.inner.read().timelock.pending_admin()
    }
}

fn as_queued_call(action: &ProposalAction, eta: Timestamp) -> QueuedCall {
    QueuedCall {
        target: action.target,
        value: action.value,
        signature: action.signature.clone(),
        call_data: action.call_data.clone(),
        eta,
    }
}
