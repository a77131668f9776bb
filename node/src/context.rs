//! The process-wide protocol context.
//!
//! [`ProtocolContext`] owns every component behind a single mutex. Each
//! operation runs against a working copy of the state; the copy's changes
//! are committed to the store as one write set and only then swapped in, so
//! a failed validation or a failed commit leaves nothing behind. Change
//! events are emitted after the swap, still under the lock, so listeners see
//! them in commit order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use daiv_escrow::Stake;
use daiv_governance::{
    ParameterAction, PolicyAction, Proposal, ProposalAction, ProposalDraft, ProposalFilter,
    ProposalStatus, ScheduledExecution, VoteChoice,
};
use daiv_ledger::{Account, MintReason, Minter, RewardRecord};
use daiv_registry::{DatasetFilter, DatasetRecord, Outcome, Submission};
use daiv_store::StateStore;
use daiv_types::{
    AccountId, Clock, DatasetId, DatasetStatus, ErrorKind, ProposalId, ProtocolParams,
    RejectionReason, Timestamp, TokenAmount,
};
use tracing::{debug, error, info};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::{ChangeEvent, EntityState};
use crate::metrics::{clamp_i64, NodeMetrics};
use crate::spans::operation_span;
use crate::state::ProtocolState;

/// Result of executing a queued proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub proposal_id: ProposalId,
    pub action: ProposalAction,
    pub executed_at: Timestamp,
    /// The mint the action caused, if any.
    pub minted: Option<RewardRecord>,
}

/// Token supply figures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupplySummary {
    pub total_supply: TokenAmount,
    pub total_minted: TokenAmount,
    pub escrowed: TokenAmount,
}

pub struct ProtocolContext {
    state: Mutex<ProtocolState>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    events: RwLock<crate::events::EventBus>,
    metrics: Arc<NodeMetrics>,
}

impl ProtocolContext {
    /// Load state from `store`, initialising it from `config` when empty.
    pub fn open(
        config: &NodeConfig,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let state = if ProtocolState::is_fresh(store.as_ref())? {
            let mut state = ProtocolState::genesis(config)?;
            let (set, _) = state.drain_changes()?;
            store.commit(set)?;
            info!("initialised empty store from genesis");
            state
        } else {
            ProtocolState::load(store.as_ref(), config)?
        };

        let metrics = Arc::new(NodeMetrics::new());
        refresh_gauges(&metrics, &state);
        Ok(Self {
            state: Mutex::new(state),
            store,
            clock,
            events: RwLock::new(crate::events::EventBus::new()),
            metrics,
        })
    }

    pub fn metrics(&self) -> Arc<NodeMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register a change-event listener. Listeners run under the protocol
    /// lock and must not call back into the context.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(Box::new(listener));
    }

    fn lock(&self) -> MutexGuard<'_, ProtocolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` against a working copy and commit it.
    fn apply<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut ProtocolState, Timestamp) -> Result<T, NodeError>,
    ) -> Result<T, NodeError> {
        let span = operation_span(name);
        let _enter = span.enter();
        let started = Instant::now();

        let mut guard = self.lock();
        let now = self.clock.now();
        let mut working = guard.clone();
        let outcome = op(&mut working, now).and_then(|value| {
            let (set, events) = working.drain_changes()?;
            if !set.is_empty() {
                self.store.commit(set)?;
                self.metrics.store_commits.inc();
            }
            Ok((value, events))
        });

        match outcome {
            Ok((value, events)) => {
                *guard = working;
                refresh_gauges(&self.metrics, &guard);
                let bus = self.events.read().unwrap_or_else(PoisonError::into_inner);
                for event in &events {
                    if let EntityState::Reward(reward) = &event.new_state {
                        self.metrics
                            .tokens_minted
                            .inc_by(u64::try_from(reward.amount.raw()).unwrap_or(u64::MAX));
                    }
                    bus.emit(event);
                }
                self.metrics
                    .operation_time_ms
                    .observe(started.elapsed().as_secs_f64() * 1_000.0);
                debug!(events = events.len(), "operation committed");
                Ok(value)
            }
            Err(e) => {
                self.metrics.operations_rejected.inc();
                if e.kind() == ErrorKind::Storage {
                    error!(error = %e, "operation failed in storage");
                } else {
                    debug!(error = %e, "operation rejected");
                }
                Err(e)
            }
        }
    }

    // ── Registry ────────────────────────────────────────────────────────

    /// Create a Staked dataset record and escrow its stake.
    pub fn submit_dataset(&self, submission: Submission) -> Result<DatasetId, NodeError> {
        let id = self.apply("submit_dataset", |s, now| {
            Ok(s.registry
                .submit(&mut s.ledger, &mut s.escrow, submission, now)?)
        })?;
        self.metrics.datasets_submitted.inc();
        Ok(id)
    }

    /// Move a Staked dataset to PendingVote and open its approval proposal.
    pub fn open_for_vote(
        &self,
        dataset: DatasetId,
        proposer: AccountId,
        title: String,
        description: String,
    ) -> Result<ProposalId, NodeError> {
        self.open_proposal(ProposalDraft {
            proposer,
            title,
            description,
            action: ProposalAction::DatasetApproval {
                dataset_id: dataset,
            },
        })
    }

    /// Pay the retroactive reward for downloads since the last report.
    pub fn record_usage(
        &self,
        dataset: DatasetId,
        cumulative_downloads: u64,
    ) -> Result<Option<RewardRecord>, NodeError> {
        self.apply("record_usage", |s, now| {
            Ok(s.registry
                .record_usage(&mut s.ledger, dataset, cumulative_downloads, now)?)
        })
    }

    // ── Governance ──────────────────────────────────────────────────────

    /// Open any kind of proposal. Dataset approvals also move their dataset
    /// to PendingVote.
    pub fn open_proposal(&self, draft: ProposalDraft) -> Result<ProposalId, NodeError> {
        let id = self.apply("open_proposal", |s, now| {
            let quorum = s.params.quorum_threshold;
            let period = s.params.voting_period_secs;
            match &draft.action {
                ProposalAction::DatasetApproval { dataset_id } => {
                    let dataset = *dataset_id;
                    s.registry.check_open_for_vote(dataset)?;
                    let id = s.voting.open(draft, quorum, period, now)?;
                    s.registry.open_for_vote(dataset, id)?;
                    Ok(id)
                }
                ProposalAction::PolicyChange(PolicyAction::SlashDataset { dataset_id, .. }) => {
                    let status = s.registry.status(*dataset_id)?;
                    if status.is_resolved() {
                        return Err(NodeError::InvalidRequest(format!(
                            "dataset {dataset_id} is already {status}"
                        )));
                    }
                    Ok(s.voting.open(draft, quorum, period, now)?)
                }
                _ => Ok(s.voting.open(draft, quorum, period, now)?),
            }
        })?;
        self.metrics.proposals_opened.inc();
        Ok(id)
    }

    /// Cast a vote weighted by the voter's effective power right now.
    /// Power already carried by an earlier vote on the proposal is not
    /// counted again.
    pub fn cast_vote(
        &self,
        proposal: ProposalId,
        voter: AccountId,
        choice: VoteChoice,
    ) -> Result<Proposal, NodeError> {
        let updated = self.apply("cast_vote", |s, now| {
            let sources = s.ledger.voting_power_sources(&voter);
            Ok(s.voting
                .cast_with_sources(proposal, &voter, choice, &sources, now)?
                .clone())
        })?;
        self.metrics.votes_cast.inc();
        Ok(updated)
    }

    /// Record the outcome of a closed vote. A failed dataset approval
    /// rejects its dataset and returns the stake.
    pub fn tally_proposal(&self, proposal: ProposalId) -> Result<ProposalStatus, NodeError> {
        let status = self.apply("tally_proposal", |s, now| {
            let status = s.voting.tally(proposal, now)?;
            let reason = match status {
                ProposalStatus::Defeated => RejectionReason::Defeated,
                ProposalStatus::QuorumFailed => RejectionReason::QuorumFailed,
                _ => return Ok(status),
            };
            if let ProposalAction::DatasetApproval { dataset_id } = s.voting.get(proposal)?.action {
                if s.registry.status(dataset_id)? == DatasetStatus::PendingVote {
                    s.resolve_dataset(dataset_id, Outcome::Rejected(reason), Some(proposal), now)?;
                }
            }
            Ok(status)
        })?;
        self.metrics.proposals_tallied.inc();
        Ok(status)
    }

    pub fn queue_proposal(&self, proposal: ProposalId) -> Result<ScheduledExecution, NodeError> {
        self.apply("queue_proposal", |s, now| {
            Ok(s.timelock.queue(&mut s.voting, proposal, now)?.clone())
        })
    }

    /// Execute a queued proposal and apply its action.
    pub fn execute_proposal(
        &self,
        proposal: ProposalId,
        caller: AccountId,
    ) -> Result<ExecutionReceipt, NodeError> {
        let receipt = self.apply("execute_proposal", |s, now| {
            let action = s.timelock.execute(&mut s.voting, proposal, &caller, now)?;
            let minted = dispatch(s, proposal, &action, now)?;
            Ok(ExecutionReceipt {
                proposal_id: proposal,
                action,
                executed_at: now,
                minted,
            })
        })?;
        self.metrics.proposals_executed.inc();
        Ok(receipt)
    }

    /// Cancel a proposal before it executes.
    ///
    /// An Active proposal without votes may be cancelled by its proposer or
    /// a timelock canceller; a passed or queued one only by a canceller.
    /// Cancelling a dataset approval withdraws the dataset.
    pub fn cancel_proposal(&self, proposal: ProposalId, caller: AccountId) -> Result<(), NodeError> {
        self.apply("cancel_proposal", |s, now| {
            let current = s.voting.get(proposal)?;
            let action = current.action.clone();
            if current.status == ProposalStatus::Active {
                if current.proposer != caller && !s.timelock.roles().can_cancel(&caller) {
                    return Err(NodeError::MissingAuthorization {
                        caller: caller.to_string(),
                        operation: "cancel proposals",
                    });
                }
                s.voting.cancel(proposal)?;
            } else {
                s.timelock.cancel(&mut s.voting, proposal, &caller)?;
            }
            if let ProposalAction::DatasetApproval { dataset_id } = action {
                if !s.registry.status(dataset_id)?.is_resolved() {
                    s.resolve_dataset(
                        dataset_id,
                        Outcome::Rejected(RejectionReason::Withdrawn),
                        Some(proposal),
                        now,
                    )?;
                }
            }
            Ok(())
        })
    }

    // ── Ledger ──────────────────────────────────────────────────────────

    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: TokenAmount,
    ) -> Result<(), NodeError> {
        self.apply("transfer", |s, _| Ok(s.ledger.transfer(&from, &to, amount)?))
    }

    pub fn delegate(&self, from: AccountId, to: AccountId) -> Result<(), NodeError> {
        self.apply("delegate", |s, _| Ok(s.ledger.delegate(&from, &to)?))
    }

    pub fn undelegate(&self, from: AccountId) -> Result<(), NodeError> {
        self.apply("undelegate", |s, _| {
            s.ledger.undelegate(&from);
            Ok(())
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Zero for unknown accounts.
    pub fn get_account_balance(&self, account: &AccountId) -> TokenAmount {
        self.lock().ledger.balance(account)
    }

    pub fn get_account(&self, account: &AccountId) -> Result<Account, NodeError> {
        self.lock()
            .ledger
            .account(account)
            .cloned()
            .ok_or_else(|| NodeError::NotFound(format!("account {account}")))
    }

    pub fn voting_power(&self, account: &AccountId) -> u64 {
        self.lock().ledger.effective_voting_power(account)
    }

    pub fn supply(&self) -> SupplySummary {
        let state = self.lock();
        SupplySummary {
            total_supply: state.ledger.total_supply(),
            total_minted: state.ledger.total_minted(),
            escrowed: state.ledger.escrowed(),
        }
    }

    pub fn get_dataset_status(&self, dataset: DatasetId) -> Result<DatasetStatus, NodeError> {
        Ok(self.lock().registry.status(dataset)?)
    }

    pub fn get_dataset(&self, dataset: DatasetId) -> Result<DatasetRecord, NodeError> {
        self.lock()
            .registry
            .record(dataset)
            .cloned()
            .ok_or_else(|| NodeError::NotFound(format!("dataset {dataset}")))
    }

    /// Dataset records matching `filter` in id order, skipping the first
    /// `offset` matches.
    pub fn list_datasets(
        &self,
        filter: &DatasetFilter,
        offset: usize,
        limit: usize,
    ) -> Vec<DatasetRecord> {
        self.lock()
            .registry
            .records()
            .filter(|r| filter.matches(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Proposals matching `filter` in id order, skipping the first `offset`
    /// matches.
    pub fn list_proposals(
        &self,
        filter: &ProposalFilter,
        offset: usize,
        limit: usize,
    ) -> Vec<Proposal> {
        self.lock()
            .voting
            .proposals()
            .filter(|p| filter.matches(p))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get_stake(&self, dataset: DatasetId) -> Result<Stake, NodeError> {
        self.lock()
            .escrow
            .stake(dataset)
            .cloned()
            .ok_or_else(|| NodeError::NotFound(format!("stake for {dataset}")))
    }

    pub fn get_proposal(&self, proposal: ProposalId) -> Result<Proposal, NodeError> {
        Ok(self.lock().voting.get(proposal)?.clone())
    }

    pub fn get_schedule(&self, proposal: ProposalId) -> Result<ScheduledExecution, NodeError> {
        self.lock()
            .timelock
            .schedule(proposal)
            .cloned()
            .ok_or_else(|| NodeError::NotFound(format!("schedule for {proposal}")))
    }

    pub fn params(&self) -> ProtocolParams {
        self.lock().params.clone()
    }
}

/// Apply an executed proposal's action. Returns the grant or base-reward
/// mint it caused.
fn dispatch(
    s: &mut ProtocolState,
    proposal: ProposalId,
    action: &ProposalAction,
    now: Timestamp,
) -> Result<Option<RewardRecord>, NodeError> {
    match action {
        ProposalAction::DatasetApproval { dataset_id } => {
            s.resolve_dataset(*dataset_id, Outcome::Approved, Some(proposal), now)
        }
        ProposalAction::ParameterChange(ParameterAction::SetParam { param, value }) => {
            let mut params = s.params.clone();
            param.apply(&mut params, *value)?;
            s.set_params(params);
            info!(%param, value, "parameter changed");
            Ok(None)
        }
        ProposalAction::ParameterChange(ParameterAction::MintGrant { recipient, amount }) => {
            Ok(Some(s.ledger.mint(
                recipient,
                *amount,
                &Minter::Timelock,
                MintReason::Grant { proposal },
                now,
            )?))
        }
        ProposalAction::PolicyChange(PolicyAction::SlashDataset { dataset_id, reason }) => {
            s.resolve_dataset(*dataset_id, Outcome::Rejected(*reason), Some(proposal), now)?;
            Ok(None)
        }
        ProposalAction::PolicyChange(PolicyAction::AddExecutor { account }) => {
            s.timelock.add_executor(account.clone());
            Ok(None)
        }
        ProposalAction::PolicyChange(PolicyAction::RemoveExecutor { account }) => {
            s.timelock.remove_executor(account)?;
            Ok(None)
        }
        ProposalAction::PolicyChange(PolicyAction::Signal { summary }) => {
            info!(%proposal, %summary, "signal proposal executed");
            Ok(None)
        }
    }
}

fn refresh_gauges(metrics: &NodeMetrics, state: &ProtocolState) {
    metrics
        .account_count
        .set(clamp_i64(state.ledger.accounts().count() as u128));
    metrics
        .dataset_count
        .set(clamp_i64(state.registry.records().count() as u128));
    metrics
        .proposal_count
        .set(clamp_i64(state.voting.proposals().count() as u128));
    metrics
        .escrow_held
        .set(clamp_i64(state.escrow.held_total().raw()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisAllocation;
    use daiv_nullables::{NullClock, NullStore};
    use daiv_types::ContentHash;

    fn setup() -> (ProtocolContext, Arc<NullClock>) {
        let config = NodeConfig {
            genesis: vec![GenesisAllocation {
                account: AccountId::new("alice"),
                balance: 100,
                voting_power: 2_000,
            }],
            ..NodeConfig::default()
        };
        let clock = Arc::new(NullClock::new(1_000));
        let ctx = ProtocolContext::open(&config, Arc::new(NullStore::new()), clock.clone()).unwrap();
        (ctx, clock)
    }

    fn submission(byte: u8) -> Submission {
        Submission::new(
            AccountId::new("alice"),
            ContentHash::new([byte; 32]),
            1024,
            0,
            TokenAmount::new(10),
        )
    }

    #[test]
    fn rejected_operation_changes_nothing() {
        let (ctx, _) = setup();
        let mut poor = submission(1);
        poor.stake = TokenAmount::new(500);
        let err = ctx.submit_dataset(poor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(
            ctx.get_account_balance(&AccountId::new("alice")),
            TokenAmount::new(100)
        );
        assert_eq!(ctx.supply().escrowed, TokenAmount::ZERO);
        assert_eq!(ctx.metrics().operations_rejected.get(), 1);
    }

    #[test]
    fn cancel_active_approval_withdraws_dataset() {
        let (ctx, _) = setup();
        let dataset = ctx.submit_dataset(submission(2)).unwrap();
        let proposal = ctx
            .open_for_vote(dataset, AccountId::new("alice"), "t".into(), String::new())
            .unwrap();
        let err = ctx
            .cancel_proposal(proposal, AccountId::new("mallory"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAuthorization);

        ctx.cancel_proposal(proposal, AccountId::new("alice")).unwrap();
        let record = ctx.get_dataset(dataset).unwrap();
        assert_eq!(record.status, DatasetStatus::Rejected);
        assert_eq!(record.rejection, Some(RejectionReason::Withdrawn));
        assert_eq!(
            ctx.get_account_balance(&AccountId::new("alice")),
            TokenAmount::new(100)
        );
    }

    #[test]
    fn quorum_failure_releases_stake() {
        let (ctx, clock) = setup();
        let dataset = ctx.submit_dataset(submission(3)).unwrap();
        let proposal = ctx
            .open_for_vote(dataset, AccountId::new("alice"), "t".into(), String::new())
            .unwrap();
        clock.advance(ctx.params().voting_period_secs);
        assert_eq!(
            ctx.tally_proposal(proposal).unwrap(),
            ProposalStatus::QuorumFailed
        );
        let record = ctx.get_dataset(dataset).unwrap();
        assert_eq!(record.rejection, Some(RejectionReason::QuorumFailed));
        assert!(ctx.get_stake(dataset).unwrap().released());
        assert_eq!(
            ctx.queue_proposal(proposal).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }
}
