//! All component state, its persistence layout and genesis.

use daiv_escrow::{Stake, StakeEscrow};
use daiv_governance::{
    Proposal, ScheduledExecution, Timelock, TimelockRoles, Vote, VotingEngine,
};
use daiv_ledger::{
    Account, DelegationSnapshot, LedgerSnapshot, Minter, RewardRecord, RewardTotals, TokenLedger,
};
use daiv_registry::{DatasetRecord, DatasetRegistry, Outcome};
use daiv_store::{get_meta, load_all, StateStore, StoreError, Table, WriteSet};
use daiv_types::{AccountId, DatasetId, ProposalId, ProtocolParams, Timestamp, TokenAmount};
use tracing::info;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::{ChangeEvent, EntityState, EntityType};

pub(crate) const META_PARAMS: &str = "params";
pub(crate) const META_ROLES: &str = "roles";
pub(crate) const META_DELEGATIONS: &str = "delegations";
pub(crate) const META_TREASURY: &str = "treasury";

/// The minters the deployment registers: rewards through the registry,
/// governance grants through the timelock.
pub(crate) fn protocol_minters() -> [Minter; 2] {
    [Minter::Registry, Minter::Timelock]
}

fn vote_key(proposal: ProposalId, voter: &AccountId) -> Vec<u8> {
    let mut key = proposal.to_key().to_vec();
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

/// Every component of the protocol, mutated together under one lock.
#[derive(Clone, Debug)]
pub struct ProtocolState {
    pub params: ProtocolParams,
    pub ledger: TokenLedger,
    pub escrow: StakeEscrow,
    pub registry: DatasetRegistry,
    pub voting: VotingEngine,
    pub timelock: Timelock,
    params_dirty: bool,
}

impl ProtocolState {
    /// Fresh state from configuration. Genesis allocations are applied and
    /// left dirty so the first commit persists them.
    pub fn genesis(config: &NodeConfig) -> Result<Self, NodeError> {
        let params = config.params.clone();
        let mut state = Self {
            ledger: TokenLedger::new(protocol_minters(), params.max_delegation_depth as usize),
            escrow: StakeEscrow::new(),
            registry: DatasetRegistry::new(&params, config.treasury.clone()),
            voting: VotingEngine::new(),
            timelock: Timelock::new(config.roles.to_roles(), params.timelock_delay_secs),
            params,
            params_dirty: true,
        };
        for alloc in &config.genesis {
            state.ledger.allocate_genesis(
                &alloc.account,
                TokenAmount::from(alloc.balance),
                alloc.voting_power,
            )?;
        }
        // Persist the role set alongside the params.
        state.timelock.mark_roles_dirty();
        info!(allocations = config.genesis.len(), "genesis state created");
        Ok(state)
    }

    /// Whether `store` has never been initialised.
    pub fn is_fresh(store: &dyn StateStore) -> Result<bool, StoreError> {
        Ok(store.get(Table::Meta, META_PARAMS.as_bytes())?.is_none())
    }

    /// Rebuild all component state from `store`.
    pub fn load(store: &dyn StateStore, config: &NodeConfig) -> Result<Self, NodeError> {
        let params: ProtocolParams =
            get_meta(store, META_PARAMS)?.unwrap_or_else(|| config.params.clone());
        let roles: TimelockRoles =
            get_meta(store, META_ROLES)?.unwrap_or_else(|| config.roles.to_roles());
        let delegations: DelegationSnapshot =
            get_meta(store, META_DELEGATIONS)?.unwrap_or_default();
        let treasury: AccountId =
            get_meta(store, META_TREASURY)?.unwrap_or_else(|| config.treasury.clone());

        let stakes: Vec<Stake> = load_all(store, Table::Stakes)?;
        let escrow = StakeEscrow::restore(stakes);
        let ledger = TokenLedger::restore(
            LedgerSnapshot {
                accounts: load_all::<Account>(store, Table::Accounts)?,
                rewards: RewardTotals::from_records(&load_all::<RewardRecord>(
                    store,
                    Table::Rewards,
                )?),
                escrowed: escrow.held_total(),
                delegations,
            },
            protocol_minters(),
            params.max_delegation_depth as usize,
        );
        let registry = DatasetRegistry::restore(
            load_all::<DatasetRecord>(store, Table::Datasets)?,
            &params,
            treasury,
        );
        let voting = VotingEngine::restore(
            load_all::<Proposal>(store, Table::Proposals)?,
            load_all::<Vote>(store, Table::Votes)?,
        );
        let timelock = Timelock::restore(
            load_all::<ScheduledExecution>(store, Table::Schedules)?,
            roles,
            params.timelock_delay_secs,
        );

        info!(
            accounts = ledger.accounts().count(),
            datasets = registry.records().count(),
            proposals = voting.proposals().count(),
            "protocol state loaded"
        );
        Ok(Self {
            params,
            ledger,
            escrow,
            registry,
            voting,
            timelock,
            params_dirty: false,
        })
    }

    /// Replace the governed parameters and push them into every component.
    pub fn set_params(&mut self, params: ProtocolParams) {
        self.registry.apply_params(&params);
        self.ledger
            .set_max_delegation_depth(params.max_delegation_depth as usize);
        self.timelock.set_delay(params.timelock_delay_secs);
        self.params = params;
        self.params_dirty = true;
    }

    /// Finalize a dataset and cancel every other open proposal about it.
    pub fn resolve_dataset(
        &mut self,
        dataset: DatasetId,
        outcome: Outcome,
        decided_by: Option<ProposalId>,
        now: Timestamp,
    ) -> Result<Option<RewardRecord>, NodeError> {
        let minted = self
            .registry
            .finalize(&mut self.ledger, &mut self.escrow, dataset, outcome, now)?;
        let stale: Vec<ProposalId> = self
            .voting
            .proposals()
            .filter(|p| p.action.dataset() == Some(dataset) && Some(p.id) != decided_by)
            .map(|p| p.id)
            .collect();
        for id in stale {
            if self.timelock.supersede(&mut self.voting, id)? {
                info!(proposal = %id, %dataset, "open proposal closed with its dataset");
            }
        }
        Ok(minted)
    }

    /// Collect every entity changed since the last call into one write set,
    /// with the matching change events in the same order.
    pub fn drain_changes(&mut self) -> Result<(WriteSet, Vec<ChangeEvent>), StoreError> {
        let mut set = WriteSet::new();
        let mut events = Vec::new();

        let ledger = self.ledger.take_changes();
        for account in ledger.accounts {
            set.put(Table::Accounts, account.id.as_str(), &account)?;
            events.push(ChangeEvent::new(
                EntityType::Account,
                account.id.to_string(),
                EntityState::Account(account),
            ));
        }
        for stake in self.escrow.take_changes() {
            set.put(Table::Stakes, stake.dataset_id.to_key(), &stake)?;
            events.push(ChangeEvent::new(
                EntityType::Stake,
                stake.dataset_id.to_string(),
                EntityState::Stake(stake),
            ));
        }
        for record in self.registry.take_changes() {
            set.put(Table::Datasets, record.id.to_key(), &record)?;
            events.push(ChangeEvent::new(
                EntityType::Dataset,
                record.id.to_string(),
                EntityState::Dataset(record),
            ));
        }
        let (proposals, votes) = self.voting.take_changes();
        for proposal in proposals {
            set.put(Table::Proposals, proposal.id.to_key(), &proposal)?;
            events.push(ChangeEvent::new(
                EntityType::Proposal,
                proposal.id.to_string(),
                EntityState::Proposal(proposal),
            ));
        }
        for vote in votes {
            set.put(Table::Votes, vote_key(vote.proposal_id, &vote.voter), &vote)?;
            events.push(ChangeEvent::new(
                EntityType::Vote,
                format!("{}/{}", vote.proposal_id, vote.voter),
                EntityState::Vote(vote),
            ));
        }
        let timelock = self.timelock.take_changes();
        for scheduled in timelock.upserted {
            set.put(Table::Schedules, scheduled.proposal_id.to_key(), &scheduled)?;
            events.push(ChangeEvent::new(
                EntityType::ScheduledExecution,
                scheduled.proposal_id.to_string(),
                EntityState::ScheduledExecution(scheduled),
            ));
        }
        for id in timelock.removed {
            set.delete(Table::Schedules, id.to_key());
            events.push(ChangeEvent::new(
                EntityType::ScheduledExecution,
                id.to_string(),
                EntityState::Removed,
            ));
        }
        for reward in ledger.rewards {
            set.put(Table::Rewards, reward.id.to_key(), &reward)?;
            events.push(ChangeEvent::new(
                EntityType::Reward,
                reward.id.to_string(),
                EntityState::Reward(reward),
            ));
        }
        if let Some(delegations) = ledger.delegations {
            set.put(Table::Meta, META_DELEGATIONS, &delegations)?;
            events.push(ChangeEvent::new(
                EntityType::Delegations,
                META_DELEGATIONS,
                EntityState::Delegations(delegations),
            ));
        }
        if let Some(roles) = timelock.roles {
            set.put(Table::Meta, META_ROLES, &roles)?;
            events.push(ChangeEvent::new(
                EntityType::Roles,
                META_ROLES,
                EntityState::Roles(roles),
            ));
        }
        if std::mem::take(&mut self.params_dirty) {
            set.put(Table::Meta, META_PARAMS, &self.params)?;
            set.put(Table::Meta, META_TREASURY, self.registry.treasury())?;
            events.push(ChangeEvent::new(
                EntityType::Params,
                META_PARAMS,
                EntityState::Params(self.params.clone()),
            ));
        }
        Ok((set, events))
    }
}
