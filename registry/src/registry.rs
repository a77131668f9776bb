//! The dataset registry.
//!
//! Ledger and escrow are passed into each call rather than owned, so the
//! caller decides how the three components are locked and persisted together.

use crate::error::RegistryError;
use crate::record::{DatasetRecord, Outcome, Submission};
use daiv_escrow::StakeEscrow;
use daiv_ledger::{MintReason, Minter, RewardRecord, TokenLedger};
use daiv_rewards::{RewardCalculator, RewardSchedule};
use daiv_types::{
    AccountId, ContentHash, DatasetId, DatasetStatus, ProposalId, ProtocolParams, Timestamp,
    TokenAmount,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct DatasetRegistry {
    records: BTreeMap<DatasetId, DatasetRecord>,
    /// Every record ever created for a hash, oldest first.
    by_hash: HashMap<ContentHash, Vec<DatasetId>>,
    next_id: DatasetId,
    calculator: RewardCalculator,
    min_stake: TokenAmount,
    reputation_per_approval: u64,
    reputation_slash_penalty: u64,
    treasury: AccountId,
    dirty: BTreeSet<DatasetId>,
}

impl DatasetRegistry {
    pub fn new(params: &ProtocolParams, treasury: AccountId) -> Self {
        let mut registry = Self {
            records: BTreeMap::new(),
            by_hash: HashMap::new(),
            next_id: DatasetId::new(1),
            calculator: RewardCalculator::default(),
            min_stake: TokenAmount::ZERO,
            reputation_per_approval: 0,
            reputation_slash_penalty: 0,
            treasury,
            dirty: BTreeSet::new(),
        };
        registry.apply_params(params);
        registry
    }

    /// Rebuild from persisted records.
    pub fn restore(
        records: impl IntoIterator<Item = DatasetRecord>,
        params: &ProtocolParams,
        treasury: AccountId,
    ) -> Self {
        let mut registry = Self::new(params, treasury);
        for record in records {
            registry
                .by_hash
                .entry(record.content_hash)
                .or_default()
                .push(record.id);
            if record.id >= registry.next_id {
                registry.next_id = record.id.next();
            }
            registry.records.insert(record.id, record);
        }
        for ids in registry.by_hash.values_mut() {
            ids.sort();
        }
        registry
    }

    /// Pick up governed reward, stake and reputation values.
    /// Base rewards already computed for existing records are unchanged.
    pub fn apply_params(&mut self, params: &ProtocolParams) {
        self.calculator = RewardCalculator::new(RewardSchedule::from_params(params));
        self.min_stake = params.min_stake_amount();
        self.reputation_per_approval = params.reputation_per_approval;
        self.reputation_slash_penalty = params.reputation_slash_penalty;
    }

    pub fn calculator(&self) -> &RewardCalculator {
        &self.calculator
    }

    pub fn treasury(&self) -> &AccountId {
        &self.treasury
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn record(&self, id: DatasetId) -> Option<&DatasetRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &DatasetRecord> {
        self.records.values()
    }

    pub fn status(&self, id: DatasetId) -> Result<DatasetStatus, RegistryError> {
        self.get(id).map(|r| r.status)
    }

    /// The most recent record for `hash`.
    pub fn find_by_hash(&self, hash: &ContentHash) -> Option<&DatasetRecord> {
        self.by_hash
            .get(hash)
            .and_then(|ids| ids.last())
            .and_then(|id| self.records.get(id))
    }

    fn get(&self, id: DatasetId) -> Result<&DatasetRecord, RegistryError> {
        self.records.get(&id).ok_or(RegistryError::NotFound(id))
    }

    fn blocking_record(&self, hash: &ContentHash) -> Option<DatasetId> {
        self.by_hash.get(hash)?.iter().copied().find(|id| {
            self.records
                .get(id)
                .is_some_and(|r| r.status.blocks_duplicate())
        })
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// Create a Staked record and move the stake into escrow.
    pub fn submit(
        &mut self,
        ledger: &mut TokenLedger,
        escrow: &mut StakeEscrow,
        submission: Submission,
        now: Timestamp,
    ) -> Result<DatasetId, RegistryError> {
        if !submission.contributor.is_valid() {
            return Err(RegistryError::InvalidContributor(
                submission.contributor.to_string(),
            ));
        }
        if let Some(existing) = self.blocking_record(&submission.content_hash) {
            return Err(RegistryError::DuplicateContent {
                hash: submission.content_hash,
                existing,
            });
        }
        if submission.stake < self.min_stake {
            return Err(RegistryError::StakeBelowMinimum {
                stake: submission.stake.raw(),
                minimum: self.min_stake.raw(),
            });
        }

        let id = self.next_id;
        escrow.deposit(ledger, &submission.contributor, id, submission.stake, now)?;

        let base_reward = self
            .calculator
            .base_reward(submission.size_bytes, submission.metadata_fields_filled);
        let record = DatasetRecord {
            id,
            contributor: submission.contributor,
            content_hash: submission.content_hash,
            size_bytes: submission.size_bytes,
            metadata_fields_filled: submission.metadata_fields_filled,
            metadata: submission.metadata,
            status: DatasetStatus::Staked,
            base_reward,
            total_rewards_paid: TokenAmount::ZERO,
            created_at: now,
            usage_baseline: 0,
            rejection: None,
            proposal_id: None,
            resolved_at: None,
        };
        info!(
            dataset = %id,
            contributor = %record.contributor,
            hash = %record.content_hash,
            %base_reward,
            "dataset submitted"
        );
        self.by_hash.entry(record.content_hash).or_default().push(id);
        self.records.insert(id, record);
        self.next_id = id.next();
        self.dirty.insert(id);
        Ok(id)
    }

    /// Fails unless the dataset can have an approval vote opened.
    pub fn check_open_for_vote(&self, id: DatasetId) -> Result<(), RegistryError> {
        let record = self.get(id)?;
        if record.status != DatasetStatus::Staked {
            return Err(RegistryError::InvalidTransition {
                id,
                status: record.status,
                operation: "open a vote on",
            });
        }
        Ok(())
    }

    /// Staked → PendingVote, linked to its approval proposal.
    pub fn open_for_vote(&mut self, id: DatasetId, proposal: ProposalId) -> Result<(), RegistryError> {
        self.check_open_for_vote(id)?;
        if let Some(record) = self.records.get_mut(&id) {
            record.status = DatasetStatus::PendingVote;
            record.proposal_id = Some(proposal);
            self.dirty.insert(id);
            info!(dataset = %id, %proposal, "dataset pending vote");
        }
        Ok(())
    }

    /// Apply the final admission decision.
    ///
    /// Approval requires an open vote; rejection works from Staked or
    /// PendingVote. Returns the base reward record on approval.
    pub fn finalize(
        &mut self,
        ledger: &mut TokenLedger,
        escrow: &mut StakeEscrow,
        id: DatasetId,
        outcome: Outcome,
        now: Timestamp,
    ) -> Result<Option<RewardRecord>, RegistryError> {
        let record = self.get(id)?;
        let allowed = match outcome {
            Outcome::Approved => record.status == DatasetStatus::PendingVote,
            Outcome::Rejected(_) => !record.status.is_resolved(),
        };
        if !allowed {
            return Err(RegistryError::InvalidTransition {
                id,
                status: record.status,
                operation: "finalize",
            });
        }
        let contributor = record.contributor.clone();
        let base_reward = record.base_reward;

        let (status, rejection, minted) = match outcome {
            Outcome::Approved => {
                escrow.release(ledger, id, now)?;
                let minted = ledger.mint(
                    &contributor,
                    base_reward,
                    &Minter::Registry,
                    MintReason::Base { dataset: id },
                    now,
                )?;
                ledger.record_approval(&contributor, self.reputation_per_approval)?;
                (DatasetStatus::Approved, None, Some(minted))
            }
            Outcome::Rejected(reason) if reason.is_for_cause() => {
                escrow.slash(ledger, id, reason, &self.treasury, now)?;
                let penalty = i64::try_from(self.reputation_slash_penalty).unwrap_or(i64::MAX);
                ledger.adjust_reputation(&contributor, -penalty)?;
                (DatasetStatus::Slashed, Some(reason), None)
            }
            Outcome::Rejected(reason) => {
                escrow.release(ledger, id, now)?;
                (DatasetStatus::Rejected, Some(reason), None)
            }
        };

        if let Some(record) = self.records.get_mut(&id) {
            record.status = status;
            record.rejection = rejection;
            record.resolved_at = Some(now);
            if let Some(m) = &minted {
                record.total_rewards_paid = record.total_rewards_paid.saturating_add(m.amount);
            }
        }
        self.dirty.insert(id);
        info!(dataset = %id, %status, ?rejection, "dataset finalized");
        Ok(minted)
    }

    /// Pay the retroactive reward for downloads above the charged baseline.
    ///
    /// `cumulative_downloads` is the external counter's running total. When
    /// the delta earns nothing the baseline is left in place so small deltas
    /// accumulate.
    pub fn record_usage(
        &mut self,
        ledger: &mut TokenLedger,
        id: DatasetId,
        cumulative_downloads: u64,
        now: Timestamp,
    ) -> Result<Option<RewardRecord>, RegistryError> {
        let record = self.get(id)?;
        if record.status != DatasetStatus::Approved {
            return Err(RegistryError::InvalidTransition {
                id,
                status: record.status,
                operation: "record usage for",
            });
        }
        let baseline = record.usage_baseline;
        if cumulative_downloads < baseline {
            return Err(RegistryError::UsageRegression {
                baseline,
                reported: cumulative_downloads,
            });
        }
        let delta = cumulative_downloads - baseline;
        let reward = self.calculator.retroactive_reward(delta);
        if reward.is_zero() {
            debug!(dataset = %id, delta, "usage delta earns nothing yet");
            return Ok(None);
        }

        let contributor = record.contributor.clone();
        let minted = ledger.mint(
            &contributor,
            reward,
            &Minter::Registry,
            MintReason::Retroactive { dataset: id },
            now,
        )?;
        if let Some(record) = self.records.get_mut(&id) {
            record.usage_baseline = cumulative_downloads;
            record.total_rewards_paid = record.total_rewards_paid.saturating_add(reward);
        }
        self.dirty.insert(id);
        info!(dataset = %id, delta, %reward, "retroactive reward paid");
        Ok(Some(minted))
    }

    /// Records changed since the previous call.
    pub fn take_changes(&mut self) -> Vec<DatasetRecord> {
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.records.get(&id).cloned())
            .collect()
    }
}
