//! The token ledger: balances, minting, escrow holdings and voting power.
//!
//! Every mutating method validates first and only then touches state, so a
//! failed call leaves the ledger exactly as it was.

use crate::account::Account;
use crate::delegation::{DelegationGraph, DelegationSnapshot};
use crate::error::LedgerError;
use crate::mint::{MintReason, Minter, RewardRecord};
use daiv_types::{AccountId, RewardId, Timestamp, TokenAmount};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Entities modified since the last [`TokenLedger::take_changes`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerChanges {
    pub accounts: Vec<Account>,
    pub rewards: Vec<RewardRecord>,
    /// Present when the delegation graph changed.
    pub delegations: Option<DelegationSnapshot>,
}

impl LedgerChanges {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.rewards.is_empty() && self.delegations.is_none()
    }
}

/// Running totals over the reward log. The records themselves live in
/// storage; the ledger only keeps what new mints need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardTotals {
    pub next_id: RewardId,
    pub minted: TokenAmount,
}

impl Default for RewardTotals {
    fn default() -> Self {
        Self {
            next_id: RewardId::new(1),
            minted: TokenAmount::ZERO,
        }
    }
}

impl RewardTotals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RewardRecord>) -> Self {
        records.into_iter().fold(Self::default(), |totals, r| Self {
            next_id: if r.id >= totals.next_id {
                r.id.next()
            } else {
                totals.next_id
            },
            minted: totals.minted.saturating_add(r.amount),
        })
    }
}

/// Persisted ledger state, used to rebuild a [`TokenLedger`] on startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub rewards: RewardTotals,
    /// Sum of unresolved stakes, recomputed from the escrow on load.
    pub escrowed: TokenAmount,
    pub delegations: DelegationSnapshot,
}

#[derive(Clone, Debug)]
pub struct TokenLedger {
    accounts: BTreeMap<AccountId, Account>,
    minters: BTreeSet<Minter>,
    next_reward_id: RewardId,
    total_minted: TokenAmount,
    escrowed: TokenAmount,
    delegation: DelegationGraph,

    dirty_accounts: BTreeSet<AccountId>,
    /// Mints not yet handed out by `take_changes`.
    new_rewards: Vec<RewardRecord>,
    delegation_dirty: bool,
}

impl TokenLedger {
    /// An empty ledger that accepts mints from `minters`.
    pub fn new(minters: impl IntoIterator<Item = Minter>, max_delegation_depth: usize) -> Self {
        Self {
            accounts: BTreeMap::new(),
            minters: minters.into_iter().collect(),
            next_reward_id: RewardId::new(1),
            total_minted: TokenAmount::ZERO,
            escrowed: TokenAmount::ZERO,
            delegation: DelegationGraph::new(max_delegation_depth),
            dirty_accounts: BTreeSet::new(),
            new_rewards: Vec::new(),
            delegation_dirty: false,
        }
    }

    /// Rebuild from persisted state. Nothing is marked dirty.
    pub fn restore(
        snapshot: LedgerSnapshot,
        minters: impl IntoIterator<Item = Minter>,
        max_delegation_depth: usize,
    ) -> Self {
        let mut ledger = Self::new(minters, max_delegation_depth);
        ledger.accounts = snapshot
            .accounts
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        ledger.next_reward_id = snapshot.rewards.next_id;
        ledger.total_minted = snapshot.rewards.minted;
        ledger.escrowed = snapshot.escrowed;
        ledger.delegation = DelegationGraph::from_snapshot(snapshot.delegations, max_delegation_depth);
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: self.accounts.values().cloned().collect(),
            rewards: RewardTotals {
                next_id: self.next_reward_id,
                minted: self.total_minted,
            },
            escrowed: self.escrowed,
            delegations: self.delegation.snapshot(),
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Balance of `id`; zero for accounts never seen.
    pub fn balance(&self, id: &AccountId) -> TokenAmount {
        self.accounts
            .get(id)
            .map(|a| a.token_balance)
            .unwrap_or(TokenAmount::ZERO)
    }

    pub fn is_minter(&self, minter: &Minter) -> bool {
        self.minters.contains(minter)
    }

    /// Mint records produced since the last `take_changes`.
    pub fn new_rewards(&self) -> &[RewardRecord] {
        &self.new_rewards
    }

    /// Tokens currently held in escrow.
    pub fn escrowed(&self) -> TokenAmount {
        self.escrowed
    }

    /// All balances plus escrow holdings.
    pub fn total_supply(&self) -> TokenAmount {
        self.accounts
            .values()
            .map(|a| a.token_balance)
            .sum::<TokenAmount>()
            .saturating_add(self.escrowed)
    }

    /// Sum of all minted rewards and grants.
    pub fn total_minted(&self) -> TokenAmount {
        self.total_minted
    }

    pub fn delegation(&self) -> &DelegationGraph {
        &self.delegation
    }

    /// Own power unless delegated away, plus power delegated here.
    pub fn effective_voting_power(&self, id: &AccountId) -> u64 {
        self.delegation.effective_power(id, |a| {
            self.accounts.get(a).map(|acc| acc.voting_power).unwrap_or(0)
        })
    }

    /// Each account whose power a vote by `id` carries, with that power.
    pub fn voting_power_sources(&self, id: &AccountId) -> Vec<(AccountId, u64)> {
        self.delegation
            .power_sources(id)
            .into_iter()
            .map(|a| {
                let power = self.accounts.get(&a).map(|acc| acc.voting_power).unwrap_or(0);
                (a, power)
            })
            .collect()
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Create the account if it does not exist yet.
    pub fn ensure_account(&mut self, id: &AccountId) -> Result<&mut Account, LedgerError> {
        if !id.is_valid() {
            return Err(LedgerError::InvalidAccount(id.to_string()));
        }
        self.dirty_accounts.insert(id.clone());
        Ok(self
            .accounts
            .entry(id.clone())
            .or_insert_with(|| Account::new(id.clone())))
    }

    /// Initial allocation, applied once when the store is empty.
    pub fn allocate_genesis(
        &mut self,
        id: &AccountId,
        balance: TokenAmount,
        voting_power: u64,
    ) -> Result<(), LedgerError> {
        let current = self.balance(id);
        let new_balance = current.checked_add(balance).ok_or(LedgerError::Overflow)?;
        let account = self.ensure_account(id)?;
        account.token_balance = new_balance;
        account.voting_power = voting_power;
        info!(account = %id, %balance, voting_power, "genesis allocation");
        Ok(())
    }

    /// Move `amount` from `from` to `to`. Both balances change or neither does.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if !to.is_valid() {
            return Err(LedgerError::InvalidAccount(to.to_string()));
        }
        let from_balance = self.balance(from);
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount.raw(),
                available: from_balance.raw(),
            })?;
        if from == to {
            return Ok(());
        }
        let new_to = self
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.ensure_account(from)?.token_balance = new_from;
        self.ensure_account(to)?.token_balance = new_to;
        debug!(%from, %to, %amount, "transfer");
        Ok(())
    }

    /// Mint new tokens to `to`. Only registered minters, and only for the
    /// reasons their role covers.
    pub fn mint(
        &mut self,
        to: &AccountId,
        amount: TokenAmount,
        minter: &Minter,
        reason: MintReason,
        now: Timestamp,
    ) -> Result<RewardRecord, LedgerError> {
        if !self.minters.contains(minter) || !reason.permits(minter) {
            return Err(LedgerError::Unauthorized(minter.to_string()));
        }
        if !to.is_valid() {
            return Err(LedgerError::InvalidAccount(to.to_string()));
        }
        let current = self.accounts.get(to);
        let new_balance = current
            .map(|a| a.token_balance)
            .unwrap_or(TokenAmount::ZERO)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let new_earned = current
            .map(|a| a.total_earned)
            .unwrap_or(TokenAmount::ZERO)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        let account = self.ensure_account(to)?;
        account.token_balance = new_balance;
        account.total_earned = new_earned;

        let record = RewardRecord {
            id: self.next_reward_id,
            recipient: to.clone(),
            amount,
            reason,
            minted_at: now,
        };
        self.next_reward_id = self.next_reward_id.next();
        self.total_minted = self.total_minted.saturating_add(amount);
        self.new_rewards.push(record.clone());
        info!(recipient = %to, %amount, %minter, reward = %record.id, "minted");
        Ok(record)
    }

    /// Move `amount` out of `owner`'s balance into escrow holdings.
    pub fn escrow_deposit(&mut self, owner: &AccountId, amount: TokenAmount) -> Result<(), LedgerError> {
        let available = self.balance(owner);
        let new_balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount.raw(),
                available: available.raw(),
            })?;
        let new_escrowed = self
            .escrowed
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.ensure_account(owner)?.token_balance = new_balance;
        self.escrowed = new_escrowed;
        Ok(())
    }

    /// Pay `amount` out of escrow holdings to `to`.
    pub fn escrow_payout(&mut self, to: &AccountId, amount: TokenAmount) -> Result<(), LedgerError> {
        let new_escrowed = self
            .escrowed
            .checked_sub(amount)
            .ok_or(LedgerError::EscrowShortfall {
                held: self.escrowed.raw(),
                requested: amount.raw(),
            })?;
        let new_balance = self
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.ensure_account(to)?.token_balance = new_balance;
        self.escrowed = new_escrowed;
        Ok(())
    }

    pub fn set_voting_power(&mut self, id: &AccountId, power: u64) -> Result<(), LedgerError> {
        self.ensure_account(id)?.voting_power = power;
        Ok(())
    }

    /// Add or remove reputation. Never drops below zero.
    pub fn adjust_reputation(&mut self, id: &AccountId, delta: i64) -> Result<u64, LedgerError> {
        let account = self.ensure_account(id)?;
        account.reputation_score = if delta >= 0 {
            account.reputation_score.saturating_add(delta as u64)
        } else {
            account.reputation_score.saturating_sub(delta.unsigned_abs())
        };
        Ok(account.reputation_score)
    }

    /// Count an admitted dataset and grant the approval reputation.
    pub fn record_approval(&mut self, id: &AccountId, reputation: u64) -> Result<(), LedgerError> {
        let account = self.ensure_account(id)?;
        account.datasets_approved = account.datasets_approved.saturating_add(1);
        account.reputation_score = account.reputation_score.saturating_add(reputation);
        Ok(())
    }

    pub fn delegate(&mut self, from: &AccountId, to: &AccountId) -> Result<(), LedgerError> {
        if !from.is_valid() {
            return Err(LedgerError::InvalidAccount(from.to_string()));
        }
        if !to.is_valid() {
            return Err(LedgerError::InvalidAccount(to.to_string()));
        }
        self.delegation.delegate(from, to)?;
        self.delegation_dirty = true;
        info!(%from, %to, "delegated voting power");
        Ok(())
    }

    pub fn undelegate(&mut self, from: &AccountId) {
        if self.delegation.delegate_of(from).is_some() {
            self.delegation.undelegate(from);
            self.delegation_dirty = true;
            info!(%from, "removed delegation");
        }
    }

    pub fn set_max_delegation_depth(&mut self, depth: usize) {
        self.delegation.set_max_depth(depth);
    }

    /// Entities changed since the previous call.
    pub fn take_changes(&mut self) -> LedgerChanges {
        let accounts = std::mem::take(&mut self.dirty_accounts)
            .into_iter()
            .filter_map(|id| self.accounts.get(&id).cloned())
            .collect();
        let rewards = std::mem::take(&mut self.new_rewards);
        let delegations = if std::mem::take(&mut self.delegation_dirty) {
            Some(self.delegation.snapshot())
        } else {
            None
        };
        LedgerChanges {
            accounts,
            rewards,
            delegations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daiv_types::{DatasetId, ProposalId};

    fn acct(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn ledger() -> TokenLedger {
        TokenLedger::new([Minter::Registry, Minter::Timelock], 10)
    }

    fn funded(name: &str, amount: u128) -> TokenLedger {
        let mut l = ledger();
        l.allocate_genesis(&acct(name), TokenAmount::new(amount), 0)
            .unwrap();
        l
    }

    #[test]
    fn unknown_account_has_zero_balance() {
        assert_eq!(ledger().balance(&acct("nobody")), TokenAmount::ZERO);
    }

    #[test]
    fn transfer_moves_balance() {
        let mut l = funded("alice", 100);
        l.transfer(&acct("alice"), &acct("bob"), TokenAmount::new(40))
            .unwrap();
        assert_eq!(l.balance(&acct("alice")), TokenAmount::new(60));
        assert_eq!(l.balance(&acct("bob")), TokenAmount::new(40));
    }

    #[test]
    fn failed_transfer_changes_nothing() {
        let mut l = funded("alice", 10);
        let before = l.snapshot();
        let err = l
            .transfer(&acct("alice"), &acct("bob"), TokenAmount::new(11))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                needed: 11,
                available: 10
            }
        );
        assert_eq!(l.snapshot(), before);
        assert!(l.account(&acct("bob")).is_none());
    }

    #[test]
    fn transfer_to_invalid_account_rejected() {
        let mut l = funded("alice", 10);
        let err = l
            .transfer(&acct("alice"), &acct(""), TokenAmount::new(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccount(_)));
        assert_eq!(l.balance(&acct("alice")), TokenAmount::new(10));
    }

    #[test]
    fn registry_mints_base_reward() {
        let mut l = ledger();
        let rec = l
            .mint(
                &acct("carol"),
                TokenAmount::new(95),
                &Minter::Registry,
                MintReason::Base {
                    dataset: DatasetId::new(1),
                },
                Timestamp::new(10),
            )
            .unwrap();
        assert_eq!(rec.id, RewardId::new(1));
        assert_eq!(l.balance(&acct("carol")), TokenAmount::new(95));
        assert_eq!(
            l.account(&acct("carol")).unwrap().total_earned,
            TokenAmount::new(95)
        );
        assert_eq!(l.new_rewards().len(), 1);
    }

    #[test]
    fn arbitrary_account_cannot_mint() {
        let mut l = ledger();
        let err = l
            .mint(
                &acct("mallory"),
                TokenAmount::new(1_000),
                &Minter::Account(acct("mallory")),
                MintReason::Grant {
                    proposal: ProposalId::new(1),
                },
                Timestamp::EPOCH,
            )
            .unwrap_err();
        assert_eq!(err.kind(), daiv_types::ErrorKind::Unauthorized);
        assert_eq!(l.total_supply(), TokenAmount::ZERO);
        assert!(l.new_rewards().is_empty());
    }

    #[test]
    fn registry_cannot_mint_grants() {
        let mut l = ledger();
        let err = l
            .mint(
                &acct("x"),
                TokenAmount::new(1),
                &Minter::Registry,
                MintReason::Grant {
                    proposal: ProposalId::new(1),
                },
                Timestamp::EPOCH,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }

    #[test]
    fn unregistered_timelock_cannot_mint() {
        let mut l = TokenLedger::new([Minter::Registry], 10);
        let res = l.mint(
            &acct("x"),
            TokenAmount::new(1),
            &Minter::Timelock,
            MintReason::Grant {
                proposal: ProposalId::new(1),
            },
            Timestamp::EPOCH,
        );
        assert!(res.is_err());
    }

    #[test]
    fn mint_overflow_rejected_before_mutation() {
        let mut l = funded("whale", u128::MAX);
        let err = l
            .mint(
                &acct("whale"),
                TokenAmount::new(1),
                &Minter::Registry,
                MintReason::Base {
                    dataset: DatasetId::new(1),
                },
                Timestamp::EPOCH,
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::Overflow);
        assert!(l.new_rewards().is_empty());
    }

    #[test]
    fn escrow_keeps_supply_constant() {
        let mut l = funded("alice", 50);
        l.escrow_deposit(&acct("alice"), TokenAmount::new(10)).unwrap();
        assert_eq!(l.balance(&acct("alice")), TokenAmount::new(40));
        assert_eq!(l.escrowed(), TokenAmount::new(10));
        assert_eq!(l.total_supply(), TokenAmount::new(50));

        l.escrow_payout(&acct("treasury"), TokenAmount::new(10)).unwrap();
        assert_eq!(l.escrowed(), TokenAmount::ZERO);
        assert_eq!(l.total_supply(), TokenAmount::new(50));
    }

    #[test]
    fn escrow_payout_beyond_holdings_rejected() {
        let mut l = funded("alice", 50);
        l.escrow_deposit(&acct("alice"), TokenAmount::new(5)).unwrap();
        let err = l
            .escrow_payout(&acct("alice"), TokenAmount::new(6))
            .unwrap_err();
        assert!(matches!(err, LedgerError::EscrowShortfall { .. }));
        assert_eq!(l.balance(&acct("alice")), TokenAmount::new(45));
    }

    #[test]
    fn reputation_saturates_at_zero() {
        let mut l = ledger();
        l.adjust_reputation(&acct("a"), 20).unwrap();
        assert_eq!(l.adjust_reputation(&acct("a"), -50).unwrap(), 0);
    }

    #[test]
    fn delegated_power_moves_to_delegate() {
        let mut l = ledger();
        l.set_voting_power(&acct("a"), 700).unwrap();
        l.set_voting_power(&acct("b"), 300).unwrap();
        l.delegate(&acct("a"), &acct("b")).unwrap();
        assert_eq!(l.effective_voting_power(&acct("b")), 1_000);
        assert_eq!(l.effective_voting_power(&acct("a")), 0);
        l.undelegate(&acct("a"));
        assert_eq!(l.effective_voting_power(&acct("a")), 700);
    }

    #[test]
    fn take_changes_reports_touched_entities_once() {
        let mut l = funded("alice", 10);
        l.take_changes();
        l.transfer(&acct("alice"), &acct("bob"), TokenAmount::new(3))
            .unwrap();
        l.delegate(&acct("alice"), &acct("bob")).unwrap();
        let changes = l.take_changes();
        assert_eq!(changes.accounts.len(), 2);
        assert!(changes.delegations.is_some());
        assert!(l.take_changes().is_empty());
    }

    #[test]
    fn restore_continues_reward_ids() {
        let mut l = ledger();
        l.mint(
            &acct("c"),
            TokenAmount::new(5),
            &Minter::Registry,
            MintReason::Retroactive {
                dataset: DatasetId::new(2),
            },
            Timestamp::EPOCH,
        )
        .unwrap();
        let mut restored =
            TokenLedger::restore(l.snapshot(), [Minter::Registry, Minter::Timelock], 10);
        assert!(restored.take_changes().is_empty());
        let rec = restored
            .mint(
                &acct("c"),
                TokenAmount::new(5),
                &Minter::Registry,
                MintReason::Retroactive {
                    dataset: DatasetId::new(2),
                },
                Timestamp::EPOCH,
            )
            .unwrap();
        assert_eq!(rec.id, RewardId::new(2));
        assert_eq!(restored.balance(&acct("c")), TokenAmount::new(10));
        assert_eq!(restored.total_minted(), TokenAmount::new(10));
    }

    #[test]
    fn reward_log_is_handed_off_not_kept() {
        let mut l = ledger();
        for dataset in 1..=3 {
            l.mint(
                &acct("c"),
                TokenAmount::new(4),
                &Minter::Registry,
                MintReason::Base {
                    dataset: DatasetId::new(dataset),
                },
                Timestamp::EPOCH,
            )
            .unwrap();
        }
        let drained = l.take_changes().rewards;
        assert_eq!(drained.len(), 3);
        assert!(l.new_rewards().is_empty());
        assert_eq!(l.total_minted(), TokenAmount::new(12));

        let totals = RewardTotals::from_records(&drained);
        assert_eq!(totals.next_id, RewardId::new(4));
        assert_eq!(totals.minted, TokenAmount::new(12));
        assert_eq!(l.snapshot().rewards, totals);
    }
}
