use crate::error::EscrowError;
use crate::stake::{Stake, StakeResolution};
use daiv_ledger::TokenLedger;
use daiv_types::{AccountId, DatasetId, RejectionReason, Timestamp, TokenAmount};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Holds one stake per dataset. Token movements go through the ledger's
/// escrow holdings so total supply is unaffected.
#[derive(Clone, Debug, Default)]
pub struct StakeEscrow {
    stakes: BTreeMap<DatasetId, Stake>,
    dirty: BTreeSet<DatasetId>,
}

impl StakeEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(stakes: impl IntoIterator<Item = Stake>) -> Self {
        Self {
            stakes: stakes.into_iter().map(|s| (s.dataset_id, s)).collect(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn stake(&self, dataset: DatasetId) -> Option<&Stake> {
        self.stakes.get(&dataset)
    }

    pub fn stakes(&self) -> impl Iterator<Item = &Stake> {
        self.stakes.values()
    }

    /// Sum of all stakes still held.
    pub fn held_total(&self) -> TokenAmount {
        self.stakes
            .values()
            .filter(|s| !s.released())
            .map(|s| s.amount)
            .sum()
    }

    /// Move `amount` from `owner`'s balance into a new escrow entry for `dataset`.
    pub fn deposit(
        &mut self,
        ledger: &mut TokenLedger,
        owner: &AccountId,
        dataset: DatasetId,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<&Stake, EscrowError> {
        if self.stakes.contains_key(&dataset) {
            return Err(EscrowError::AlreadyStaked(dataset));
        }
        ledger.escrow_deposit(owner, amount)?;

        let stake = Stake {
            dataset_id: dataset,
            amount,
            owner: owner.clone(),
            resolution: StakeResolution::Held,
            deposited_at: now,
            resolved_at: None,
        };
        info!(%dataset, %owner, %amount, "stake deposited");
        self.dirty.insert(dataset);
        Ok(self.stakes.entry(dataset).or_insert(stake))
    }

    /// Return the full stake to its owner.
    pub fn release(
        &mut self,
        ledger: &mut TokenLedger,
        dataset: DatasetId,
        now: Timestamp,
    ) -> Result<TokenAmount, EscrowError> {
        let (owner, amount) = self.held(dataset)?;
        ledger.escrow_payout(&owner, amount)?;
        self.resolve(dataset, StakeResolution::Released, now);
        info!(%dataset, %owner, %amount, "stake released");
        Ok(amount)
    }

    /// Forfeit the stake to `treasury`. Only for rejections for cause.
    pub fn slash(
        &mut self,
        ledger: &mut TokenLedger,
        dataset: DatasetId,
        reason: RejectionReason,
        treasury: &AccountId,
        now: Timestamp,
    ) -> Result<TokenAmount, EscrowError> {
        let (_, amount) = self.held(dataset)?;
        if !reason.is_for_cause() {
            return Err(EscrowError::NotForCause { dataset, reason });
        }
        ledger.escrow_payout(treasury, amount)?;
        self.resolve(dataset, StakeResolution::Slashed, now);
        info!(%dataset, %treasury, %amount, ?reason, "stake slashed");
        Ok(amount)
    }

    fn held(&self, dataset: DatasetId) -> Result<(AccountId, TokenAmount), EscrowError> {
        let stake = self
            .stakes
            .get(&dataset)
            .ok_or(EscrowError::NotFound(dataset))?;
        if stake.released() {
            return Err(EscrowError::AlreadyReleased(dataset));
        }
        Ok((stake.owner.clone(), stake.amount))
    }

    fn resolve(&mut self, dataset: DatasetId, resolution: StakeResolution, now: Timestamp) {
        if let Some(stake) = self.stakes.get_mut(&dataset) {
            stake.resolution = resolution;
            stake.resolved_at = Some(now);
            self.dirty.insert(dataset);
        }
    }

    /// Stakes changed since the previous call.
    pub fn take_changes(&mut self) -> Vec<Stake> {
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.stakes.get(&id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daiv_ledger::Minter;
    use daiv_types::ErrorKind;

    fn setup(balance: u128) -> (TokenLedger, StakeEscrow, AccountId) {
        let mut ledger = TokenLedger::new([Minter::Registry], 10);
        let owner = AccountId::new("alice");
        ledger
            .allocate_genesis(&owner, TokenAmount::new(balance), 0)
            .unwrap();
        (ledger, StakeEscrow::new(), owner)
    }

    const DS: DatasetId = DatasetId::new(1);
    const NOW: Timestamp = Timestamp::new(100);

    #[test]
    fn deposit_moves_balance_into_escrow() {
        let (mut ledger, mut escrow, owner) = setup(25);
        escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap();
        assert_eq!(ledger.balance(&owner), TokenAmount::new(15));
        assert_eq!(escrow.held_total(), TokenAmount::new(10));
        assert_eq!(ledger.escrowed(), escrow.held_total());
        assert!(!escrow.stake(DS).unwrap().released());
    }

    #[test]
    fn deposit_without_funds_fails() {
        let (mut ledger, mut escrow, owner) = setup(5);
        let err = escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert!(escrow.stake(DS).is_none());
        assert_eq!(ledger.balance(&owner), TokenAmount::new(5));
    }

    #[test]
    fn second_deposit_for_same_dataset_rejected() {
        let (mut ledger, mut escrow, owner) = setup(50);
        escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap();
        let err = escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(ledger.balance(&owner), TokenAmount::new(40));
    }

    #[test]
    fn release_returns_full_amount_once() {
        let (mut ledger, mut escrow, owner) = setup(10);
        escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap();
        let returned = escrow.release(&mut ledger, DS, NOW).unwrap();
        assert_eq!(returned, TokenAmount::new(10));
        assert_eq!(ledger.balance(&owner), TokenAmount::new(10));

        let err = escrow.release(&mut ledger, DS, NOW).unwrap_err();
        assert_eq!(err, EscrowError::AlreadyReleased(DS));
        assert_eq!(ledger.balance(&owner), TokenAmount::new(10));
    }

    #[test]
    fn release_unknown_stake_is_not_found() {
        let (mut ledger, mut escrow, _) = setup(10);
        let err = escrow.release(&mut ledger, DS, NOW).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn slash_sends_stake_to_treasury() {
        let (mut ledger, mut escrow, owner) = setup(10);
        let treasury = AccountId::new("treasury");
        escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap();
        escrow
            .slash(&mut ledger, DS, RejectionReason::Spam, &treasury, NOW)
            .unwrap();
        assert_eq!(ledger.balance(&owner), TokenAmount::ZERO);
        assert_eq!(ledger.balance(&treasury), TokenAmount::new(10));
        let stake = escrow.stake(DS).unwrap();
        assert!(stake.released() && stake.is_slashed());
    }

    #[test]
    fn slash_requires_rejection_for_cause() {
        let (mut ledger, mut escrow, owner) = setup(10);
        escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap();
        let err = escrow
            .slash(
                &mut ledger,
                DS,
                RejectionReason::Defeated,
                &AccountId::new("treasury"),
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(!escrow.stake(DS).unwrap().released());
    }

    #[test]
    fn released_and_slashed_are_exclusive() {
        let (mut ledger, mut escrow, owner) = setup(10);
        escrow
            .deposit(&mut ledger, &owner, DS, TokenAmount::new(10), NOW)
            .unwrap();
        escrow.release(&mut ledger, DS, NOW).unwrap();
        let err = escrow
            .slash(
                &mut ledger,
                DS,
                RejectionReason::Fraud,
                &AccountId::new("treasury"),
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyReleased);
        assert!(!escrow.stake(DS).unwrap().is_slashed());
    }
}
