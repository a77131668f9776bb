//! Per-account state.

use daiv_types::{AccountId, TokenAmount};
use serde::{Deserialize, Serialize};

/// An account, created on first interaction and never destroyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub token_balance: TokenAmount,
    /// Own governance weight, before delegation.
    pub voting_power: u64,
    pub reputation_score: u64,
    /// Number of this account's datasets admitted to the registry.
    pub datasets_approved: u64,
    /// Lifetime minted rewards received.
    pub total_earned: TokenAmount,
}

impl Account {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            token_balance: TokenAmount::ZERO,
            voting_power: 0,
            reputation_score: 0,
            datasets_approved: 0,
            total_earned: TokenAmount::ZERO,
        }
    }
}
