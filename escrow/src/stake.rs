//! Escrowed stakes.

use daiv_types::{AccountId, DatasetId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// How a stake left escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeResolution {
    /// Still in escrow.
    Held,
    /// Returned to the owner.
    Released,
    /// Forfeited to the treasury.
    Slashed,
}

/// A deposit held against one dataset submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub dataset_id: DatasetId,
    pub amount: TokenAmount,
    pub owner: AccountId,
    pub resolution: StakeResolution,
    pub deposited_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Stake {
    /// Whether the stake has left escrow, by release or slash.
    pub fn released(&self) -> bool {
        self.resolution != StakeResolution::Held
    }

    pub fn is_slashed(&self) -> bool {
        self.resolution == StakeResolution::Slashed
    }
}
