//! Minting roles and the reward log.

use daiv_types::{AccountId, DatasetId, ProposalId, RewardId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is asking to mint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Minter {
    /// The dataset registry, paying computed rewards.
    Registry,
    /// The timelock, executing a governance-approved grant.
    Timelock,
    /// Any other caller. Never on the minter list.
    Account(AccountId),
}

impl fmt::Display for Minter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => f.write_str("registry"),
            Self::Timelock => f.write_str("timelock"),
            Self::Account(id) => write!(f, "account {id}"),
        }
    }
}

/// Why tokens are being minted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintReason {
    /// Base reward for an approved dataset.
    Base { dataset: DatasetId },
    /// Usage-based reward for an approved dataset.
    Retroactive { dataset: DatasetId },
    /// Grant from an executed parameter-change proposal.
    Grant { proposal: ProposalId },
}

impl MintReason {
    /// Whether `minter` may mint for this reason.
    pub fn permits(&self, minter: &Minter) -> bool {
        match self {
            Self::Base { .. } | Self::Retroactive { .. } => *minter == Minter::Registry,
            Self::Grant { .. } => *minter == Minter::Timelock,
        }
    }

    pub fn dataset(&self) -> Option<DatasetId> {
        match self {
            Self::Base { dataset } | Self::Retroactive { dataset } => Some(*dataset),
            Self::Grant { .. } => None,
        }
    }
}

/// One append-only entry per mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: RewardId,
    pub recipient: AccountId,
    pub amount: TokenAmount,
    pub reason: MintReason,
    pub minted_at: Timestamp,
}
