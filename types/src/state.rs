//! State enums for dataset records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a dataset record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetStatus {
    /// Submitted with a stake held in escrow; no vote opened yet.
    Staked,
    /// An approval proposal is open or awaiting execution.
    PendingVote,
    /// Admitted into the public registry.
    Approved,
    /// Not admitted; stake returned.
    Rejected,
    /// Rejected for cause; stake forfeited to the treasury.
    Slashed,
}

impl DatasetStatus {
    /// Whether the record has reached a final admission decision.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Slashed)
    }

    /// Whether content with this status blocks a resubmission of the same hash.
    pub fn blocks_duplicate(&self) -> bool {
        matches!(self, Self::Staked | Self::PendingVote | Self::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staked => "staked",
            Self::PendingVote => "pending_vote",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Slashed => "slashed",
        }
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a dataset was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The approval vote reached quorum but did not pass.
    Defeated,
    /// The approval vote did not reach quorum.
    QuorumFailed,
    /// The approval proposal was cancelled before execution.
    Withdrawn,
    /// Governance found the submission to be spam.
    Spam,
    /// Governance found the submission to be fraudulent.
    Fraud,
}

impl RejectionReason {
    /// Rejections for cause forfeit the stake.
    pub fn is_for_cause(&self) -> bool {
        matches!(self, Self::Spam | Self::Fraud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_spam_and_fraud_are_for_cause() {
        assert!(RejectionReason::Spam.is_for_cause());
        assert!(RejectionReason::Fraud.is_for_cause());
        assert!(!RejectionReason::Defeated.is_for_cause());
        assert!(!RejectionReason::QuorumFailed.is_for_cause());
        assert!(!RejectionReason::Withdrawn.is_for_cause());
    }

    #[test]
    fn resolved_records_do_not_block_resubmission_unless_approved() {
        assert!(DatasetStatus::Approved.blocks_duplicate());
        assert!(DatasetStatus::PendingVote.blocks_duplicate());
        assert!(!DatasetStatus::Rejected.blocks_duplicate());
        assert!(!DatasetStatus::Slashed.blocks_duplicate());
    }
}
