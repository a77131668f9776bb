//! Governance proposals, their actions and votes.

use crate::params::GovernableParam;
use daiv_types::{AccountId, DatasetId, ProposalId, RejectionReason, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Accepting votes until the deadline.
    Active,
    /// Quorum met and more power for than against.
    Succeeded,
    /// Quorum met but not passed; ties land here.
    Defeated,
    /// Too little voting power cast.
    QuorumFailed,
    /// Scheduled in the timelock.
    Queued,
    Executed,
    Cancelled,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Succeeded => "succeeded",
            Self::Defeated => "defeated",
            Self::QuorumFailed => "quorum_failed",
            Self::Queued => "queued",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Outcome recorded by the tally, if one exists.
    ///
    /// Queued and Executed proposals passed, so their outcome is Succeeded.
    pub fn tally_outcome(&self) -> Option<ProposalStatus> {
        match self {
            Self::Succeeded | Self::Queued | Self::Executed => Some(Self::Succeeded),
            Self::Defeated => Some(Self::Defeated),
            Self::QuorumFailed => Some(Self::QuorumFailed),
            Self::Active | Self::Cancelled => None,
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    DatasetApproval,
    ParameterChange,
    PolicyChange,
}

impl ProposalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatasetApproval => "dataset_approval",
            Self::ParameterChange => "parameter_change",
            Self::PolicyChange => "policy_change",
        }
    }
}

/// Changes to protocol parameters or the token supply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterAction {
    SetParam { param: GovernableParam, value: u64 },
    /// Mint a grant through the timelock.
    MintGrant {
        recipient: AccountId,
        amount: TokenAmount,
    },
}

/// Slashing, executor-set changes and non-binding signals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyAction {
    /// Reject a dataset for cause and forfeit its stake.
    SlashDataset {
        dataset_id: DatasetId,
        reason: RejectionReason,
    },
    AddExecutor { account: AccountId },
    RemoveExecutor { account: AccountId },
    /// Records the community's position; executing it changes nothing.
    Signal { summary: String },
}

/// What a proposal does when executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    DatasetApproval { dataset_id: DatasetId },
    ParameterChange(ParameterAction),
    PolicyChange(PolicyAction),
}

impl ProposalAction {
    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::DatasetApproval { .. } => ProposalKind::DatasetApproval,
            Self::ParameterChange(_) => ProposalKind::ParameterChange,
            Self::PolicyChange(_) => ProposalKind::PolicyChange,
        }
    }

    /// The dataset this proposal decides on, if any.
    pub fn dataset(&self) -> Option<DatasetId> {
        match self {
            Self::DatasetApproval { dataset_id }
            | Self::PolicyChange(PolicyAction::SlashDataset { dataset_id, .. }) => {
                Some(*dataset_id)
            }
            _ => None,
        }
    }

    /// Stable identifier of the proposal's subject.
    pub fn subject_id(&self) -> String {
        match self {
            Self::DatasetApproval { dataset_id } => dataset_id.to_string(),
            Self::ParameterChange(ParameterAction::SetParam { param, .. }) => param.to_string(),
            Self::ParameterChange(ParameterAction::MintGrant { recipient, .. }) => {
                recipient.to_string()
            }
            Self::PolicyChange(PolicyAction::SlashDataset { dataset_id, .. }) => {
                dataset_id.to_string()
            }
            Self::PolicyChange(PolicyAction::AddExecutor { account })
            | Self::PolicyChange(PolicyAction::RemoveExecutor { account }) => account.to_string(),
            Self::PolicyChange(PolicyAction::Signal { .. }) => "signal".to_string(),
        }
    }

    /// Shape checks that need no protocol state.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::DatasetApproval { .. } => Ok(()),
            Self::ParameterChange(ParameterAction::SetParam { param, value }) => {
                param.validate(*value).map_err(|e| e.to_string())
            }
            Self::ParameterChange(ParameterAction::MintGrant { recipient, amount }) => {
                if !recipient.is_valid() {
                    Err(format!("invalid grant recipient {recipient:?}"))
                } else if amount.is_zero() {
                    Err("grant amount must be positive".to_string())
                } else {
                    Ok(())
                }
            }
            Self::PolicyChange(PolicyAction::SlashDataset { reason, .. }) => {
                if reason.is_for_cause() {
                    Ok(())
                } else {
                    Err(format!("{reason:?} is not a reason to slash"))
                }
            }
            Self::PolicyChange(PolicyAction::AddExecutor { account })
            | Self::PolicyChange(PolicyAction::RemoveExecutor { account }) => {
                if account.is_valid() {
                    Ok(())
                } else {
                    Err(format!("invalid executor account {account:?}"))
                }
            }
            Self::PolicyChange(PolicyAction::Signal { .. }) => Ok(()),
        }
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub title: String,
    pub description: String,
    pub action: ProposalAction,
    pub votes_for: u128,
    pub votes_against: u128,
    pub votes_abstain: u128,
    /// For + against + abstain.
    pub total_voting_power_cast: u128,
    pub voter_count: u32,
    /// Snapshotted from params when the proposal opened.
    pub quorum_threshold: u64,
    pub opened_at: Timestamp,
    pub voting_deadline: Timestamp,
    pub status: ProposalStatus,
}

/// Optional criteria for listing proposals. Unset fields match all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub kind: Option<ProposalKind>,
}

impl ProposalFilter {
    pub fn matches(&self, proposal: &Proposal) -> bool {
        self.status.map_or(true, |s| s == proposal.status)
            && self.kind.map_or(true, |k| k == proposal.kind())
    }
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        self.action.kind()
    }

    pub fn quorum_reached(&self) -> bool {
        self.total_voting_power_cast >= u128::from(self.quorum_threshold)
    }

    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        self.status == ProposalStatus::Active && now < self.voting_deadline
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

/// A recorded vote. Immutable once cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: ProposalId,
    pub voter: AccountId,
    pub choice: VoteChoice,
    /// Effective voting power at cast time.
    pub weight: u64,
    /// Accounts whose power `weight` carries, the voter included.
    #[serde(default)]
    pub covered: Vec<AccountId>,
    pub cast_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_requires_cause() {
        let ok = ProposalAction::PolicyChange(PolicyAction::SlashDataset {
            dataset_id: DatasetId::new(1),
            reason: RejectionReason::Spam,
        });
        assert!(ok.validate().is_ok());
        let bad = ProposalAction::PolicyChange(PolicyAction::SlashDataset {
            dataset_id: DatasetId::new(1),
            reason: RejectionReason::Defeated,
        });
        assert!(bad.validate().is_err());
    }

    #[test]
    fn zero_grant_rejected() {
        let action = ProposalAction::ParameterChange(ParameterAction::MintGrant {
            recipient: AccountId::new("dev-fund"),
            amount: TokenAmount::ZERO,
        });
        assert!(action.validate().is_err());
    }

    #[test]
    fn queued_and_executed_report_succeeded() {
        assert_eq!(
            ProposalStatus::Queued.tally_outcome(),
            Some(ProposalStatus::Succeeded)
        );
        assert_eq!(
            ProposalStatus::Executed.tally_outcome(),
            Some(ProposalStatus::Succeeded)
        );
        assert_eq!(ProposalStatus::Active.tally_outcome(), None);
    }

    #[test]
    fn kind_and_subject() {
        let action = ProposalAction::DatasetApproval {
            dataset_id: DatasetId::new(4),
        };
        assert_eq!(action.kind(), ProposalKind::DatasetApproval);
        assert_eq!(action.subject_id(), "ds-4");
        assert_eq!(action.dataset(), Some(DatasetId::new(4)));
    }
}
