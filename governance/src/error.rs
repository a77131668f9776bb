use crate::proposal::ProposalStatus;
use daiv_types::{AccountId, ErrorKind, ProposalId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("{voter} has already voted on {proposal}")]
    AlreadyVoted {
        proposal: ProposalId,
        voter: AccountId,
    },

    #[error("the voting power of {voter} was already counted on {proposal}")]
    PowerAlreadyCounted {
        proposal: ProposalId,
        voter: AccountId,
    },

    #[error("voting on {0} is closed")]
    VotingClosed(ProposalId),

    #[error("vote weight must be positive")]
    ZeroWeight,

    #[error("cannot {operation} proposal {id} in status {status}")]
    WrongStatus {
        id: ProposalId,
        status: ProposalStatus,
        operation: &'static str,
    },

    #[error("voting on {id} runs until {deadline}")]
    VotingStillOpen { id: ProposalId, deadline: Timestamp },

    #[error("proposal {0} already has votes and cannot be cancelled")]
    HasVotes(ProposalId),

    #[error("proposal {id} is not executable before {eta}")]
    NotYetEligible { id: ProposalId, eta: Timestamp },

    #[error("proposal {0} has already been executed")]
    AlreadyExecuted(ProposalId),

    #[error("{account} is not authorized to {operation}")]
    MissingAuthorization {
        account: AccountId,
        operation: &'static str,
    },

    #[error("invalid value {value} for {param}")]
    InvalidParamValue { param: &'static str, value: u64 },

    #[error("unknown parameter {0:?}")]
    UnknownParam(String),

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("the executor set cannot be left empty")]
    LastExecutor,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProposalNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyVoted { .. } | Self::PowerAlreadyCounted { .. } => {
                ErrorKind::AlreadyVoted
            }
            Self::VotingClosed(_) => ErrorKind::VotingClosed,
            Self::ZeroWeight => ErrorKind::ZeroWeight,
            Self::NotYetEligible { .. } => ErrorKind::NotYetEligible,
            Self::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            Self::MissingAuthorization { .. } => ErrorKind::MissingAuthorization,
            Self::WrongStatus { .. }
            | Self::VotingStillOpen { .. }
            | Self::HasVotes(_)
            | Self::InvalidParamValue { .. }
            | Self::UnknownParam(_)
            | Self::InvalidProposal(_)
            | Self::LastExecutor => ErrorKind::InvalidState,
        }
    }
}
