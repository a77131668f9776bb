use daiv_ledger::LedgerError;
use daiv_types::{DatasetId, ErrorKind, RejectionReason};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscrowError {
    #[error("no stake held for {0}")]
    NotFound(DatasetId),

    #[error("stake for {0} has already been resolved")]
    AlreadyReleased(DatasetId),

    #[error("a stake for {0} already exists")]
    AlreadyStaked(DatasetId),

    #[error("cannot slash {dataset}: {reason:?} is not a rejection for cause")]
    NotForCause {
        dataset: DatasetId,
        reason: RejectionReason,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyReleased(_) => ErrorKind::AlreadyReleased,
            Self::AlreadyStaked(_) | Self::NotForCause { .. } => ErrorKind::InvalidState,
            Self::Ledger(e) => e.kind(),
        }
    }
}
