use daiv_escrow::EscrowError;
use daiv_ledger::LedgerError;
use daiv_types::{ContentHash, DatasetId, DatasetStatus, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dataset {0} not found")]
    NotFound(DatasetId),

    #[error("content {hash} is already registered as {existing}")]
    DuplicateContent {
        hash: ContentHash,
        existing: DatasetId,
    },

    #[error("stake of {stake} is below the minimum of {minimum}")]
    StakeBelowMinimum { stake: u128, minimum: u128 },

    #[error("cannot {operation} dataset {id} in status {status}")]
    InvalidTransition {
        id: DatasetId,
        status: DatasetStatus,
        operation: &'static str,
    },

    #[error("reported downloads {reported} are below the charged baseline {baseline}")]
    UsageRegression { baseline: u64, reported: u64 },

    #[error("invalid contributor id: {0:?}")]
    InvalidContributor(String),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateContent { .. } => ErrorKind::DuplicateContent,
            Self::StakeBelowMinimum { .. }
            | Self::InvalidTransition { .. }
            | Self::UsageRegression { .. }
            | Self::InvalidContributor(_) => ErrorKind::InvalidState,
            Self::Escrow(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
        }
    }
}
