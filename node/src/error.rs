use daiv_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] daiv_ledger::LedgerError),

    #[error("escrow error: {0}")]
    Escrow(#[from] daiv_escrow::EscrowError),

    #[error("registry error: {0}")]
    Registry(#[from] daiv_registry::RegistryError),

    #[error("governance error: {0}")]
    Governance(#[from] daiv_governance::GovernanceError),

    #[error("store error: {0}")]
    Store(#[from] daiv_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] daiv_store_lmdb::LmdbError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{caller} is not authorized to {operation}")]
    MissingAuthorization {
        caller: String,
        operation: &'static str,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ledger(e) => e.kind(),
            Self::Escrow(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Lmdb(_) | Self::Io(_) | Self::Config(_) => ErrorKind::Storage,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::MissingAuthorization { .. } => ErrorKind::MissingAuthorization,
            Self::InvalidRequest(_) => ErrorKind::InvalidState,
        }
    }
}
