use daiv_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("{0} is not authorized to mint")]
    Unauthorized(String),

    #[error("escrow holds {held}, cannot pay out {requested}")]
    EscrowShortfall { held: u128, requested: u128 },

    #[error("arithmetic overflow in ledger operation")]
    Overflow,

    #[error("invalid account id: {0:?}")]
    InvalidAccount(String),

    #[error("cannot delegate to self")]
    SelfDelegation,

    #[error("delegation from {from} to {to} would create a cycle")]
    DelegationCycle { from: String, to: String },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Overflow => ErrorKind::Overflow,
            Self::EscrowShortfall { .. }
            | Self::InvalidAccount(_)
            | Self::SelfDelegation
            | Self::DelegationCycle { .. } => ErrorKind::InvalidState,
        }
    }
}
