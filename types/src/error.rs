//! Error kinds shared across crates.
//!
//! Every crate keeps its own `thiserror` enum; each of those maps onto one
//! [`ErrorKind`] so the request/response boundary can report failures uniformly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The externally visible classification of a failed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InsufficientBalance,
    Unauthorized,
    /// Operation not valid for the current entity state.
    InvalidState,
    NotFound,
    DuplicateContent,
    AlreadyVoted,
    ZeroWeight,
    VotingClosed,
    NotYetEligible,
    AlreadyExecuted,
    AlreadyReleased,
    MissingAuthorization,
    /// Checked arithmetic refused an overflowing result.
    Overflow,
    /// The storage backend failed.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientBalance => "InsufficientBalance",
            Self::Unauthorized => "Unauthorized",
            Self::InvalidState => "InvalidState",
            Self::NotFound => "NotFound",
            Self::DuplicateContent => "DuplicateContent",
            Self::AlreadyVoted => "AlreadyVoted",
            Self::ZeroWeight => "ZeroWeight",
            Self::VotingClosed => "VotingClosed",
            Self::NotYetEligible => "NotYetEligible",
            Self::AlreadyExecuted => "AlreadyExecuted",
            Self::AlreadyReleased => "AlreadyReleased",
            Self::MissingAuthorization => "MissingAuthorization",
            Self::Overflow => "Overflow",
            Self::Storage => "Storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
