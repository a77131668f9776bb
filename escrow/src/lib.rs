//! Stake escrow for dataset submissions.
//!
//! A contributor's stake leaves their ledger balance at submission and is held
//! here, keyed by dataset, until the submission is resolved: returned to the
//! owner on approval or ordinary rejection, forfeited to the treasury when the
//! dataset is rejected for cause.

pub mod error;
pub mod escrow;
pub mod stake;

pub use error::EscrowError;
pub use escrow::StakeEscrow;
pub use stake::{Stake, StakeResolution};
