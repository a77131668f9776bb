//! Fundamental types for the DAIV protocol.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, content hashes, token amounts, timestamps, protocol parameters,
//! dataset state enums and the shared error kinds.

pub mod amount;
pub mod error;
pub mod hash;
pub mod ids;
pub mod params;
pub mod state;
pub mod time;

pub use amount::TokenAmount;
pub use error::ErrorKind;
pub use hash::{ContentHash, HashParseError};
pub use ids::{AccountId, DatasetId, ProposalId, RewardId};
pub use params::ProtocolParams;
pub use state::{DatasetStatus, RejectionReason};
pub use time::{Clock, SystemClock, Timestamp};
