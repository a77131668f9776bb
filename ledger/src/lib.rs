//! Token ledger for the DAIV protocol.
//!
//! - Fungible balances in raw integer units
//! - Minting restricted to registered minters (the dataset registry for rewards,
//!   the timelock for governance grants), every mint recorded in the reward log
//! - Escrow accounting: tokens deposited as stakes leave the owner's balance but
//!   stay inside total supply until released or slashed
//! - Voting power with transitive delegation

pub mod account;
pub mod delegation;
pub mod error;
pub mod ledger;
pub mod mint;

pub use account::Account;
pub use delegation::{DelegationGraph, DelegationSnapshot};
pub use error::LedgerError;
pub use ledger::{LedgerChanges, LedgerSnapshot, RewardTotals, TokenLedger};
pub use mint::{MintReason, Minter, RewardRecord};
