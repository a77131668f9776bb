//! DAO governance for the DAIV protocol.
//!
//! Lifecycle: Active → {Succeeded | Defeated | QuorumFailed} → Queued → Executed,
//! with cancellation of an Active proposal before any vote is cast and of a
//! passed proposal before it executes.
//!
//! Votes are weighted by voting power and snapshotted when cast. A proposal is
//! binding only if the total power cast (abstentions included) reaches the
//! quorum recorded when it opened. Passed proposals wait out the timelock delay
//! before a member of the executor set may run them. The engines never apply
//! effects themselves; executing returns the proposal's action to the caller.

pub mod error;
pub mod params;
pub mod proposal;
pub mod timelock;
pub mod voting;

pub use error::GovernanceError;
pub use params::GovernableParam;
pub use proposal::{
    ParameterAction, PolicyAction, Proposal, ProposalAction, ProposalFilter, ProposalKind,
    ProposalStatus, Vote, VoteChoice,
};
pub use timelock::{ScheduledExecution, Timelock, TimelockChanges, TimelockRoles};
pub use voting::{ProposalDraft, VotingEngine};
