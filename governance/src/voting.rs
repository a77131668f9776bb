//! Proposal & voting engine.

use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalAction, ProposalStatus, Vote, VoteChoice};
use daiv_types::{AccountId, ProposalId, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for [`VotingEngine::open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDraft {
    pub proposer: AccountId,
    pub title: String,
    pub description: String,
    pub action: ProposalAction,
}

/// Votes on one proposal and every account whose power they carry.
#[derive(Clone, Debug, Default)]
struct Ballot {
    votes: BTreeMap<AccountId, Vote>,
    counted: BTreeSet<AccountId>,
}

/// Proposals and their ballots. Ballots are shared between clones of the
/// engine and copied only when a vote lands on them.
#[derive(Clone, Debug)]
pub struct VotingEngine {
    proposals: BTreeMap<ProposalId, Proposal>,
    ballots: BTreeMap<ProposalId, Arc<Ballot>>,
    next_id: ProposalId,
    dirty_proposals: BTreeSet<ProposalId>,
    new_votes: Vec<(ProposalId, AccountId)>,
}

impl Default for VotingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VotingEngine {
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            ballots: BTreeMap::new(),
            next_id: ProposalId::new(1),
            dirty_proposals: BTreeSet::new(),
            new_votes: Vec::new(),
        }
    }

    pub fn restore(
        proposals: impl IntoIterator<Item = Proposal>,
        votes: impl IntoIterator<Item = Vote>,
    ) -> Self {
        let mut engine = Self::new();
        for p in proposals {
            if p.id >= engine.next_id {
                engine.next_id = p.id.next();
            }
            engine.proposals.insert(p.id, p);
        }
        for v in votes {
            let ballot = Arc::make_mut(engine.ballots.entry(v.proposal_id).or_default());
            ballot.counted.insert(v.voter.clone());
            ballot.counted.extend(v.covered.iter().cloned());
            ballot.votes.insert(v.voter.clone(), v);
        }
        engine
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn get(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub fn vote(&self, id: ProposalId, voter: &AccountId) -> Option<&Vote> {
        self.ballots.get(&id).and_then(|b| b.votes.get(voter))
    }

    /// All votes on a proposal, ordered by voter.
    pub fn votes_on(&self, id: ProposalId) -> impl Iterator<Item = &Vote> {
        self.ballots
            .get(&id)
            .into_iter()
            .flat_map(|b| b.votes.values())
    }

    /// Open a proposal for voting, snapshotting quorum and deadline.
    pub fn open(
        &mut self,
        draft: ProposalDraft,
        quorum_threshold: u64,
        voting_period_secs: u64,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        if !draft.proposer.is_valid() {
            return Err(GovernanceError::InvalidProposal(format!(
                "invalid proposer {:?}",
                draft.proposer.as_str()
            )));
        }
        draft
            .action
            .validate()
            .map_err(GovernanceError::InvalidProposal)?;

        let id = self.next_id;
        let proposal = Proposal {
            id,
            proposer: draft.proposer,
            title: draft.title,
            description: draft.description,
            action: draft.action,
            votes_for: 0,
            votes_against: 0,
            votes_abstain: 0,
            total_voting_power_cast: 0,
            voter_count: 0,
            quorum_threshold,
            opened_at: now,
            voting_deadline: now.plus_secs(voting_period_secs),
            status: ProposalStatus::Active,
        };
        info!(
            proposal = %id,
            kind = proposal.kind().as_str(),
            subject = %proposal.action.subject_id(),
            deadline = %proposal.voting_deadline,
            "proposal opened"
        );
        self.proposals.insert(id, proposal);
        self.next_id = id.next();
        self.dirty_proposals.insert(id);
        Ok(id)
    }

    /// Record a vote carrying only the voter's own power.
    pub fn cast_vote(
        &mut self,
        id: ProposalId,
        voter: &AccountId,
        choice: VoteChoice,
        weight: u64,
        now: Timestamp,
    ) -> Result<&Proposal, GovernanceError> {
        self.cast_with_sources(id, voter, choice, &[(voter.clone(), weight)], now)
    }

    /// Record a vote carrying the power of every source account.
    ///
    /// Sources already counted on this proposal contribute nothing, and a
    /// voter whose own power was carried by an earlier vote cannot vote.
    pub fn cast_with_sources(
        &mut self,
        id: ProposalId,
        voter: &AccountId,
        choice: VoteChoice,
        sources: &[(AccountId, u64)],
        now: Timestamp,
    ) -> Result<&Proposal, GovernanceError> {
        let proposal = self.get(id)?;
        if self.vote(id, voter).is_some() {
            return Err(GovernanceError::AlreadyVoted {
                proposal: id,
                voter: voter.clone(),
            });
        }
        if !proposal.is_voting_open(now) {
            return Err(GovernanceError::VotingClosed(id));
        }
        let is_counted = |a: &AccountId| self.is_counted(id, a);
        if is_counted(voter) {
            return Err(GovernanceError::PowerAlreadyCounted {
                proposal: id,
                voter: voter.clone(),
            });
        }

        let mut covered: Vec<AccountId> = Vec::with_capacity(sources.len());
        let mut weight = 0u64;
        for (account, power) in sources {
            if is_counted(account) || covered.contains(account) {
                continue;
            }
            weight = weight.saturating_add(*power);
            covered.push(account.clone());
        }
        if weight == 0 {
            return Err(GovernanceError::ZeroWeight);
        }

        let w = u128::from(weight);
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        match choice {
            VoteChoice::For => proposal.votes_for += w,
            VoteChoice::Against => proposal.votes_against += w,
            VoteChoice::Abstain => proposal.votes_abstain += w,
        }
        proposal.total_voting_power_cast += w;
        proposal.voter_count = proposal.voter_count.saturating_add(1);

        debug!(proposal = %id, %voter, ?choice, weight, covered = covered.len(), "vote cast");
        let ballot = Arc::make_mut(self.ballots.entry(id).or_default());
        ballot.counted.extend(covered.iter().cloned());
        ballot.votes.insert(
            voter.clone(),
            Vote {
                proposal_id: id,
                voter: voter.clone(),
                choice,
                weight,
                covered,
                cast_at: now,
            },
        );
        self.new_votes.push((id, voter.clone()));
        self.dirty_proposals.insert(id);
        Ok(&self.proposals[&id])
    }

    /// Whether `account`'s power already counts toward proposal `id`.
    pub fn is_counted(&self, id: ProposalId, account: &AccountId) -> bool {
        self.ballots
            .get(&id)
            .is_some_and(|b| b.counted.contains(account))
    }

    /// Evaluate quorum and outcome once the deadline has passed.
    ///
    /// Idempotent: a proposal with a recorded outcome returns it unchanged.
    pub fn tally(&mut self, id: ProposalId, now: Timestamp) -> Result<ProposalStatus, GovernanceError> {
        let proposal = self.get(id)?;
        if let Some(outcome) = proposal.status.tally_outcome() {
            return Ok(outcome);
        }
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::WrongStatus {
                id,
                status: proposal.status,
                operation: "tally",
            });
        }
        if now < proposal.voting_deadline {
            return Err(GovernanceError::VotingStillOpen {
                id,
                deadline: proposal.voting_deadline,
            });
        }

        let outcome = if !proposal.quorum_reached() {
            ProposalStatus::QuorumFailed
        } else if proposal.votes_for > proposal.votes_against {
            ProposalStatus::Succeeded
        } else {
            ProposalStatus::Defeated
        };
        info!(
            proposal = %id,
            %outcome,
            votes_for = proposal.votes_for,
            votes_against = proposal.votes_against,
            cast = proposal.total_voting_power_cast,
            quorum = proposal.quorum_threshold,
            "proposal tallied"
        );
        self.set_status(id, outcome);
        Ok(outcome)
    }

    /// Cancel an Active proposal that has no votes yet.
    pub fn cancel(&mut self, id: ProposalId) -> Result<(), GovernanceError> {
        let proposal = self.get(id)?;
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::WrongStatus {
                id,
                status: proposal.status,
                operation: "cancel",
            });
        }
        if proposal.voter_count > 0 {
            return Err(GovernanceError::HasVotes(id));
        }
        self.set_status(id, ProposalStatus::Cancelled);
        info!(proposal = %id, "proposal cancelled");
        Ok(())
    }

    pub(crate) fn set_status(&mut self, id: ProposalId, status: ProposalStatus) {
        if let Some(p) = self.proposals.get_mut(&id) {
            p.status = status;
            self.dirty_proposals.insert(id);
        }
    }

    /// Proposals and votes changed since the previous call.
    pub fn take_changes(&mut self) -> (Vec<Proposal>, Vec<Vote>) {
        let proposals = std::mem::take(&mut self.dirty_proposals)
            .into_iter()
            .filter_map(|id| self.proposals.get(&id).cloned())
            .collect();
        let votes = std::mem::take(&mut self.new_votes)
            .into_iter()
            .filter_map(|(id, voter)| self.vote(id, &voter).cloned())
            .collect();
        (proposals, votes)
    }
}
