//! Timelock executor.
//!
//! A passed proposal is queued with `eta = queued_at + delay` and may only be
//! executed at or after `eta`, by a member of the executor set, exactly once.

use crate::error::GovernanceError;
use crate::proposal::{ProposalAction, ProposalStatus};
use crate::voting::VotingEngine;
use daiv_types::{AccountId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Who may cancel and execute timelocked proposals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockRoles {
    pub admin: Option<AccountId>,
    pub proposers: BTreeSet<AccountId>,
    pub executors: BTreeSet<AccountId>,
}

impl TimelockRoles {
    pub fn can_cancel(&self, account: &AccountId) -> bool {
        self.admin.as_ref() == Some(account) || self.proposers.contains(account)
    }

    pub fn can_execute(&self, account: &AccountId) -> bool {
        self.executors.contains(account)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledExecution {
    pub proposal_id: ProposalId,
    pub queued_at: Timestamp,
    pub eta: Timestamp,
    pub executed: bool,
    pub executed_at: Option<Timestamp>,
    pub executed_by: Option<AccountId>,
}

/// Schedules written or removed since the last [`Timelock::take_changes`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimelockChanges {
    pub upserted: Vec<ScheduledExecution>,
    pub removed: Vec<ProposalId>,
    /// Present when the role set changed.
    pub roles: Option<TimelockRoles>,
}

#[derive(Clone, Debug)]
pub struct Timelock {
    schedules: BTreeMap<ProposalId, ScheduledExecution>,
    roles: TimelockRoles,
    delay_secs: u64,
    dirty: BTreeSet<ProposalId>,
    removed: BTreeSet<ProposalId>,
    roles_dirty: bool,
}

impl Timelock {
    pub fn new(roles: TimelockRoles, delay_secs: u64) -> Self {
        Self {
            schedules: BTreeMap::new(),
            roles,
            delay_secs,
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
            roles_dirty: false,
        }
    }

    pub fn restore(
        schedules: impl IntoIterator<Item = ScheduledExecution>,
        roles: TimelockRoles,
        delay_secs: u64,
    ) -> Self {
        let mut timelock = Self::new(roles, delay_secs);
        timelock.schedules = schedules
            .into_iter()
            .map(|s| (s.proposal_id, s))
            .collect();
        timelock
    }

    pub fn roles(&self) -> &TimelockRoles {
        &self.roles
    }

    pub fn delay_secs(&self) -> u64 {
        self.delay_secs
    }

    /// Applies to proposals queued from now on.
    pub fn set_delay(&mut self, delay_secs: u64) {
        self.delay_secs = delay_secs;
    }

    pub fn schedule(&self, id: ProposalId) -> Option<&ScheduledExecution> {
        self.schedules.get(&id)
    }

    pub fn schedules(&self) -> impl Iterator<Item = &ScheduledExecution> {
        self.schedules.values()
    }

    /// Schedule a Succeeded proposal.
    pub fn queue(
        &mut self,
        voting: &mut VotingEngine,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<&ScheduledExecution, GovernanceError> {
        let proposal = voting.get(id)?;
        if proposal.status != ProposalStatus::Succeeded {
            return Err(GovernanceError::WrongStatus {
                id,
                status: proposal.status,
                operation: "queue",
            });
        }
        let scheduled = ScheduledExecution {
            proposal_id: id,
            queued_at: now,
            eta: now.plus_secs(self.delay_secs),
            executed: false,
            executed_at: None,
            executed_by: None,
        };
        info!(proposal = %id, eta = %scheduled.eta, "proposal queued");
        voting.set_status(id, ProposalStatus::Queued);
        self.removed.remove(&id);
        self.dirty.insert(id);
        Ok(self.schedules.entry(id).or_insert(scheduled))
    }

    /// Mark a queued proposal executed and hand back its action.
    ///
    /// Checks run in order: unknown proposal, caller authorization, prior
    /// execution, then the eta.
    pub fn execute(
        &mut self,
        voting: &mut VotingEngine,
        id: ProposalId,
        caller: &AccountId,
        now: Timestamp,
    ) -> Result<ProposalAction, GovernanceError> {
        let proposal = voting.get(id)?;
        if !self.roles.can_execute(caller) {
            return Err(GovernanceError::MissingAuthorization {
                account: caller.clone(),
                operation: "execute proposals",
            });
        }
        if proposal.status == ProposalStatus::Executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        let scheduled = match self.schedules.get(&id) {
            Some(s) if proposal.status == ProposalStatus::Queued => s,
            _ => {
                return Err(GovernanceError::WrongStatus {
                    id,
                    status: proposal.status,
                    operation: "execute",
                })
            }
        };
        if scheduled.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if now < scheduled.eta {
            return Err(GovernanceError::NotYetEligible {
                id,
                eta: scheduled.eta,
            });
        }
        let action = proposal.action.clone();

        if let Some(s) = self.schedules.get_mut(&id) {
            s.executed = true;
            s.executed_at = Some(now);
            s.executed_by = Some(caller.clone());
        }
        voting.set_status(id, ProposalStatus::Executed);
        self.dirty.insert(id);
        info!(proposal = %id, executor = %caller, "proposal executed");
        Ok(action)
    }

    /// Cancel a passed proposal before it executes.
    pub fn cancel(
        &mut self,
        voting: &mut VotingEngine,
        id: ProposalId,
        caller: &AccountId,
    ) -> Result<(), GovernanceError> {
        let proposal = voting.get(id)?;
        if !self.roles.can_cancel(caller) {
            return Err(GovernanceError::MissingAuthorization {
                account: caller.clone(),
                operation: "cancel proposals",
            });
        }
        match proposal.status {
            ProposalStatus::Succeeded | ProposalStatus::Queued => {}
            ProposalStatus::Executed => return Err(GovernanceError::AlreadyExecuted(id)),
            status => {
                return Err(GovernanceError::WrongStatus {
                    id,
                    status,
                    operation: "cancel",
                })
            }
        }
        if self.schedules.remove(&id).is_some() {
            self.dirty.remove(&id);
            self.removed.insert(id);
        }
        voting.set_status(id, ProposalStatus::Cancelled);
        info!(proposal = %id, by = %caller, "queued proposal cancelled");
        Ok(())
    }

    /// Cancel a proposal whose action no longer applies, without a caller
    /// check. Returns false when the proposal already reached a final status.
    pub fn supersede(
        &mut self,
        voting: &mut VotingEngine,
        id: ProposalId,
    ) -> Result<bool, GovernanceError> {
        match voting.get(id)?.status {
            ProposalStatus::Active | ProposalStatus::Succeeded | ProposalStatus::Queued => {}
            _ => return Ok(false),
        }
        if self.schedules.remove(&id).is_some() {
            self.dirty.remove(&id);
            self.removed.insert(id);
        }
        voting.set_status(id, ProposalStatus::Cancelled);
        info!(proposal = %id, "proposal superseded");
        Ok(true)
    }

    pub fn add_executor(&mut self, account: AccountId) {
        if self.roles.executors.insert(account.clone()) {
            self.roles_dirty = true;
            info!(%account, "executor added");
        }
    }

    /// Remove an executor. The last executor cannot be removed.
    pub fn remove_executor(&mut self, account: &AccountId) -> Result<(), GovernanceError> {
        if !self.roles.executors.contains(account) {
            return Ok(());
        }
        if self.roles.executors.len() == 1 {
            return Err(GovernanceError::LastExecutor);
        }
        self.roles.executors.remove(account);
        self.roles_dirty = true;
        info!(%account, "executor removed");
        Ok(())
    }

    /// Flag the current role set so the next `take_changes` reports it.
    pub fn mark_roles_dirty(&mut self) {
        self.roles_dirty = true;
    }

    pub fn take_changes(&mut self) -> TimelockChanges {
        let upserted = std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.schedules.get(&id).cloned())
            .collect();
        let removed = std::mem::take(&mut self.removed).into_iter().collect();
        let roles = std::mem::take(&mut self.roles_dirty).then(|| self.roles.clone());
        TimelockChanges {
            upserted,
            removed,
            roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::VoteChoice;
    use crate::voting::ProposalDraft;
    use daiv_types::{DatasetId, ErrorKind};

    const DELAY: u64 = 172_800;
    const T0: Timestamp = Timestamp::new(1_000);

    fn acct(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn roles() -> TimelockRoles {
        TimelockRoles {
            admin: Some(acct("admin")),
            proposers: [acct("council")].into_iter().collect(),
            executors: [acct("keeper")].into_iter().collect(),
        }
    }

    /// A proposal that has passed, tallied at `T0 + 10`.
    fn passed() -> (VotingEngine, Timelock, ProposalId) {
        let mut voting = VotingEngine::new();
        let id = voting
            .open(
                ProposalDraft {
                    proposer: acct("alice"),
                    title: "approve".into(),
                    description: String::new(),
                    action: ProposalAction::DatasetApproval {
                        dataset_id: DatasetId::new(1),
                    },
                },
                100,
                10,
                T0,
            )
            .unwrap();
        voting
            .cast_vote(id, &acct("v"), VoteChoice::For, 100, T0)
            .unwrap();
        voting.tally(id, T0.plus_secs(10)).unwrap();
        (voting, Timelock::new(roles(), DELAY), id)
    }

    #[test]
    fn queue_sets_eta() {
        let (mut voting, mut tl, id) = passed();
        let now = T0.plus_secs(20);
        let s = tl.queue(&mut voting, id, now).unwrap();
        assert_eq!(s.eta, now.plus_secs(DELAY));
        assert_eq!(voting.proposal(id).unwrap().status, ProposalStatus::Queued);
    }

    #[test]
    fn queue_requires_succeeded() {
        let mut voting = VotingEngine::new();
        let id = voting
            .open(
                ProposalDraft {
                    proposer: acct("alice"),
                    title: String::new(),
                    description: String::new(),
                    action: ProposalAction::DatasetApproval {
                        dataset_id: DatasetId::new(1),
                    },
                },
                100,
                10,
                T0,
            )
            .unwrap();
        voting.tally(id, T0.plus_secs(10)).unwrap();
        let mut tl = Timelock::new(roles(), DELAY);
        let err = tl.queue(&mut voting, id, T0.plus_secs(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(tl.schedule(id).is_none());
    }

    #[test]
    fn execute_before_eta_not_eligible() {
        let (mut voting, mut tl, id) = passed();
        tl.queue(&mut voting, id, T0).unwrap();
        let err = tl
            .execute(&mut voting, id, &acct("keeper"), T0.plus_secs(DELAY - 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotYetEligible);
        assert!(!tl.schedule(id).unwrap().executed);
    }

    #[test]
    fn execute_at_eta_returns_action_once() {
        let (mut voting, mut tl, id) = passed();
        tl.queue(&mut voting, id, T0).unwrap();
        let at = T0.plus_secs(DELAY);
        let action = tl.execute(&mut voting, id, &acct("keeper"), at).unwrap();
        assert_eq!(
            action,
            ProposalAction::DatasetApproval {
                dataset_id: DatasetId::new(1)
            }
        );
        let s = tl.schedule(id).unwrap();
        assert!(s.executed);
        assert!(s.executed_at.unwrap() >= s.queued_at.plus_secs(DELAY));
        assert_eq!(
            voting.proposal(id).unwrap().status,
            ProposalStatus::Executed
        );

        let err = tl
            .execute(&mut voting, id, &acct("keeper"), at.plus_secs(5))
            .unwrap_err();
        assert_eq!(err, GovernanceError::AlreadyExecuted(id));
    }

    #[test]
    fn authorization_checked_before_eta() {
        let (mut voting, mut tl, id) = passed();
        tl.queue(&mut voting, id, T0).unwrap();
        let err = tl.execute(&mut voting, id, &acct("alice"), T0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAuthorization);
    }

    #[test]
    fn unknown_proposal_not_found_first() {
        let (mut voting, mut tl, _) = passed();
        let err = tl
            .execute(&mut voting, ProposalId::new(42), &acct("alice"), T0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn cancel_requires_role_and_removes_schedule() {
        let (mut voting, mut tl, id) = passed();
        tl.queue(&mut voting, id, T0).unwrap();
        let err = tl.cancel(&mut voting, id, &acct("keeper")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAuthorization);

        tl.cancel(&mut voting, id, &acct("council")).unwrap();
        assert!(tl.schedule(id).is_none());
        assert_eq!(
            voting.proposal(id).unwrap().status,
            ProposalStatus::Cancelled
        );
        let changes = tl.take_changes();
        assert_eq!(changes.removed, vec![id]);
        assert!(changes.upserted.is_empty());

        let err = tl
            .execute(&mut voting, id, &acct("keeper"), T0.plus_secs(DELAY))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn cancel_after_execution_rejected() {
        let (mut voting, mut tl, id) = passed();
        tl.queue(&mut voting, id, T0).unwrap();
        tl.execute(&mut voting, id, &acct("keeper"), T0.plus_secs(DELAY))
            .unwrap();
        let err = tl.cancel(&mut voting, id, &acct("admin")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExecuted);
    }

    #[test]
    fn supersede_closes_queued_and_keeps_final() {
        let (mut voting, mut tl, id) = passed();
        tl.queue(&mut voting, id, T0).unwrap();
        tl.take_changes();

        assert!(tl.supersede(&mut voting, id).unwrap());
        assert!(tl.schedule(id).is_none());
        assert_eq!(
            voting.proposal(id).unwrap().status,
            ProposalStatus::Cancelled
        );
        assert_eq!(tl.take_changes().removed, vec![id]);
        assert!(!tl.supersede(&mut voting, id).unwrap());

        let (mut voting, mut tl, done) = passed();
        tl.queue(&mut voting, done, T0).unwrap();
        tl.execute(&mut voting, done, &acct("keeper"), T0.plus_secs(DELAY))
            .unwrap();
        assert!(!tl.supersede(&mut voting, done).unwrap());
        assert_eq!(
            voting.proposal(done).unwrap().status,
            ProposalStatus::Executed
        );
    }

    #[test]
    fn last_executor_cannot_be_removed() {
        let mut tl = Timelock::new(roles(), DELAY);
        assert_eq!(
            tl.remove_executor(&acct("keeper")),
            Err(GovernanceError::LastExecutor)
        );
        tl.add_executor(acct("backup"));
        tl.remove_executor(&acct("keeper")).unwrap();
        assert!(tl.roles().can_execute(&acct("backup")));
        assert!(!tl.roles().can_execute(&acct("keeper")));
        assert!(tl.take_changes().roles.is_some());
    }
}
