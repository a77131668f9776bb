use daiv_governance::{
    ProposalAction, ProposalDraft, ProposalStatus, Timelock, TimelockRoles, VoteChoice,
    VotingEngine,
};
use daiv_types::{AccountId, DatasetId, Timestamp};
use proptest::prelude::*;

const PERIOD: u64 = 100;
const DELAY: u64 = 50;

fn choice_strategy() -> impl Strategy<Value = VoteChoice> {
    prop_oneof![
        Just(VoteChoice::For),
        Just(VoteChoice::Against),
        Just(VoteChoice::Abstain),
    ]
}

fn draft() -> ProposalDraft {
    ProposalDraft {
        proposer: AccountId::new("proposer"),
        title: "approve".into(),
        description: String::new(),
        action: ProposalAction::DatasetApproval {
            dataset_id: DatasetId::new(1),
        },
    }
}

fn roles() -> TimelockRoles {
    TimelockRoles {
        admin: None,
        proposers: Default::default(),
        executors: [AccountId::new("keeper")].into_iter().collect(),
    }
}

proptest! {
    /// Below quorum a proposal never reaches Queued or Executed, and the
    /// tally never changes once recorded.
    #[test]
    fn quorum_gates_execution(
        quorum in 1..5_000u64,
        votes in prop::collection::vec((1..1_000u64, choice_strategy()), 0..12),
        extra_secs in 0..10_000u64,
    ) {
        let t0 = Timestamp::new(1_000);
        let mut voting = VotingEngine::new();
        let mut timelock = Timelock::new(roles(), DELAY);
        let id = voting.open(draft(), quorum, PERIOD, t0).unwrap();

        let mut cast = 0u128;
        for (i, (weight, choice)) in votes.iter().enumerate() {
            let voter = AccountId::new(format!("voter{i}"));
            voting.cast_vote(id, &voter, *choice, *weight, t0).unwrap();
            cast += u128::from(*weight);
        }
        let p = voting.proposal(id).unwrap();
        prop_assert!(p.votes_for + p.votes_against <= p.total_voting_power_cast);
        prop_assert_eq!(p.total_voting_power_cast, cast);

        let deadline = t0.plus_secs(PERIOD);
        let outcome = voting.tally(id, deadline).unwrap();
        prop_assert_eq!(voting.tally(id, deadline.plus_secs(extra_secs)).unwrap(), outcome);

        let queued = timelock.queue(&mut voting, id, deadline).is_ok();
        let executed = timelock
            .execute(&mut voting, id, &AccountId::new("keeper"), deadline.plus_secs(DELAY + extra_secs))
            .is_ok();
        if cast < u128::from(quorum) {
            prop_assert_eq!(outcome, ProposalStatus::QuorumFailed);
            prop_assert!(!queued && !executed);
        }
        if executed {
            let s = timelock.schedule(id).unwrap();
            prop_assert!(s.executed_at.unwrap() >= s.queued_at.plus_secs(DELAY));
            // the recorded outcome survives execution
            prop_assert_eq!(voting.tally(id, deadline).unwrap(), ProposalStatus::Succeeded);
        }
    }
}
