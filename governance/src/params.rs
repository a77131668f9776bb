//! All governable protocol parameters.
//!
//! Every field of [`ProtocolParams`] can be changed by an executed
//! `ParameterChange` proposal, including the governance values themselves.

use crate::error::GovernanceError;
use daiv_types::ProtocolParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enum of all protocol parameters that can be changed by governance vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernableParam {
    // Rewards
    BaseReward,
    SizeUnitBytes,
    SizeBonusCap,
    MetadataUnit,
    RetroRateMilli,
    RetroCap,

    // Staking
    MinStake,

    // Governance (self-governing)
    QuorumThreshold,
    VotingPeriodSecs,
    MaxDelegationDepth,
    TimelockDelaySecs,

    // Reputation
    ReputationPerApproval,
    ReputationSlashPenalty,
}

impl GovernableParam {
    pub const ALL: [GovernableParam; 13] = [
        Self::BaseReward,
        Self::SizeUnitBytes,
        Self::SizeBonusCap,
        Self::MetadataUnit,
        Self::RetroRateMilli,
        Self::RetroCap,
        Self::MinStake,
        Self::QuorumThreshold,
        Self::VotingPeriodSecs,
        Self::MaxDelegationDepth,
        Self::TimelockDelaySecs,
        Self::ReputationPerApproval,
        Self::ReputationSlashPenalty,
    ];

    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseReward => "base_reward",
            Self::SizeUnitBytes => "size_unit_bytes",
            Self::SizeBonusCap => "size_bonus_cap",
            Self::MetadataUnit => "metadata_unit",
            Self::RetroRateMilli => "retro_rate_milli",
            Self::RetroCap => "retro_cap",
            Self::MinStake => "min_stake",
            Self::QuorumThreshold => "quorum_threshold",
            Self::VotingPeriodSecs => "voting_period_secs",
            Self::MaxDelegationDepth => "max_delegation_depth",
            Self::TimelockDelaySecs => "timelock_delay_secs",
            Self::ReputationPerApproval => "reputation_per_approval",
            Self::ReputationSlashPenalty => "reputation_slash_penalty",
        }
    }

    /// Current value in `params`.
    pub fn get(&self, params: &ProtocolParams) -> u64 {
        match self {
            Self::BaseReward => params.base_reward,
            Self::SizeUnitBytes => params.size_unit_bytes,
            Self::SizeBonusCap => params.size_bonus_cap,
            Self::MetadataUnit => params.metadata_unit,
            Self::RetroRateMilli => params.retro_rate_milli,
            Self::RetroCap => params.retro_cap,
            Self::MinStake => params.min_stake,
            Self::QuorumThreshold => params.quorum_threshold,
            Self::VotingPeriodSecs => params.voting_period_secs,
            Self::MaxDelegationDepth => u64::from(params.max_delegation_depth),
            Self::TimelockDelaySecs => params.timelock_delay_secs,
            Self::ReputationPerApproval => params.reputation_per_approval,
            Self::ReputationSlashPenalty => params.reputation_slash_penalty,
        }
    }

    /// Reject values that would stall the protocol.
    pub fn validate(&self, value: u64) -> Result<(), GovernanceError> {
        let ok = match self {
            Self::SizeUnitBytes | Self::VotingPeriodSecs | Self::QuorumThreshold => value > 0,
            Self::MaxDelegationDepth => (1..=u64::from(u32::MAX)).contains(&value),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(GovernanceError::InvalidParamValue {
                param: self.name(),
                value,
            })
        }
    }

    /// Write `value` into `params`.
    pub fn apply(&self, params: &mut ProtocolParams, value: u64) -> Result<(), GovernanceError> {
        self.validate(value)?;
        match self {
            Self::BaseReward => params.base_reward = value,
            Self::SizeUnitBytes => params.size_unit_bytes = value,
            Self::SizeBonusCap => params.size_bonus_cap = value,
            Self::MetadataUnit => params.metadata_unit = value,
            Self::RetroRateMilli => params.retro_rate_milli = value,
            Self::RetroCap => params.retro_cap = value,
            Self::MinStake => params.min_stake = value,
            Self::QuorumThreshold => params.quorum_threshold = value,
            Self::VotingPeriodSecs => params.voting_period_secs = value,
            Self::MaxDelegationDepth => {
                params.max_delegation_depth = u32::try_from(value).map_err(|_| {
                    GovernanceError::InvalidParamValue {
                        param: self.name(),
                        value,
                    }
                })?
            }
            Self::TimelockDelaySecs => params.timelock_delay_secs = value,
            Self::ReputationPerApproval => params.reputation_per_approval = value,
            Self::ReputationSlashPenalty => params.reputation_slash_penalty = value,
        }
        Ok(())
    }
}

impl fmt::Display for GovernableParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GovernableParam {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| GovernanceError::UnknownParam(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for p in GovernableParam::ALL {
            assert_eq!(p.name().parse::<GovernableParam>().unwrap(), p);
        }
        assert!("brn_rate".parse::<GovernableParam>().is_err());
    }

    #[test]
    fn apply_base_reward() {
        let mut params = ProtocolParams::default();
        GovernableParam::BaseReward.apply(&mut params, 75).unwrap();
        assert_eq!(params.base_reward, 75);
        assert_eq!(GovernableParam::BaseReward.get(&params), 75);
    }

    #[test]
    fn zero_voting_period_rejected() {
        let mut params = ProtocolParams::default();
        let err = GovernableParam::VotingPeriodSecs
            .apply(&mut params, 0)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidParamValue { .. }));
        assert_eq!(params, ProtocolParams::default());
    }

    #[test]
    fn delegation_depth_must_fit() {
        let mut params = ProtocolParams::default();
        assert!(GovernableParam::MaxDelegationDepth
            .apply(&mut params, u64::from(u32::MAX) + 1)
            .is_err());
        GovernableParam::MaxDelegationDepth
            .apply(&mut params, 3)
            .unwrap();
        assert_eq!(params.max_delegation_depth, 3);
    }
}
