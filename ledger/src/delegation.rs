//! Vote delegation: entrust voting power to a representative.
//!
//! Supports:
//! - **Transitive delegation** (A→B→C means A's power counts for C)
//! - **Cycle rejection** at delegation time
//! - **Max-depth limit**: power behind a chain longer than `max_depth` counts for nobody
//!
//! Delegation is power-weighted: an account that delegates contributes its own
//! voting power to the end of its chain and casts nothing itself.

use crate::error::LedgerError;
use daiv_types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Manages voting-power delegation between accounts.
#[derive(Clone, Debug)]
pub struct DelegationGraph {
    /// delegator → delegate.
    delegations: HashMap<AccountId, AccountId>,
    /// Reverse index: delegate → set of direct delegators.
    reverse: HashMap<AccountId, HashSet<AccountId>>,
    /// Maximum transitive chain depth.
    max_depth: usize,
}

/// Serializable form of the delegation graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationSnapshot {
    pub delegations: Vec<(AccountId, AccountId)>,
}

impl DelegationGraph {
    pub fn new(max_depth: usize) -> Self {
        Self {
            delegations: HashMap::new(),
            reverse: HashMap::new(),
            max_depth,
        }
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Set or update a delegation.
    pub fn delegate(&mut self, from: &AccountId, to: &AccountId) -> Result<(), LedgerError> {
        if from == to {
            return Err(LedgerError::SelfDelegation);
        }
        // Walk forward from `to`; reaching `from` means the new edge closes a loop.
        let mut current = to.clone();
        let mut visited = HashSet::new();
        while let Some(next) = self.delegations.get(&current) {
            if next == from {
                return Err(LedgerError::DelegationCycle {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            if !visited.insert(next.clone()) {
                break;
            }
            current = next.clone();
        }

        self.unlink(from);
        self.delegations.insert(from.clone(), to.clone());
        self.reverse
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        Ok(())
    }

    /// Remove a delegation. No-op if `from` has not delegated.
    pub fn undelegate(&mut self, from: &AccountId) {
        self.unlink(from);
        self.delegations.remove(from);
    }

    fn unlink(&mut self, from: &AccountId) {
        if let Some(old_to) = self.delegations.get(from) {
            if let Some(set) = self.reverse.get_mut(old_to) {
                set.remove(from);
                if set.is_empty() {
                    self.reverse.remove(old_to);
                }
            }
        }
    }

    /// Resolve the final delegate for an account.
    /// Returns None if the chain exceeds max_depth.
    pub fn resolve(&self, from: &AccountId) -> Option<AccountId> {
        let mut current = from.clone();
        for _ in 0..=self.max_depth {
            match self.delegations.get(&current) {
                Some(next) => current = next.clone(),
                None => return Some(current),
            }
        }
        None
    }

    /// Direct delegate of an account, if any.
    pub fn delegate_of(&self, from: &AccountId) -> Option<&AccountId> {
        self.delegations.get(from)
    }

    /// Accounts that directly delegated to `to`.
    pub fn delegators_of(&self, to: &AccountId) -> Vec<&AccountId> {
        self.reverse
            .get(to)
            .map(|s| s.iter().collect())
            .unwrap_or_default()
    }

    /// Accounts whose power a vote by `address` would carry: itself unless
    /// delegated away, plus every account whose chain resolves here.
    /// Sorted, without duplicates.
    pub fn power_sources(&self, address: &AccountId) -> Vec<AccountId> {
        let mut sources = Vec::new();
        if !self.delegations.contains_key(address) {
            sources.push(address.clone());
        }

        let mut candidates = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(address.clone());
        while let Some(current) = queue.pop_front() {
            if let Some(delegators) = self.reverse.get(&current) {
                for d in delegators {
                    if candidates.insert(d.clone()) {
                        queue.push_back(d.clone());
                    }
                }
            }
        }
        sources.extend(
            candidates
                .into_iter()
                .filter(|c| self.resolve(c).as_ref() == Some(address)),
        );
        sources.sort();
        sources
    }

    /// Effective voting power: own power (unless delegated away) plus the power
    /// of every account whose chain resolves here.
    pub fn effective_power(&self, address: &AccountId, power_of: impl Fn(&AccountId) -> u64) -> u64 {
        self.power_sources(address)
            .iter()
            .fold(0u64, |acc, a| acc.saturating_add(power_of(a)))
    }

    pub fn snapshot(&self) -> DelegationSnapshot {
        let mut delegations: Vec<_> = self
            .delegations
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        delegations.sort();
        DelegationSnapshot { delegations }
    }

    pub fn from_snapshot(snapshot: DelegationSnapshot, max_depth: usize) -> Self {
        let mut graph = Self::new(max_depth);
        for (from, to) in snapshot.delegations {
            graph
                .reverse
                .entry(to.clone())
                .or_default()
                .insert(from.clone());
            graph.delegations.insert(from, to);
        }
        graph
    }
}

impl Default for DelegationGraph {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn acct(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn powers(entries: &[(&str, u64)]) -> HashMap<AccountId, u64> {
        entries.iter().map(|(n, p)| (acct(n), *p)).collect()
    }

    #[test]
    fn simple_delegation_moves_power() {
        let mut g = DelegationGraph::new(10);
        let p = powers(&[("a", 300), ("b", 200)]);
        let of = |id: &AccountId| p.get(id).copied().unwrap_or(0);
        g.delegate(&acct("a"), &acct("b")).unwrap();

        assert_eq!(g.resolve(&acct("a")), Some(acct("b")));
        assert_eq!(g.effective_power(&acct("b"), of), 500);
        assert_eq!(g.effective_power(&acct("a"), of), 0);
    }

    #[test]
    fn transitive_chain_a_b_c() {
        let mut g = DelegationGraph::new(10);
        let p = powers(&[("a", 1), ("b", 10), ("c", 100)]);
        let of = |id: &AccountId| p.get(id).copied().unwrap_or(0);
        g.delegate(&acct("a"), &acct("b")).unwrap();
        g.delegate(&acct("b"), &acct("c")).unwrap();

        assert_eq!(g.resolve(&acct("a")), Some(acct("c")));
        assert_eq!(g.effective_power(&acct("c"), of), 111);
        assert_eq!(g.effective_power(&acct("b"), of), 0);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut g = DelegationGraph::new(10);
        g.delegate(&acct("a"), &acct("b")).unwrap();
        g.delegate(&acct("b"), &acct("c")).unwrap();
        let err = g.delegate(&acct("c"), &acct("a")).unwrap_err();
        assert!(matches!(err, LedgerError::DelegationCycle { .. }));
        assert_eq!(g.delegate_of(&acct("c")), None);
    }

    #[test]
    fn self_delegation_rejected() {
        let mut g = DelegationGraph::new(10);
        assert_eq!(
            g.delegate(&acct("a"), &acct("a")),
            Err(LedgerError::SelfDelegation)
        );
    }

    #[test]
    fn max_depth_exceeded_counts_for_nobody() {
        let mut g = DelegationGraph::new(3);
        let names: Vec<AccountId> = (0..6).map(|i| acct(&format!("w{i}"))).collect();
        for i in 0..5 {
            g.delegate(&names[i], &names[i + 1]).unwrap();
        }
        // w0 is five hops from w5
        assert_eq!(g.resolve(&names[0]), None);
        assert_eq!(g.resolve(&names[3]), Some(names[5].clone()));
        let of = |_: &AccountId| 1u64;
        // w5 own + w2, w3, w4
        assert_eq!(g.effective_power(&names[5], of), 4);
    }

    #[test]
    fn undelegate_restores_power() {
        let mut g = DelegationGraph::new(10);
        let of = |_: &AccountId| 5u64;
        g.delegate(&acct("a"), &acct("b")).unwrap();
        g.undelegate(&acct("a"));
        assert_eq!(g.resolve(&acct("a")), Some(acct("a")));
        assert_eq!(g.effective_power(&acct("a"), of), 5);
        assert_eq!(g.effective_power(&acct("b"), of), 5);
    }

    #[test]
    fn redelegation_updates_reverse_index() {
        let mut g = DelegationGraph::new(10);
        g.delegate(&acct("a"), &acct("b")).unwrap();
        g.delegate(&acct("a"), &acct("c")).unwrap();
        assert!(g.delegators_of(&acct("b")).is_empty());
        assert_eq!(g.delegators_of(&acct("c")), vec![&acct("a")]);
    }

    #[test]
    fn power_sources_follow_resolution() {
        let mut g = DelegationGraph::new(10);
        g.delegate(&acct("a"), &acct("b")).unwrap();
        g.delegate(&acct("b"), &acct("c")).unwrap();
        g.delegate(&acct("d"), &acct("c")).unwrap();

        assert_eq!(
            g.power_sources(&acct("c")),
            vec![acct("a"), acct("b"), acct("c"), acct("d")]
        );
        assert!(g.power_sources(&acct("b")).is_empty());
        g.undelegate(&acct("a"));
        assert_eq!(g.power_sources(&acct("a")), vec![acct("a")]);
        assert_eq!(g.power_sources(&acct("c")).len(), 3);
    }

    #[test]
    fn snapshot_roundtrip_preserves_resolution() {
        let mut g = DelegationGraph::new(10);
        g.delegate(&acct("a"), &acct("b")).unwrap();
        g.delegate(&acct("b"), &acct("c")).unwrap();
        let restored = DelegationGraph::from_snapshot(g.snapshot(), 10);
        assert_eq!(restored.resolve(&acct("a")), Some(acct("c")));
        assert_eq!(restored.delegators_of(&acct("c")), vec![&acct("b")]);
    }
}
