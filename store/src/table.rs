//! Logical tables, one per persisted entity type.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Table {
    Accounts,
    Datasets,
    Stakes,
    Proposals,
    Votes,
    Schedules,
    Rewards,
    /// Id counters, live parameters, roles and delegations.
    Meta,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Accounts,
        Table::Datasets,
        Table::Stakes,
        Table::Proposals,
        Table::Votes,
        Table::Schedules,
        Table::Rewards,
        Table::Meta,
    ];

    /// Database name used by persistent backends.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Datasets => "datasets",
            Self::Stakes => "stakes",
            Self::Proposals => "proposals",
            Self::Votes => "votes",
            Self::Schedules => "schedules",
            Self::Rewards => "rewards",
            Self::Meta => "meta",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), Table::ALL.len());
    }
}
