//! Change events emitted after every committed state transition.
//!
//! The query mirror consumes these as idempotent upserts keyed by
//! `(entity_type, entity_id)`.

use daiv_escrow::Stake;
use daiv_governance::{Proposal, ScheduledExecution, TimelockRoles, Vote};
use daiv_ledger::{Account, DelegationSnapshot, RewardRecord};
use daiv_registry::DatasetRecord;
use daiv_types::ProtocolParams;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Account,
    Dataset,
    Stake,
    Proposal,
    Vote,
    ScheduledExecution,
    Reward,
    Params,
    Roles,
    Delegations,
}

/// The entity's state after the transition.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EntityState {
    Account(Account),
    Dataset(DatasetRecord),
    Stake(Stake),
    Proposal(Proposal),
    Vote(Vote),
    ScheduledExecution(ScheduledExecution),
    Reward(RewardRecord),
    Params(ProtocolParams),
    Roles(TimelockRoles),
    Delegations(DelegationSnapshot),
    /// The entity no longer exists.
    Removed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub new_state: EntityState,
}

impl ChangeEvent {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>, new_state: EntityState) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            new_state,
        }
    }
}

type Listener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Synchronous fan-out event bus for change events.
///
/// Listeners are invoked inline while the protocol lock is held, so events
/// arrive in commit order; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &ChangeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn removed(id: &str) -> ChangeEvent {
        ChangeEvent::new(EntityType::ScheduledExecution, id, EntityState::Removed)
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&removed("prop-1"));
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn listeners_see_events_in_emit_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let s = Arc::clone(&seen);
        bus.subscribe(Box::new(move |e| {
            s.lock().unwrap().push(e.entity_id.clone());
        }));
        bus.emit(&removed("prop-1"));
        bus.emit(&removed("prop-2"));
        assert_eq!(*seen.lock().unwrap(), vec!["prop-1", "prop-2"]);
    }

    #[test]
    fn default_creates_empty_bus() {
        let bus = EventBus::default();
        assert_eq!(bus.listener_count(), 0);
        bus.emit(&removed("prop-1"));
    }
}
