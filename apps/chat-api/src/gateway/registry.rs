//! Set of currently connected participants.
//!
//! Owned by the hub's control loop; nothing else holds a reference, so no
//! locking is needed.

use std::collections::BTreeMap;
use std::fmt;

use super::connection::Connection;

/// Hub-assigned identifier for one connection. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One registered connection and the identity it speaks for.
pub struct Participant {
    pub id: ParticipantId,
    pub identity: String,
    pub connection: Box<dyn Connection>,
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct Registry {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, participant: Participant) {
        self.participants.insert(participant.id, participant);
    }

    /// Remove a participant, returning it so the caller can close its
    /// connection. Unknown ids are ignored.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        self.participants.remove(&id)
    }

    #[cfg(test)]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Display identities in iteration order (which is join order here).
    pub fn identities(&self) -> Vec<String> {
        self.participants
            .values()
            .map(|p| p.identity.clone())
            .collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    /// Remove everyone, e.g. on shutdown.
    pub fn drain(&mut self) -> Vec<Participant> {
        std::mem::take(&mut self.participants).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::connection::testing::recording_connection;

    fn participant(id: u64, identity: &str) -> Participant {
        let (connection, _peer) = recording_connection();
        Participant {
            id: ParticipantId(id),
            identity: identity.to_string(),
            connection,
        }
    }

    #[test]
    fn insert_and_list_identities() {
        let mut registry = Registry::new();
        registry.insert(participant(1, "alice"));
        registry.insert(participant(2, "bob"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.identities(), vec!["alice", "bob"]);
    }

    #[test]
    fn duplicate_identities_are_allowed() {
        let mut registry = Registry::new();
        registry.insert(participant(1, "alice"));
        registry.insert(participant(2, "alice"));
        assert_eq!(registry.identities(), vec!["alice", "alice"]);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut registry = Registry::new();
        registry.insert(participant(1, "alice"));
        assert!(registry.remove(ParticipantId(99)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_twice_equals_remove_once() {
        let mut registry = Registry::new();
        registry.insert(participant(1, "alice"));
        registry.insert(participant(2, "bob"));

        assert!(registry.remove(ParticipantId(1)).is_some());
        assert!(registry.remove(ParticipantId(1)).is_none());
        assert!(!registry.contains(ParticipantId(1)));
        assert_eq!(registry.identities(), vec!["bob"]);
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = Registry::new();
        registry.insert(participant(1, "alice"));
        registry.insert(participant(2, "bob"));
        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }
}
