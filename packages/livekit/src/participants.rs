use crate::{ParticipantIdentity, RoomEvent};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Remote participants currently in the room, kept current from room events.
#[derive(Debug, Default, Clone)]
pub struct ParticipantRoster {
    inner: Arc<RosterInner>,
}

#[derive(Debug, Default)]
struct RosterInner {
    present: Mutex<HashSet<ParticipantIdentity>>,
    count: AtomicUsize,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, identities: impl IntoIterator<Item = ParticipantIdentity>) {
        let mut present = self.inner.present.lock();
        present.extend(identities);
        self.inner.count.store(present.len(), Ordering::Release);
    }

    /// Apply a room event. Returns the new count if it changed.
    pub fn apply(&self, event: &RoomEvent) -> Option<usize> {
        let mut present = self.inner.present.lock();
        let changed = match event {
            RoomEvent::ParticipantConnected(identity) => present.insert(identity.clone()),
            RoomEvent::ParticipantDisconnected(identity) => present.remove(identity),
            RoomEvent::Connected { participants } => {
                present.clear();
                present.extend(participants.iter().cloned());
                true
            }
            RoomEvent::Disconnected { .. } => {
                let had_any = !present.is_empty();
                present.clear();
                had_any
            }
            _ => false,
        };
        self.inner.count.store(present.len(), Ordering::Release);
        changed.then_some(present.len())
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ParticipantIdentity {
        ParticipantIdentity(name.to_string())
    }

    #[test]
    fn joins_and_leaves_are_counted_once() {
        let roster = ParticipantRoster::new();
        assert_eq!(roster.apply(&RoomEvent::ParticipantConnected(id("a"))), Some(1));
        assert_eq!(roster.apply(&RoomEvent::ParticipantConnected(id("a"))), None);
        assert_eq!(roster.apply(&RoomEvent::ParticipantConnected(id("b"))), Some(2));
        assert_eq!(roster.apply(&RoomEvent::ParticipantDisconnected(id("a"))), Some(1));
        assert_eq!(roster.apply(&RoomEvent::ParticipantDisconnected(id("zz"))), None);
        assert_eq!(roster.count(), 1);
    }

    #[test]
    fn disconnect_clears_everyone() {
        let roster = ParticipantRoster::new();
        roster.seed([id("a"), id("b")]);
        assert_eq!(roster.count(), 2);
        assert_eq!(
            roster.apply(&RoomEvent::Disconnected { reason: "SERVER_SHUTDOWN" }),
            Some(0)
        );
        assert_eq!(roster.count(), 0);
    }
}
