//! Mutable finder state.
//!
//! Everything here lives behind the finder's single `RwLock`. Readers take
//! the read lock, mutators the write lock, and no guard outlives a method
//! call: connector calls and observer callbacks always run unlocked.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{Address, Node, NodeId, Timestamp};

/// Callback receiving the node's current producer status.
pub type ObserverCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
pub(crate) struct FinderState {
    /// Validator-owned nodes learned from discovery, by owner address
    pub(crate) targets: HashMap<Address, Node>,
    /// Producers seen in snapshots or events, with when they were last seen
    pub(crate) sbps: HashMap<Address, Timestamp>,
    /// Node ids with a connection attempt in flight
    pub(crate) dialing: HashSet<NodeId>,
    pub(crate) observers: HashMap<u64, ObserverCallback>,
    pub(crate) next_observer: u64,
    pub(crate) self_is_sbp: bool,
}

impl FinderState {
    /// Record the producer set read or announced at `now`.
    ///
    /// Returns whether `self_addr` is among `producers`.
    pub(crate) fn record_producers(
        &mut self,
        producers: &[Address],
        self_addr: &Address,
        now: Timestamp,
    ) -> bool {
        self.self_is_sbp = producers.contains(self_addr);
        for addr in producers {
            self.sbps.insert(*addr, now);
        }
        self.self_is_sbp
    }

    pub(crate) fn add_observer(&mut self, callback: ObserverCallback) -> u64 {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.insert(id, callback);
        id
    }

    pub(crate) fn observers(&self) -> Vec<ObserverCallback> {
        self.observers.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_producers_tracks_self_and_refreshes() {
        let me = Address([1; 20]);
        let other = Address([2; 20]);
        let mut state = FinderState::default();

        assert!(state.record_producers(&[me, other], &me, Timestamp::new(10)));
        assert!(!state.record_producers(&[other], &me, Timestamp::new(20)));

        assert_eq!(state.sbps[&other], Timestamp::new(20));
        // Producers that rotated out are remembered
        assert_eq!(state.sbps[&me], Timestamp::new(10));
        assert!(!state.self_is_sbp);
    }

    #[test]
    fn test_observer_ids_are_monotonic() {
        let mut state = FinderState::default();
        let a = state.add_observer(Arc::new(|_| {}));
        let b = state.add_observer(Arc::new(|_| {}));
        state.observers.remove(&a);
        let c = state.add_observer(Arc::new(|_| {}));
        assert!(a < b && b < c);
        assert_eq!(state.observers().len(), 2);
    }
}
