use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

use crate::domain::{Address, Timestamp};
use crate::ports::{ConsensusError, ProducerSource, ProducersCallback, ProducersEvent};

/// Producer source backed by a configured address list.
///
/// Stands in for the consensus engine on nodes that follow a fixed producer
/// set. [`StaticProducerSource::set_producers`] rotates the set and notifies
/// subscribers the way a round change would.
#[derive(Default)]
pub struct StaticProducerSource {
    producers: RwLock<Vec<Address>>,
    subscriptions: RwLock<HashMap<(String, String), ProducersCallback>>,
}

impl StaticProducerSource {
    /// Source reporting `producers`.
    pub fn new(producers: Vec<Address>) -> Self {
        Self {
            producers: RwLock::new(producers),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the producer set and notify every subscriber.
    pub fn set_producers(&self, producers: Vec<Address>) {
        *self.producers.write() = producers.clone();
        info!(count = producers.len(), "producer set rotated");

        let callbacks: Vec<ProducersCallback> =
            self.subscriptions.read().values().cloned().collect();
        let event = ProducersEvent { addrs: producers };
        for callback in callbacks {
            callback(event.clone());
        }
    }
}

impl ProducerSource for StaticProducerSource {
    fn read_current_producers(&self, _now: Timestamp) -> Result<Vec<Address>, ConsensusError> {
        Ok(self.producers.read().clone())
    }

    fn subscribe_producers(&self, group: &str, name: &str, callback: ProducersCallback) {
        self.subscriptions
            .write()
            .insert((group.to_string(), name.to_string()), callback);
    }

    fn unsubscribe_producers(&self, group: &str, name: &str) {
        self.subscriptions
            .write()
            .remove(&(group.to_string(), name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_rotation_reaches_subscribers_until_unsubscribed() {
        let source = StaticProducerSource::new(vec![Address([1; 20])]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        source.subscribe_producers(
            "snapshot",
            "sbpn",
            Arc::new(move |event: ProducersEvent| sink.lock().push(event.addrs)),
        );

        source.set_producers(vec![Address([2; 20])]);
        assert_eq!(
            source.read_current_producers(Timestamp::new(0)).unwrap(),
            vec![Address([2; 20])]
        );

        source.unsubscribe_producers("snapshot", "sbpn");
        source.set_producers(vec![]);

        assert_eq!(*seen.lock(), vec![vec![Address([2; 20])]]);
    }
}
