//! # Finder
//!
//! Connection admission. The finder follows the elected producer set,
//! remembers which discovered nodes are operated by validators, and keeps the
//! node connected to at most `max_peers` ordinary peers plus every producer
//! it can reach.
//!
//! ## Budget
//!
//! ```text
//! total = connected peers not flagged superior + dials in flight
//! ```
//!
//! Dials are only issued while `total < max_peers`, except that a node which
//! is itself a producer dials every other producer it knows of as soon as the
//! producer set names them.
//!
//! ## Tasks
//!
//! - reconciliation loop: static nodes, then (if producer) validator
//!   targets, then resolver candidates
//! - dial dispatcher: drains the dial queue, one task per attempt, bounded
//!   by a semaphore
//!
//! Consensus callbacks and discovery callbacks run on their callers' tasks.

mod dialer;
mod state;

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::domain::{
    parse_node, parse_node_ext, Address, FinderConfig, FinderError, Node,
};
use crate::ports::{
    Connector, NodeFeed, NodeResolver, PeerSet, ProducerSource, ProducersEvent, TimeSource,
    SNAPSHOT_GROUP,
};
use state::FinderState;

pub use state::ObserverCallback;

/// Name under which the finder subscribes to producer changes.
pub const SUBSCRIBER_NAME: &str = "sbpn";

/// Collaborators the finder drives.
pub struct FinderPorts {
    /// Connected sessions
    pub peers: Arc<dyn PeerSet>,
    /// Opens sessions
    pub connector: Arc<dyn Connector>,
    /// Producer elections
    pub consensus: Arc<dyn ProducerSource>,
    /// Candidate source; may be attached later with [`Finder::set_resolver`]
    pub resolver: Option<Arc<dyn NodeResolver>>,
    /// Clock for producer timestamps
    pub time: Arc<dyn TimeSource>,
}

/// The connection admission engine.
pub struct Finder {
    self_addr: Address,
    config: FinderConfig,
    static_nodes: Vec<Node>,
    peers: Arc<dyn PeerSet>,
    connector: Arc<dyn Connector>,
    consensus: Arc<dyn ProducerSource>,
    resolver: RwLock<Option<Arc<dyn NodeResolver>>>,
    time: Arc<dyn TimeSource>,
    state: RwLock<FinderState>,
    dial_tx: mpsc::UnboundedSender<Node>,
    dial_rx: Mutex<Option<mpsc::UnboundedReceiver<Node>>>,
    shutdown: watch::Sender<bool>,
    feed_subscription: Mutex<Option<u64>>,
}

impl Finder {
    /// Build a finder for the validator `self_addr`.
    ///
    /// Subscribes to producer changes right away; [`Finder::clean`] undoes
    /// that.
    ///
    /// # Errors
    ///
    /// `InvalidStaticNode` if any static node descriptor does not parse.
    pub fn new(
        self_addr: Address,
        config: FinderConfig,
        static_nodes: &[String],
        ports: FinderPorts,
    ) -> Result<Arc<Self>, FinderError> {
        let static_nodes = static_nodes
            .iter()
            .map(|descriptor| {
                parse_node(descriptor).map_err(|source| FinderError::InvalidStaticNode {
                    descriptor: descriptor.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (dial_tx, dial_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let finder = Arc::new(Self {
            self_addr,
            config,
            static_nodes,
            peers: ports.peers,
            connector: ports.connector,
            consensus: ports.consensus,
            resolver: RwLock::new(ports.resolver),
            time: ports.time,
            state: RwLock::new(FinderState::default()),
            dial_tx,
            dial_rx: Mutex::new(Some(dial_rx)),
            shutdown,
            feed_subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&finder);
        finder.consensus.subscribe_producers(
            SNAPSHOT_GROUP,
            SUBSCRIBER_NAME,
            Arc::new(move |event| {
                if let Some(finder) = Weak::upgrade(&weak) {
                    finder.receive_producers(event);
                }
            }),
        );

        Ok(finder)
    }

    /// Seed the producer set and launch the loop and the dial dispatcher.
    ///
    /// A failed snapshot read is logged and the finder starts without any
    /// known producer. Must be called inside a tokio runtime; later calls
    /// are ignored.
    pub fn start(self: &Arc<Self>) {
        let Some(queue) = self.dial_rx.lock().take() else {
            warn!("finder already started");
            return;
        };

        let now = self.time.now();
        match self.consensus.read_current_producers(now) {
            Ok(producers) => {
                let self_is_sbp = self.state.write().record_producers(
                    &producers,
                    &self.self_addr,
                    now,
                );
                info!(producers = producers.len(), self_is_sbp, "finder started");
            }
            Err(e) => warn!(error = %e, "cannot read current producers, starting without them"),
        }

        tokio::spawn(Arc::clone(self).run_dialer(queue, self.shutdown.subscribe()));
        tokio::spawn(Arc::clone(self).run_loop(self.shutdown.subscribe()));
    }

    /// Stop the loop and the dispatcher. Safe to call any number of times.
    ///
    /// Attempts in flight are not cancelled.
    pub fn stop(&self) {
        if !self.shutdown.send_replace(true) {
            info!("finder stopping");
        }
    }

    /// Drop the producer subscription.
    pub fn clean(&self) {
        self.consensus.unsubscribe_producers(SNAPSHOT_GROUP, SUBSCRIBER_NAME);
    }

    // =========================================================================
    // DISCOVERY INPUT
    // =========================================================================

    /// A node was discovered.
    ///
    /// Validator-owned nodes become targets. Any node is dialled right away
    /// while under the ceiling.
    pub fn receive_node(&self, node: Node) {
        let mut state = self.state.write();
        if let Some(owner) = parse_node_ext(&node) {
            state.targets.insert(owner, node.clone());
        }
        if self.total_locked(&state) < self.config.max_peers {
            self.dial_locked(&mut state, node);
        }
    }

    /// Attach to a discovered-node feed.
    pub fn sub(self: &Arc<Self>, feed: &dyn NodeFeed) {
        let weak = Arc::downgrade(self);
        let id = feed.subscribe(Arc::new(move |node| {
            if let Some(finder) = Weak::upgrade(&weak) {
                finder.receive_node(node);
            }
        }));
        if let Some(previous) = self.feed_subscription.lock().replace(id) {
            warn!(previous, "finder was already attached to a node feed");
        }
    }

    /// Detach from the feed given to [`Finder::sub`].
    pub fn unsub(&self, feed: &dyn NodeFeed) {
        if let Some(id) = self.feed_subscription.lock().take() {
            feed.unsubscribe(id);
        }
    }

    /// Replace the candidate source.
    pub fn set_resolver(&self, resolver: Arc<dyn NodeResolver>) {
        *self.resolver.write() = Some(resolver);
    }

    // =========================================================================
    // CONSENSUS INPUT
    // =========================================================================

    /// The producer set changed.
    ///
    /// Connected producers are flagged superior. If this node is a producer,
    /// unconnected producers it has a target for are dialled. Observers are
    /// told the current status on every event.
    pub fn receive_producers(&self, event: ProducersEvent) {
        let now = self.time.now();

        let (self_is_sbp, observers) = {
            let mut state = self.state.write();
            let self_is_sbp = state.record_producers(&event.addrs, &self.self_addr, now);

            for addr in &event.addrs {
                let Some(node) = state.targets.get(addr).cloned() else {
                    continue;
                };
                if let Some(peer) = self.peers.lookup(&node.id) {
                    peer.set_superior(true);
                    continue;
                }
                if self_is_sbp {
                    self.dial_locked(&mut state, node);
                }
            }

            (self_is_sbp, state.observers())
        };

        for observer in observers {
            observer(self_is_sbp);
        }
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    /// Register a callback for producer status. Returns its id.
    pub fn subscribe(&self, callback: ObserverCallback) -> u64 {
        self.state.write().add_observer(callback)
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: u64) {
        self.state.write().observers.remove(&id);
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Whether `addr` has been seen as a producer.
    pub fn is_sbp(&self, addr: &Address) -> bool {
        self.state.read().sbps.contains_key(addr)
    }

    /// Whether this node is in the latest producer set.
    pub fn self_is_sbp(&self) -> bool {
        self.state.read().self_is_sbp
    }

    /// Up to `count` known validator nodes.
    pub fn find_neighbors(&self, count: usize) -> Vec<Node> {
        self.state
            .read()
            .targets
            .values()
            .take(count)
            .cloned()
            .collect()
    }

    /// Connected non-producer peers plus dials in flight.
    pub fn total(&self) -> usize {
        self.total_locked(&self.state.read())
    }

    /// Dials in flight.
    pub fn dialing_count(&self) -> usize {
        self.state.read().dialing.len()
    }

    fn total_locked(&self, state: &FinderState) -> usize {
        self.peers.count_excluding_sbp() + state.dialing.len()
    }
}
